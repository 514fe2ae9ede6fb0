use std::path::Path;

use anyhow::Result;
use fwsig_core::{FieldValue, FileHandle, SchemaRegistry, Signature};

/// Run the fields command
pub fn run(
    registry: &SchemaRegistry,
    image: &Path,
    index: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut handle = FileHandle::deserialize(image, registry)?;

    match index {
        Some(index) => {
            let sig = super::signature_at(&mut handle, index)?;
            super::require_decoded(sig)?;
            print_signature(sig, json)?;
        }
        None => {
            for sig in handle.signatures() {
                if !sig.is_decoded() {
                    println!(
                        "signature at {:#x}: matched but not decodable, skipping",
                        sig.file_offset()
                    );
                    continue;
                }
                print_signature(sig, json)?;
            }
        }
    }

    Ok(())
}

fn print_signature(sig: &Signature, json: bool) -> Result<()> {
    if json {
        let map: serde_json::Map<String, serde_json::Value> = sig
            .fields()
            .iter()
            .map(|f| (f.def.name.clone(), value_to_json(&f.value)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!(
        "Signature '{}' at {:#x} ({})",
        sig.schema().name,
        sig.file_offset(),
        if sig.verified() { "verified" } else { "integrity FAILED" },
    );
    for field in sig.fields() {
        let flags = match (field.def.is_integrity, field.def.read_only) {
            (true, _) => " [crc]",
            (false, true) => " [ro]",
            (false, false) => "",
        };
        match &field.value {
            FieldValue::Int(v) => println!(
                "  {:<24} {:#x} ({}){}",
                field.def.name, v, v, flags
            ),
            FieldValue::Text(s) => println!("  {:<24} {:?}{}", field.def.name, s, flags),
        }
    }
    if let Some(product) = sig.product_name() {
        println!("  product: {}", product);
    }
    if let Some(manufacturer) = sig.manufacturer_name() {
        println!("  manufacturer: {}", manufacturer);
    }
    if let Some(family) = sig.family_name() {
        println!("  family: {}", family);
    }
    println!();
    Ok(())
}

fn value_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Int(v) => serde_json::Value::from(*v),
        FieldValue::Text(s) => serde_json::Value::from(s.as_str()),
    }
}
