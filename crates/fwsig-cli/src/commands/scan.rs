use std::path::Path;

use anyhow::Result;
use fwsig_core::{FileHandle, SchemaRegistry};

/// Run the scan command
pub fn run(registry: &SchemaRegistry, image: &Path, schema: Option<&str>) -> Result<()> {
    let handle = FileHandle::deserialize(image, registry)?;

    println!("{:?}: {} signature(s)", image, handle.signatures().len());
    println!();
    println!("{:<5} {:<12} {:<12} {:<10} {}", "idx", "offset", "schema", "verified", "product");

    for (index, sig) in handle.signatures().iter().enumerate() {
        if let Some(name) = schema {
            if !sig.schema().name.eq_ignore_ascii_case(name) {
                continue;
            }
        }
        println!(
            "{:<5} {:<#12x} {:<12} {:<10} {}",
            index,
            sig.file_offset(),
            sig.schema().name,
            if sig.verified() { "ok" } else { "FAILED" },
            sig.product_name().unwrap_or("-"),
        );
    }

    Ok(())
}
