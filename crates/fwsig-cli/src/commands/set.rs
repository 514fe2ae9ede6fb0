use std::path::Path;

use anyhow::{Context, Result, bail};
use fwsig_core::{FieldKind, FieldValue, FileHandle, SchemaRegistry};
use tracing::info;

/// Run the set command
pub fn run(
    registry: &SchemaRegistry,
    image: &Path,
    field: &str,
    value: &str,
    index: usize,
    force: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut handle = FileHandle::deserialize(image, registry)?;
    let sig = super::signature_at(&mut handle, index)?;
    super::require_decoded(sig)?;

    let Some(target) = sig.find_first_field(field) else {
        bail!("signature has no field named '{}'", field);
    };
    let parsed = parse_value(target.def.kind, value)
        .with_context(|| format!("cannot parse {:?} for field '{}'", value, field))?;

    sig.set_field_data(field, parsed)?;
    sig.save(output, force)?;
    info!(
        "Set {} = {} and saved to {:?}",
        field,
        value,
        output.unwrap_or(image)
    );
    Ok(())
}

/// Parse a CLI value for the field's kind: strings pass through, integers
/// accept decimal or an explicit 0x/0o prefix.
fn parse_value(kind: FieldKind, raw: &str) -> Result<FieldValue> {
    match kind {
        FieldKind::Char(_) => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Scalar(_) => {
            let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
            {
                u64::from_str_radix(hex, 16)?
            } else if let Some(oct) = raw.strip_prefix("0o").or_else(|| raw.strip_prefix("0O")) {
                u64::from_str_radix(oct, 8)?
            } else {
                raw.parse::<u64>()?
            };
            Ok(FieldValue::Int(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwsig_core::ScalarKind;

    #[test]
    fn test_parse_value() {
        let kind = FieldKind::Scalar(ScalarKind::Uint32);
        assert_eq!(parse_value(kind, "7").unwrap(), FieldValue::Int(7));
        assert_eq!(parse_value(kind, "0x10").unwrap(), FieldValue::Int(16));
        assert_eq!(parse_value(kind, "0o10").unwrap(), FieldValue::Int(8));
        assert!(parse_value(kind, "seven").is_err());

        let kind = FieldKind::Char(8);
        assert_eq!(
            parse_value(kind, "0x10").unwrap(),
            FieldValue::Text("0x10".into())
        );
    }
}
