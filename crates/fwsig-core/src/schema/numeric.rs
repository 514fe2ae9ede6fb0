use serde::Deserialize;

use crate::error::{Error, Result};

/// A numeric literal as it appears in schema JSON: a plain number or a
/// prefixed string (`"0x1000"`, `"0o755"`, `"4096"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumLit {
    Int(u64),
    Text(String),
}

/// Parse a schema numeric literal.
///
/// String literals require an explicit radix prefix: `0x` for hex, `0o`
/// for octal, nothing for decimal. A leading-zero decimal (other than `0`
/// itself) is rejected as ambiguous instead of being guessed at.
pub fn parse_numeric(lit: &NumLit) -> Result<u64> {
    match lit {
        NumLit::Int(v) => Ok(*v),
        NumLit::Text(raw) => {
            let s = raw.trim();
            if s.is_empty() {
                return Err(invalid(raw, "empty literal"));
            }
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                return u64::from_str_radix(hex, 16).map_err(|e| invalid(raw, &e.to_string()));
            }
            if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
                return u64::from_str_radix(oct, 8).map_err(|e| invalid(raw, &e.to_string()));
            }
            if s.len() > 1 && s.starts_with('0') {
                return Err(invalid(
                    raw,
                    "leading-zero literals are ambiguous; use an explicit 0x or 0o prefix",
                ));
            }
            s.parse::<u64>().map_err(|e| invalid(raw, &e.to_string()))
        }
    }
}

fn invalid(literal: &str, message: &str) -> Error {
    Error::InvalidNumericLiteral {
        literal: literal.to_string(),
        message: message.to_string(),
    }
}
