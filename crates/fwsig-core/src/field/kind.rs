use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::field::FieldValue;

/// Scalar field type tags as they appear in schema JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Display)]
pub enum ScalarKind {
    #[strum(serialize = "uint8")]
    Uint8,
    #[strum(serialize = "uint16")]
    Uint16,
    #[strum(serialize = "uint32")]
    Uint32,
    #[strum(serialize = "uint64")]
    Uint64,
}

impl ScalarKind {
    pub fn size(self) -> usize {
        match self {
            ScalarKind::Uint8 => 1,
            ScalarKind::Uint16 => 2,
            ScalarKind::Uint32 => 4,
            ScalarKind::Uint64 => 8,
        }
    }

    /// Struct-format code, little-endian convention.
    pub fn format_code(self) -> char {
        match self {
            ScalarKind::Uint8 => 'B',
            ScalarKind::Uint16 => 'H',
            ScalarKind::Uint32 => 'I',
            ScalarKind::Uint64 => 'Q',
        }
    }
}

/// Leaf field kind: a scalar integer or a fixed-length char array.
///
/// Nested `struct` entries exist only in the schema tree; they flatten to
/// their leaves before any byte-level work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Char(usize),
}

impl FieldKind {
    pub fn size(&self) -> usize {
        match self {
            FieldKind::Scalar(s) => s.size(),
            FieldKind::Char(n) => *n,
        }
    }

    /// Struct-format fragment for this kind (`B`/`H`/`I`/`Q` or `{N}s`).
    pub fn format(&self) -> String {
        match self {
            FieldKind::Scalar(s) => s.format_code().to_string(),
            FieldKind::Char(n) => format!("{}s", n),
        }
    }

    /// Decode exactly `self.size()` bytes into a value.
    ///
    /// The caller guarantees the slice length; `char[N]` strips trailing
    /// NULs and drops invalid UTF-8 bytes rather than raising.
    pub fn decode(&self, bytes: &[u8]) -> FieldValue {
        match self {
            FieldKind::Scalar(_) => FieldValue::Int(read_uint_le(bytes)),
            FieldKind::Char(_) => {
                let end = bytes
                    .iter()
                    .rposition(|&b| b != 0)
                    .map_or(0, |pos| pos + 1);
                let text: String = String::from_utf8_lossy(&bytes[..end])
                    .chars()
                    .filter(|&c| c != char::REPLACEMENT_CHARACTER)
                    .collect();
                FieldValue::Text(text)
            }
        }
    }

    /// Encode a value into exactly `self.size()` bytes at `out`.
    ///
    /// `char[N]` truncates or NUL-pads to exactly N bytes. Scalars must fit
    /// the field width. `name` is only used for error context.
    pub fn encode(&self, name: &str, value: &FieldValue, out: &mut [u8]) -> Result<()> {
        self.check_value(name, value)?;
        match (self, value) {
            (FieldKind::Scalar(_), FieldValue::Int(v)) => write_uint_le(*v, out),
            (FieldKind::Char(n), FieldValue::Text(s)) => {
                let bytes = s.as_bytes();
                let take = bytes.len().min(*n);
                out[..take].copy_from_slice(&bytes[..take]);
                out[take..].fill(0);
            }
            _ => unreachable!("check_value enforces the kind/value pairing"),
        }
        Ok(())
    }

    /// Validate that `value` is storable in a field of this kind.
    pub fn check_value(&self, name: &str, value: &FieldValue) -> Result<()> {
        match (self, value) {
            (FieldKind::Scalar(s), FieldValue::Int(v)) => {
                let width = s.size();
                if width < 8 && *v >= 1u64 << (width * 8) {
                    return Err(Error::ValueTypeMismatch {
                        field: name.to_string(),
                        expected: format!("an integer fitting {} bytes", width),
                        actual: format!("{}", v),
                    });
                }
                Ok(())
            }
            (FieldKind::Char(_), FieldValue::Text(_)) => Ok(()),
            _ => Err(Error::ValueTypeMismatch {
                field: name.to_string(),
                expected: match self {
                    FieldKind::Scalar(_) => "an integer".to_string(),
                    FieldKind::Char(n) => format!("a string of up to {} bytes", n),
                },
                actual: value.kind_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(s) => write!(f, "{}", s),
            FieldKind::Char(n) => write!(f, "char[{}]", n),
        }
    }
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        if let Ok(scalar) = tag.parse::<ScalarKind>() {
            return Ok(FieldKind::Scalar(scalar));
        }
        if let Some(inner) = tag.strip_prefix("char[").and_then(|t| t.strip_suffix(']')) {
            let n: usize = inner
                .parse()
                .map_err(|_| Error::UnknownFieldType(tag.to_string()))?;
            if n == 0 {
                return Err(Error::UnknownFieldType(tag.to_string()));
            }
            return Ok(FieldKind::Char(n));
        }
        Err(Error::UnknownFieldType(tag.to_string()))
    }
}

/// Little-endian read of 1..=8 bytes into a u64.
fn read_uint_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Little-endian write of a u64 into 1..=8 bytes.
fn write_uint_le(mut value: u64, out: &mut [u8]) {
    for byte in out.iter_mut() {
        *byte = value as u8;
        value >>= 8;
    }
}

/// Byte size of a type tag (`uint8` -> 1, `char[18]` -> 18).
pub fn type_to_size(tag: &str) -> Result<usize> {
    Ok(tag.parse::<FieldKind>()?.size())
}

/// Struct-format fragment of a type tag (`uint32` -> `I`, `char[18]` -> `18s`).
pub fn type_to_format(tag: &str) -> Result<String> {
    Ok(tag.parse::<FieldKind>()?.format())
}
