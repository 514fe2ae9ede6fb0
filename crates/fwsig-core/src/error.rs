use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema '{schema}' is invalid: {message}")]
    SchemaInvalid { schema: String, message: String },

    #[error("Schema '{schema}' declares {declared} bytes but its fields pack to {computed}")]
    SchemaSizeMismatch {
        schema: String,
        declared: usize,
        computed: usize,
    },

    #[error("Schema '{schema}' declares field '{field}' more than once at the same nesting level")]
    DuplicateField { schema: String, field: String },

    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    #[error("Invalid numeric literal '{literal}': {message}")]
    InvalidNumericLiteral { literal: String, message: String },

    #[error("Schema '{0}' declares more than one integrity field")]
    MultipleIntegrityFields(String),

    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("No signatures found in {0:?}")]
    NoSignatures(PathBuf),

    #[error("Failed to decode signature at offset {offset:#x}: {message}")]
    DecodeFailed { offset: u64, message: String },

    #[error("Schema '{schema}' flattens to {expected} fields but {actual} values were provided")]
    FieldCountMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is read-only")]
    ReadOnlyField(String),

    #[error("Field '{field}' expects {expected}, got {actual}")]
    ValueTypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Integrity check failed: stored {stored:#010x}, computed {computed:#010x}")]
    IntegrityCheckFailed { stored: u32, computed: u32 },

    #[error("Signature has no integrity field")]
    MissingIntegrityField,

    #[error("Cannot save a signature that failed its integrity check")]
    UnverifiedSignature,

    #[error("Image boundaries are unavailable for this signature")]
    BoundariesUnavailable,

    #[error("Byte range at {offset:#x} ({size} bytes) does not fit in {image_len} available bytes")]
    OutOfBounds {
        offset: u64,
        size: usize,
        image_len: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error in {path:?} at offset {offset:#x}: {source}")]
    IoAt {
        path: PathBuf,
        offset: u64,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
