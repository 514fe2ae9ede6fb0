//! # fwsig-core
//!
//! Core library for the fwsig firmware signature tool.
//!
//! This crate provides:
//! - Schema descriptor parsing and compilation (JSON -> byte layout)
//! - Signature location via memory-mapped pattern scanning
//! - Field decoding, mutation and window re-serialization
//! - CRC32 integrity checks with linker-address boundary math
//! - Safe partial-file write-back of edited signatures
//!
//! A signature is a fixed-size binary block embedded in a firmware image,
//! framed by header/footer markers and carrying structured metadata plus a
//! CRC32 over its host image. Schemas are compiled once into an immutable
//! [`SchemaRegistry`]; a [`FileHandle`] scans one file and owns the
//! [`Signature`]s discovered in it.

pub mod error;
pub mod field;
pub mod scan;
pub mod schema;
pub mod signature;

pub use error::{Error, Result};
pub use field::{FieldKind, FieldValue, ScalarKind, type_to_format, type_to_size};
pub use scan::{FieldMatch, FileHandle};
pub use schema::{
    FieldDef, FieldNode, SchemaDef, SchemaGroup, SchemaRegistry, SearchPattern, strip_comments,
};
pub use signature::{Field, ImageBoundaries, Signature};
