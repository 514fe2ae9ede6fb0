//! Field type system and per-kind byte codec.
//!
//! Each field kind knows its byte size, its struct-format code and how to
//! encode/decode exactly that many bytes. A `char[N]` field is always one
//! fixed-width block, never N scalar slots.

mod kind;
mod value;

pub use kind::{FieldKind, ScalarKind, type_to_format, type_to_size};
pub use value::FieldValue;
