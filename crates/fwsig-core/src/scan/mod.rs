//! Signature location: memory-mapped file scanning.

mod file;
mod scanner;

pub use file::{FieldMatch, FileHandle};
