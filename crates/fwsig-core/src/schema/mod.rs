//! Schema descriptor parsing and compilation.
//!
//! A descriptor JSON file maps field names and types onto an exact byte
//! layout. Compilation validates the layout once, up front, and produces
//! immutable `SchemaDef`s with a struct format string and a compiled
//! byte-search pattern.

mod def;
mod descriptor;
mod jsonc;
mod numeric;
mod registry;

pub use def::{FieldDef, FieldNode, SchemaDef, SearchPattern};
pub use descriptor::{
    DescriptorRoot, FamilyJson, FieldJson, GroupJson, ManufacturerJson, ProductJson, SchemaJson,
};
pub use jsonc::strip_comments;
pub use numeric::{NumLit, parse_numeric};
pub use registry::{SchemaGroup, SchemaRegistry};
