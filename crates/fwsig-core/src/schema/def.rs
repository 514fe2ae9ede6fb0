use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::field::FieldKind;
use crate::schema::descriptor::{FieldJson, SchemaJson};
use crate::schema::numeric::{NumLit, parse_numeric};

/// One flattened leaf field: kind, byte size and byte offset within the
/// signature window, plus the flags carried from the schema JSON.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub size: usize,
    pub offset: usize,
    pub is_integrity: bool,
    pub read_only: bool,
    pub type_info: Option<serde_json::Value>,
}

/// Declaration-order field tree as written in the schema.
#[derive(Debug, Clone)]
pub enum FieldNode {
    Leaf(FieldDef),
    Group {
        name: String,
        children: Vec<FieldNode>,
    },
}

/// Compiled two-anchor byte-search pattern.
///
/// The header marker anchors a candidate; the candidate is confirmed when
/// a full window fits and ends with the footer marker. The middle
/// `arbitrary_data_length` bytes are unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    pub header: [u8; 4],
    pub footer: [u8; 4],
    pub size: usize,
    pub arbitrary_data_length: usize,
}

impl SearchPattern {
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() == self.size
            && window[..4] == self.header
            && window[self.size - 4..] == self.footer
    }
}

/// A compiled, immutable signature schema.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub group_id: u32,
    pub name: String,
    pub description: String,
    pub header: u32,
    pub footer: u32,
    pub size: usize,
    /// Field tree in declaration order.
    pub tree: Vec<FieldNode>,
    /// Flattened leaves with running-sum offsets; this is what byte-level
    /// code walks.
    pub fields: Vec<FieldDef>,
    /// Little-endian struct format string, e.g. `<IHI18sI`.
    pub format: String,
    pub pattern: SearchPattern,
    pub is_default: bool,
}

impl SchemaDef {
    pub fn compile(group_id: u32, json: &SchemaJson) -> Result<Self> {
        let name = json.name.clone();
        let header = compile_marker(&name, "header", json.header.as_ref())?;
        let footer = compile_marker(&name, "footer", json.footer.as_ref())?;

        if json.size == 0 {
            return Err(invalid(&name, "size is missing or zero"));
        }
        if json.size < 8 {
            return Err(invalid(&name, "size is smaller than the header and footer markers"));
        }
        if json.fields.is_empty() {
            return Err(invalid(&name, "schema has no fields"));
        }

        let tree = build_nodes(&name, &json.fields)?;

        let mut fields = Vec::new();
        let mut offset = 0usize;
        flatten(&tree, &mut fields, &mut offset);
        let computed = offset;

        if computed != json.size {
            return Err(Error::SchemaSizeMismatch {
                schema: name,
                declared: json.size,
                computed,
            });
        }

        let integrity_count = fields.iter().filter(|f| f.is_integrity).count();
        if integrity_count > 1 {
            return Err(Error::MultipleIntegrityFields(name));
        }

        let mut format = String::from("<");
        for field in &fields {
            format.push_str(&field.kind.format());
        }

        let pattern = SearchPattern {
            header: header.to_le_bytes(),
            footer: footer.to_le_bytes(),
            size: json.size,
            arbitrary_data_length: json.size - 8,
        };

        Ok(SchemaDef {
            group_id,
            name: json.name.clone(),
            description: json.description.clone(),
            header,
            footer,
            size: json.size,
            tree,
            fields,
            format,
            pattern,
            is_default: json.default,
        })
    }

    /// The single integrity (CRC) field, if the schema declares one.
    pub fn integrity_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_integrity)
    }
}

fn compile_marker(schema: &str, which: &str, lit: Option<&NumLit>) -> Result<u32> {
    let Some(lit) = lit else {
        return Err(invalid(schema, &format!("{} marker is missing", which)));
    };
    let value = parse_numeric(lit)?;
    if value == 0 {
        return Err(invalid(schema, &format!("{} marker is zero", which)));
    }
    u32::try_from(value)
        .map_err(|_| invalid(schema, &format!("{} marker {:#x} exceeds 32 bits", which, value)))
}

/// Build the field tree for one nesting level, enforcing name uniqueness
/// within the level (C-struct scoping: inner levels may reuse names).
fn build_nodes(schema: &str, fields: &[FieldJson]) -> Result<Vec<FieldNode>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::with_capacity(fields.len());

    for field in fields {
        if !field.name.is_empty() && !seen.insert(field.name.as_str()) {
            return Err(Error::DuplicateField {
                schema: schema.to_string(),
                field: field.name.clone(),
            });
        }

        if field.ty == "struct" {
            if field.fields.is_empty() {
                return Err(invalid(
                    schema,
                    &format!("struct field '{}' has no children", field.name),
                ));
            }
            nodes.push(FieldNode::Group {
                name: field.name.clone(),
                children: build_nodes(schema, &field.fields)?,
            });
            continue;
        }

        if field.name.is_empty() {
            return Err(invalid(schema, "field has no name"));
        }
        let kind: FieldKind = field.ty.parse()?;
        nodes.push(FieldNode::Leaf(FieldDef {
            name: field.name.clone(),
            kind,
            size: kind.size(),
            offset: 0,
            is_integrity: field.integrity,
            read_only: field.read_only,
            type_info: field.type_info.clone(),
        }));
    }

    Ok(nodes)
}

/// Flatten the tree in declaration order, assigning byte-packed offsets
/// as the running sum of preceding leaf sizes.
fn flatten(nodes: &[FieldNode], out: &mut Vec<FieldDef>, offset: &mut usize) {
    for node in nodes {
        match node {
            FieldNode::Leaf(def) => {
                let mut def = def.clone();
                def.offset = *offset;
                *offset += def.size;
                out.push(def);
            }
            FieldNode::Group { children, .. } => flatten(children, out, offset),
        }
    }
}

fn invalid(schema: &str, message: &str) -> Error {
    Error::SchemaInvalid {
        schema: schema.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_json(value: serde_json::Value) -> SchemaJson {
        serde_json::from_value(value).unwrap()
    }

    fn basic_schema() -> serde_json::Value {
        json!({
            "name": "basic",
            "description": "test schema",
            "header": "0xAABBCCDD",
            "footer": "0xDDCCBBAA",
            "size": 32,
            "default": true,
            "fields": [
                {"name": "header", "type": "uint32", "read_only": true},
                {"name": "product_id", "type": "uint16"},
                {"name": "crc", "type": "uint32", "integrity": true},
                {"name": "padding", "type": "char[18]"},
                {"name": "footer", "type": "uint32", "read_only": true}
            ]
        })
    }

    #[test]
    fn test_compile_basic() {
        let def = SchemaDef::compile(1, &schema_json(basic_schema())).unwrap();
        assert_eq!(def.header, 0xAABBCCDD);
        assert_eq!(def.footer, 0xDDCCBBAA);
        assert_eq!(def.size, 32);
        assert_eq!(def.format, "<IHI18sI");
        assert_eq!(def.pattern.header, [0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(def.pattern.footer, [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(def.pattern.arbitrary_data_length, 24);
        assert!(def.is_default);

        let offsets: Vec<usize> = def.fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 6, 10, 28]);
        assert_eq!(def.integrity_field().unwrap().name, "crc");
    }

    #[test]
    fn test_packed_size_must_match_declared() {
        let mut value = basic_schema();
        value["size"] = json!(33);
        let err = SchemaDef::compile(1, &schema_json(value)).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaSizeMismatch { declared: 33, computed: 32, .. }
        ));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut value = basic_schema();
        value["fields"][1]["name"] = json!("header");
        let err = SchemaDef::compile(1, &schema_json(value)).unwrap_err();
        assert!(matches!(err, Error::DuplicateField { .. }));
    }

    #[test]
    fn test_nested_struct_flattens_in_order() {
        let value = json!({
            "name": "nested",
            "header": "0x11223344",
            "footer": "0x44332211",
            "size": 20,
            "fields": [
                {"name": "header", "type": "uint32"},
                {"name": "ids", "type": "struct", "fields": [
                    {"name": "product_id", "type": "uint16"},
                    {"name": "manufacturer_id", "type": "uint16"},
                    {"name": "build", "type": "struct", "fields": [
                        {"name": "product_id", "type": "uint64"}
                    ]}
                ]},
                {"name": "footer", "type": "uint32"}
            ]
        });
        let def = SchemaDef::compile(1, &schema_json(value)).unwrap();
        let names: Vec<&str> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["header", "product_id", "manufacturer_id", "product_id", "footer"]
        );
        let offsets: Vec<usize> = def.fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 6, 8, 16]);
        assert_eq!(def.format, "<IHHQI");
    }

    #[test]
    fn test_same_name_allowed_across_levels() {
        let value = json!({
            "name": "scoped",
            "header": 1,
            "footer": 2,
            "size": 12,
            "fields": [
                {"name": "id", "type": "uint32"},
                {"name": "inner", "type": "struct", "fields": [
                    {"name": "id", "type": "uint32"}
                ]},
                {"name": "footer", "type": "uint32"}
            ]
        });
        assert!(SchemaDef::compile(1, &schema_json(value)).is_ok());
    }

    #[test]
    fn test_missing_marker_rejected() {
        let mut value = basic_schema();
        value.as_object_mut().unwrap().remove("header");
        let err = SchemaDef::compile(1, &schema_json(value)).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }));

        let mut value = basic_schema();
        value["footer"] = json!(0);
        let err = SchemaDef::compile(1, &schema_json(value)).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }));
    }

    #[test]
    fn test_multiple_integrity_fields_rejected() {
        let mut value = basic_schema();
        value["fields"][1]["integrity"] = json!(true);
        let err = SchemaDef::compile(1, &schema_json(value)).unwrap_err();
        assert!(matches!(err, Error::MultipleIntegrityFields(_)));
    }

    #[test]
    fn test_pattern_matches_window() {
        let def = SchemaDef::compile(1, &schema_json(basic_schema())).unwrap();
        let mut window = vec![0u8; 32];
        window[..4].copy_from_slice(&def.pattern.header);
        window[28..].copy_from_slice(&def.pattern.footer);
        assert!(def.pattern.matches(&window));

        window[31] = 0;
        assert!(!def.pattern.matches(&window));
        assert!(!def.pattern.matches(&window[..31]));
    }
}
