use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::def::SchemaDef;
use crate::schema::descriptor::{DescriptorRoot, FamilyJson, ManufacturerJson, ProductJson};
use crate::schema::jsonc::strip_comments;

/// One compiled signature group: its schemas plus the enrichment tables
/// used to resolve ids into display names.
#[derive(Debug)]
pub struct SchemaGroup {
    pub id: u32,
    pub schemas: Vec<Arc<SchemaDef>>,
    pub products: Vec<ProductJson>,
    pub manufacturers: Vec<ManufacturerJson>,
    pub families: Vec<FamilyJson>,
}

/// Immutable registry of every compiled schema.
///
/// Built once from a descriptor file and shared by reference with every
/// `FileHandle`; there is no global mutable state.
#[derive(Debug)]
pub struct SchemaRegistry {
    groups: Vec<SchemaGroup>,
}

impl SchemaRegistry {
    /// Load and compile a descriptor file (JSON, `//`/`/* */` comments
    /// allowed). Any schema failing validation is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Compile a registry from descriptor text.
    pub fn from_json(content: &str) -> Result<Self> {
        let stripped = strip_comments(content);
        let root: DescriptorRoot = serde_json::from_str(&stripped)?;

        let mut groups = Vec::with_capacity(root.signatures.len());
        for group in &root.signatures {
            let mut schemas = Vec::with_capacity(group.schemas.len());
            for schema in &group.schemas {
                let def = SchemaDef::compile(group.id, schema)?;
                debug!(
                    "Compiled schema '{}' (group {}): {} bytes, format {}",
                    def.name, group.id, def.size, def.format
                );
                schemas.push(Arc::new(def));
            }
            groups.push(SchemaGroup {
                id: group.id,
                schemas,
                products: group.products.clone(),
                manufacturers: group.manufacturers.clone(),
                families: group.families.clone(),
            });
        }

        Ok(SchemaRegistry { groups })
    }

    pub fn groups(&self) -> &[SchemaGroup] {
        &self.groups
    }

    pub fn group(&self, id: u32) -> Option<&SchemaGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// All schemas across groups, in declaration order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<SchemaDef>> {
        self.groups.iter().flat_map(|g| g.schemas.iter())
    }

    /// Schemas matching `name`, or every schema when `name` is `None`.
    pub fn find_schemas(&self, name: Option<&str>) -> Vec<Arc<SchemaDef>> {
        self.schemas()
            .filter(|s| name.is_none_or(|n| s.name.eq_ignore_ascii_case(n)))
            .cloned()
            .collect()
    }

    /// Schemas flagged as default, used when a caller does not pick one.
    pub fn default_schemas(&self) -> Vec<Arc<SchemaDef>> {
        self.schemas().filter(|s| s.is_default).cloned().collect()
    }

    pub fn product_name(&self, group_id: u32, id: u64, sub_id: Option<u64>) -> Option<&str> {
        self.group(group_id)?
            .products
            .iter()
            .find(|p| p.id == id && sub_id.is_none_or(|s| p.sub_id == s))
            .map(|p| p.name.as_str())
    }

    pub fn manufacturer_name(&self, group_id: u32, id: u64) -> Option<&str> {
        self.group(group_id)?
            .manufacturers
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.as_str())
    }

    pub fn family_name(&self, group_id: u32, id: u64) -> Option<&str> {
        self.group(group_id)?
            .families
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.name.as_str())
    }
}
