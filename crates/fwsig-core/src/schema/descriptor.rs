//! Serde types for the schema descriptor JSON.
//!
//! The descriptor is parsed strongly typed, once, at registry load; no
//! per-access coercion happens downstream.

use serde::Deserialize;

use crate::schema::numeric::NumLit;

#[derive(Debug, Deserialize)]
pub struct DescriptorRoot {
    pub signatures: Vec<GroupJson>,
}

/// One signature group: a set of schemas plus enrichment tables.
#[derive(Debug, Deserialize)]
pub struct GroupJson {
    pub id: u32,
    pub schemas: Vec<SchemaJson>,
    #[serde(default)]
    pub products: Vec<ProductJson>,
    #[serde(default)]
    pub manufacturers: Vec<ManufacturerJson>,
    #[serde(default)]
    pub families: Vec<FamilyJson>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaJson {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub header: Option<NumLit>,
    pub footer: Option<NumLit>,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub fields: Vec<FieldJson>,
}

#[derive(Debug, Deserialize)]
pub struct FieldJson {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub integrity: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub type_info: Option<serde_json::Value>,
    /// Children of a `struct` entry; empty for leaves.
    #[serde(default)]
    pub fields: Vec<FieldJson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductJson {
    pub id: u64,
    #[serde(rename = "subId", default)]
    pub sub_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManufacturerJson {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyJson {
    pub id: u64,
    pub name: String,
}
