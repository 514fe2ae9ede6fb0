use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::info;

use crate::error::{Error, Result};
use crate::field::FieldValue;
use crate::scan::scanner;
use crate::schema::SchemaRegistry;
use crate::signature::Signature;

/// One `(field name, expected value)` pair inside a criteria group.
#[derive(Debug, Clone)]
pub struct FieldMatch {
    pub name: String,
    pub value: FieldValue,
}

impl FieldMatch {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        FieldMatch {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A scanned file and the signatures discovered in it.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    signatures: Vec<Signature>,
}

impl FileHandle {
    /// Scan `path` with every schema in the registry.
    ///
    /// The file is opened read+write, matching the access `save` needs
    /// later. The memory map lives only for the scan: every signature
    /// copies its window out, and the map drops on all exit paths.
    pub fn deserialize<P: AsRef<Path>>(path: P, registry: &SchemaRegistry) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::IoAt {
                path: path.to_path_buf(),
                offset: 0,
                source: e,
            })?;
        let len = file.metadata()?.len();

        let mut signatures = Vec::new();
        if len > 0 {
            let mmap = unsafe { Mmap::map(&file)? };
            for schema in registry.schemas() {
                scanner::scan_schema(&mmap, schema, registry, path, &mut signatures);
            }
        }

        if signatures.is_empty() {
            return Err(Error::NoSignatures(path.to_path_buf()));
        }
        signatures.sort_by_key(Signature::file_offset);
        info!("Found {} signature(s) in {:?}", signatures.len(), path);

        Ok(FileHandle {
            path: path.to_path_buf(),
            signatures,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn signatures_mut(&mut self) -> &mut [Signature] {
        &mut self.signatures
    }

    /// Filter signatures by criteria groups: a signature must satisfy
    /// every group (AND), and satisfies one group when any of its pairs
    /// matches any same-named decoded field (OR).
    pub fn find_signatures(&self, criteria: &[Vec<FieldMatch>]) -> Vec<&Signature> {
        self.signatures
            .iter()
            .filter(|sig| {
                criteria.iter().all(|group| {
                    group.iter().any(|m| {
                        sig.find_fields(&m.name)
                            .iter()
                            .any(|f| f.value == m.value)
                    })
                })
            })
            .collect()
    }
}
