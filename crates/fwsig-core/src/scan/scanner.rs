use std::path::Path;
use std::sync::Arc;

use memchr::memmem;
use tracing::debug;

use crate::schema::{SchemaDef, SchemaRegistry};
use crate::signature::Signature;

/// Scan a file buffer for every occurrence of one schema's pattern.
///
/// Two-anchor search: find the fixed 4-byte header marker, then confirm a
/// full window fits and ends with the footer marker. A confirmed match
/// advances the cursor past its window so back-to-back signatures are all
/// found; a failed candidate advances one byte so overlapping placements
/// are not skipped.
pub(crate) fn scan_schema(
    data: &[u8],
    schema: &Arc<SchemaDef>,
    registry: &SchemaRegistry,
    path: &Path,
    out: &mut Vec<Signature>,
) {
    let finder = memmem::Finder::new(&schema.pattern.header);
    let mut cursor = 0usize;
    let mut found = 0usize;

    while cursor < data.len() {
        let Some(rel) = finder.find(&data[cursor..]) else {
            break;
        };
        let start = cursor + rel;
        let end = start + schema.size;
        if end > data.len() {
            // No full window fits at or after this candidate.
            break;
        }
        if data[end - 4..end] == schema.pattern.footer {
            debug!("Schema '{}' matched at {:#x} in {:?}", schema.name, start, path);
            out.push(Signature::from_window(
                Arc::clone(schema),
                data[start..end].to_vec(),
                start as u64,
                data,
                registry,
                path,
            ));
            found += 1;
            cursor = end;
        } else {
            cursor = start + 1;
        }
    }

    debug!(
        "Schema '{}': {} signature(s) in {:?}",
        schema.name, found, path
    );
}
