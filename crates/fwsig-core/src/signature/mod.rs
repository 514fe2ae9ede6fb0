//! Runtime signature instances: decoded fields, integrity state, mutation
//! and write-back.

mod integrity;

pub use integrity::ImageBoundaries;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::field::FieldValue;
use crate::schema::{FieldDef, SchemaDef, SchemaRegistry};
use integrity::ImageRange;

/// One decoded field: its compiled definition plus its current value.
#[derive(Debug, Clone)]
pub struct Field {
    pub def: FieldDef,
    pub value: FieldValue,
}

/// A signature discovered in a file.
///
/// Owns a copy of its byte window; the window and the field list are kept
/// consistent by re-serializing after every mutation. A signature whose
/// window matched but failed to decode is kept with an empty field list,
/// visible but unusable (`is_decoded` returns false).
#[derive(Debug)]
pub struct Signature {
    schema: Arc<SchemaDef>,
    path: PathBuf,
    buffer: Vec<u8>,
    file_offset: u64,
    fields: Vec<Field>,
    boundaries: Option<ImageBoundaries>,
    verified: bool,
    product_name: Option<String>,
    manufacturer_name: Option<String>,
    family_name: Option<String>,
}

impl Signature {
    /// Build a signature from a confirmed match window.
    ///
    /// `file_data` is the scan's view of the whole file, used for the
    /// initial integrity check without re-reading from disk.
    pub(crate) fn from_window(
        schema: Arc<SchemaDef>,
        window: Vec<u8>,
        file_offset: u64,
        file_data: &[u8],
        registry: &SchemaRegistry,
        path: &Path,
    ) -> Self {
        let mut sig = Signature {
            schema,
            path: path.to_path_buf(),
            buffer: window,
            file_offset,
            fields: Vec::new(),
            boundaries: None,
            verified: false,
            product_name: None,
            manufacturer_name: None,
            family_name: None,
        };

        let fields = decode_values(&sig.schema, &sig.buffer)
            .and_then(|values| build_fields(&sig.schema, values));
        match fields {
            Ok(fields) => sig.fields = fields,
            Err(e) => {
                warn!(
                    "Keeping undecodable signature at {:#x} in {:?}: {}",
                    file_offset, path, e
                );
                return sig;
            }
        }

        sig.boundaries = integrity::derive_boundaries(&sig.fields, file_offset);
        sig.enrich(registry);

        match sig.check_against_data(file_data) {
            Ok(ok) => {
                sig.verified = ok;
                if !ok {
                    warn!(
                        "Integrity check failed for signature at {:#x} in {:?}",
                        file_offset, path
                    );
                }
            }
            Err(e) => {
                debug!(
                    "Integrity check unavailable for signature at {:#x} in {:?}: {}",
                    file_offset, path, e
                );
            }
        }

        sig
    }

    pub fn schema(&self) -> &Arc<SchemaDef> {
        &self.schema
    }

    /// Absolute offset of the signature window within its file.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Current window bytes, always consistent with the field list.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// False when the matched window could not be decoded; such a
    /// signature is kept visible but cannot be read, mutated or saved.
    pub fn is_decoded(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn boundaries(&self) -> Option<&ImageBoundaries> {
        self.boundaries.as_ref()
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn manufacturer_name(&self) -> Option<&str> {
        self.manufacturer_name.as_deref()
    }

    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    pub fn find_first_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.def.name == name)
    }

    /// Every field with this name; flattening can legitimately produce
    /// several when nested structs reuse a name.
    pub fn find_fields(&self, name: &str) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.def.name == name).collect()
    }

    pub fn get_field_data(&self, name: &str) -> Option<&FieldValue> {
        self.find_first_field(name).map(|f| &f.value)
    }

    /// Set a field's value and re-serialize the whole window.
    ///
    /// Read-only fields are never writable through this API; the value is
    /// kind-checked before anything is stored.
    pub fn set_field_data(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.def.name == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        if field.def.read_only {
            return Err(Error::ReadOnlyField(name.to_string()));
        }
        field.def.kind.check_value(name, &value)?;
        field.value = value;
        self.serialize_buffer()
    }

    /// Re-check the CRC against the on-disk image and record the result.
    pub fn verify(&mut self) -> Result<bool> {
        let range = integrity::image_range(self.boundaries.as_ref(), &self.fields, self.file_offset);
        let mut image = read_image_file(&self.path, &range)?;
        let ok = self.check_crc(&mut image, &range)?;
        self.verified = ok;
        if !ok {
            warn!(
                "Integrity check failed for signature at {:#x} in {:?}",
                self.file_offset, self.path
            );
        }
        Ok(ok)
    }

    /// Write the signature back into its image.
    ///
    /// Refuses an unverified signature unless `ignore_bad_integrity` is
    /// set. The CRC field is recomputed and rewritten on every save, even
    /// when no other field changed. The image is spliced and written in
    /// place at `image_offset` when the target exists, created otherwise.
    pub fn save(&mut self, file_name: Option<&Path>, ignore_bad_integrity: bool) -> Result<bool> {
        if !self.verified && !ignore_bad_integrity {
            return Err(Error::UnverifiedSignature);
        }
        let crc_def = self
            .schema
            .integrity_field()
            .cloned()
            .ok_or(Error::MissingIntegrityField)?;
        let range = integrity::image_range(self.boundaries.as_ref(), &self.fields, self.file_offset);
        let mut image = read_image_file(&self.path, &range)?;

        integrity::overlay(&mut image, range.overlay_offset, &self.buffer)?;
        let exclude = range.overlay_offset as usize + crc_def.offset;
        let computed = integrity::compute_crc(&image, exclude, crc_def.size)?;

        // The CRC field is exempt from the read_only rule here: saving
        // always refreshes it.
        if let Some(field) = self.fields.iter_mut().find(|f| f.def.is_integrity) {
            field.value = FieldValue::Int(u64::from(computed));
        }
        self.serialize_buffer()?;
        integrity::overlay(&mut image, range.overlay_offset, &self.buffer)?;

        let target = file_name.unwrap_or(self.path.as_path());
        write_image_at(target, range.image_offset, &image)?;
        self.verified = true;
        debug!(
            "Saved signature at {:#x} into {:?}: {} image bytes at {:#x}, crc {:#010x}",
            self.file_offset,
            target,
            image.len(),
            range.image_offset,
            computed
        );
        Ok(true)
    }

    /// Reconcile a stored `image_size` that exceeds the boundary-derived
    /// size by re-deriving `padding_bytes` and re-saving.
    ///
    /// Legacy images grew past their linker size (flash-sector alignment)
    /// without updating `padding_bytes`. This repair is an explicit
    /// operation; scanning and decoding never write to the file.
    pub fn repair_padding(&mut self) -> Result<bool> {
        let Some(boundaries) = self.boundaries else {
            return Err(Error::BoundariesUnavailable);
        };
        let Some(stored) = integrity::int_field(&self.fields, "image_size") else {
            return Ok(false);
        };
        if stored <= boundaries.image_size {
            return Ok(false);
        }
        let padding = stored - boundaries.image_size;
        if integrity::int_field(&self.fields, "padding_bytes") == Some(padding) {
            return Ok(false);
        }
        debug!(
            "Re-deriving padding_bytes = {:#x} for signature at {:#x}",
            padding, self.file_offset
        );
        self.set_field_data("padding_bytes", FieldValue::Int(padding))?;
        self.save(None, true)?;
        Ok(true)
    }

    /// Initial integrity check against the scan's in-memory file view.
    fn check_against_data(&self, data: &[u8]) -> Result<bool> {
        let range = integrity::image_range(self.boundaries.as_ref(), &self.fields, self.file_offset);
        let mut image = slice_image(data, &range)?;
        self.check_crc(&mut image, &range)
    }

    /// Verify-mode CRC check: overlay the current window, compute, compare.
    /// A computed value of exactly zero is rejected as degenerate.
    fn check_crc(&self, image: &mut [u8], range: &ImageRange) -> Result<bool> {
        let crc_def = self
            .schema
            .integrity_field()
            .ok_or(Error::MissingIntegrityField)?;
        let stored = integrity::int_field(&self.fields, &crc_def.name)
            .ok_or(Error::MissingIntegrityField)? as u32;

        integrity::overlay(image, range.overlay_offset, &self.buffer)?;
        let exclude = range.overlay_offset as usize + crc_def.offset;
        let computed = integrity::compute_crc(image, exclude, crc_def.size)?;
        if computed == 0 {
            return Err(Error::IntegrityCheckFailed { stored, computed });
        }
        Ok(computed == stored)
    }

    /// Re-pack every field at its recorded offset.
    fn serialize_buffer(&mut self) -> Result<()> {
        for field in &self.fields {
            let start = field.def.offset;
            let end = start + field.def.size;
            field
                .def
                .kind
                .encode(&field.def.name, &field.value, &mut self.buffer[start..end])?;
        }
        Ok(())
    }

    fn enrich(&mut self, registry: &SchemaRegistry) {
        let group_id = self.schema.group_id;
        let product = integrity::int_field(&self.fields, "product_id").and_then(|id| {
            let sub_id = integrity::int_field(&self.fields, "product_sub_id");
            registry.product_name(group_id, id, sub_id).map(str::to_string)
        });
        let manufacturer = integrity::int_field(&self.fields, "manufacturer_id")
            .and_then(|id| registry.manufacturer_name(group_id, id).map(str::to_string));
        let family = integrity::int_field(&self.fields, "family_id")
            .and_then(|id| registry.family_name(group_id, id).map(str::to_string));
        self.product_name = product;
        self.manufacturer_name = manufacturer;
        self.family_name = family;
    }
}

/// Decode a window into one value per flattened leaf, in declaration
/// order. A `char[N]` consumes exactly one slot.
pub(crate) fn decode_values(schema: &SchemaDef, window: &[u8]) -> Result<Vec<FieldValue>> {
    let mut values = Vec::with_capacity(schema.fields.len());
    for def in &schema.fields {
        let end = def.offset + def.size;
        if end > window.len() {
            return Err(Error::DecodeFailed {
                offset: def.offset as u64,
                message: format!("field '{}' extends past the window", def.name),
            });
        }
        values.push(def.kind.decode(&window[def.offset..end]));
    }
    Ok(values)
}

/// Pair flattened definitions with decoded values in lockstep. A length
/// mismatch means the schema drifted from the data source; fail before
/// anything downstream can rely on misaligned fields.
pub(crate) fn build_fields(schema: &SchemaDef, values: Vec<FieldValue>) -> Result<Vec<Field>> {
    if values.len() != schema.fields.len() {
        return Err(Error::FieldCountMismatch {
            schema: schema.name.clone(),
            expected: schema.fields.len(),
            actual: values.len(),
        });
    }
    Ok(schema
        .fields
        .iter()
        .cloned()
        .zip(values)
        .map(|(def, value)| Field { def, value })
        .collect())
}

fn slice_image(data: &[u8], range: &ImageRange) -> Result<Vec<u8>> {
    let offset = range.image_offset as usize;
    let end = match range.length {
        Some(len) => offset + len as usize,
        None => data.len(),
    };
    if offset > data.len() || end > data.len() {
        return Err(Error::OutOfBounds {
            offset: range.image_offset,
            size: end.saturating_sub(offset),
            image_len: data.len() as u64,
        });
    }
    Ok(data[offset..end].to_vec())
}

fn read_image_file(path: &Path, range: &ImageRange) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| io_at(path, range.image_offset, e))?;
    file.seek(SeekFrom::Start(range.image_offset))
        .map_err(|e| io_at(path, range.image_offset, e))?;
    match range.length {
        Some(len) => {
            let mut image = vec![0u8; len as usize];
            file.read_exact(&mut image)
                .map_err(|e| io_at(path, range.image_offset, e))?;
            Ok(image)
        }
        None => {
            let mut image = Vec::new();
            file.read_to_end(&mut image)
                .map_err(|e| io_at(path, range.image_offset, e))?;
            Ok(image)
        }
    }
}

fn write_image_at(path: &Path, offset: u64, image: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| io_at(path, offset, e))?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| io_at(path, offset, e))?;
    file.write_all(image).map_err(|e| io_at(path, offset, e))?;
    Ok(())
}

fn io_at(path: &Path, offset: u64, source: std::io::Error) -> Error {
    Error::IoAt {
        path: path.to_path_buf(),
        offset,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    const DESCRIPTOR: &str = r#"
    {"signatures": [{
        "id": 1,
        "schemas": [{
            "name": "basic",
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
        }],
        "products": [{"id": 7, "subId": 0, "name": "Gateway Mk2", "description": ""}],
        "manufacturers": [],
        "families": []
    }]}
    "#;

    fn make_window(registry: &SchemaRegistry, product_id: u16) -> Vec<u8> {
        let schema = &registry.groups()[0].schemas[0];
        let mut window = vec![0u8; 32];
        window[..4].copy_from_slice(&schema.pattern.header);
        window[4..6].copy_from_slice(&product_id.to_le_bytes());
        window[28..].copy_from_slice(&schema.pattern.footer);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&window[..6]);
        hasher.update(&window[10..]);
        let crc = hasher.finalize();
        window[6..10].copy_from_slice(&crc.to_le_bytes());
        window
    }

    fn make_signature(registry: &SchemaRegistry, product_id: u16) -> Signature {
        let schema = registry.groups()[0].schemas[0].clone();
        let window = make_window(registry, product_id);
        Signature::from_window(
            schema,
            window.clone(),
            0,
            &window,
            registry,
            Path::new("unit-test.bin"),
        )
    }

    #[test]
    fn test_decode_and_enrich() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let sig = make_signature(&registry, 7);
        assert!(sig.is_decoded());
        assert!(sig.verified());
        assert_eq!(sig.get_field_data("product_id"), Some(&FieldValue::Int(7)));
        assert_eq!(sig.product_name(), Some("Gateway Mk2"));
        assert_eq!(sig.manufacturer_name(), None);
    }

    #[test]
    fn test_field_count_mismatch_detected() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let schema = &registry.groups()[0].schemas[0];
        let values = vec![FieldValue::Int(0); 3];
        let err = build_fields(schema, values).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldCountMismatch { expected: 5, actual: 3, .. }
        ));
    }

    #[test]
    fn test_set_field_reserializes_window() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let mut sig = make_signature(&registry, 1);
        sig.set_field_data("product_id", FieldValue::Int(0x0102)).unwrap();
        assert_eq!(&sig.raw_bytes()[4..6], &[0x02, 0x01]);
        sig.set_field_data("padding", FieldValue::Text("build7".into())).unwrap();
        assert_eq!(&sig.raw_bytes()[10..16], b"build7");
        assert_eq!(sig.raw_bytes()[16], 0);
    }

    #[test]
    fn test_read_only_field_rejected() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let mut sig = make_signature(&registry, 1);
        let before = sig.raw_bytes().to_vec();
        let err = sig.set_field_data("header", FieldValue::Int(1)).unwrap_err();
        assert!(matches!(err, Error::ReadOnlyField(_)));
        assert_eq!(sig.raw_bytes(), &before[..]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let mut sig = make_signature(&registry, 1);
        let err = sig.set_field_data("nope", FieldValue::Int(1)).unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)));
    }

    #[test]
    fn test_kind_checked_before_store() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let mut sig = make_signature(&registry, 1);
        let err = sig
            .set_field_data("product_id", FieldValue::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, Error::ValueTypeMismatch { .. }));
        assert_eq!(sig.get_field_data("product_id"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_scan_time_verification_detects_corruption() {
        let registry = SchemaRegistry::from_json(DESCRIPTOR).unwrap();
        let schema = registry.groups()[0].schemas[0].clone();
        let mut window = make_window(&registry, 1);
        // Flip a byte outside the CRC field.
        window[12] ^= 0xFF;
        let sig = Signature::from_window(
            schema,
            window.clone(),
            0,
            &window,
            &registry,
            Path::new("unit-test.bin"),
        );
        assert!(sig.is_decoded());
        assert!(!sig.verified());
    }
}
