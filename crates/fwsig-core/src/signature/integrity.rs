//! Image boundary math and CRC32 integrity checks.
//!
//! Boundary addresses are linker-assigned virtual addresses carried inside
//! the signature itself; they locate, within a larger multi-image binary,
//! where the host image begins and ends.

use tracing::warn;

use crate::error::{Error, Result};
use crate::signature::Field;

/// Byte boundaries of the image hosting a signature, derived from the
/// `start_addr` / `sig_start_addr` / `end_addr` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBoundaries {
    pub start_addr: u64,
    pub sig_start_addr: u64,
    pub end_addr: u64,
    pub image_size: u64,
    pub offset_from_image_start: u64,
    pub image_offset: u64,
}

/// Where the image bytes live in the file and where the signature sits
/// inside them. `length` of `None` means "to end of file".
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageRange {
    pub image_offset: u64,
    pub length: Option<u64>,
    pub overlay_offset: u64,
}

/// Derive boundaries from the signature's address fields.
///
/// Requires `start_addr < sig_start_addr < end_addr` and an
/// `offset_from_image_start` no larger than the signature's file offset;
/// otherwise boundaries stay unset and offset-based verification is
/// unavailable.
pub(crate) fn derive_boundaries(fields: &[Field], file_offset: u64) -> Option<ImageBoundaries> {
    let start_addr = int_field(fields, "start_addr")?;
    let sig_start_addr = int_field(fields, "sig_start_addr")?;
    let end_addr = int_field(fields, "end_addr")?;

    if !(start_addr < sig_start_addr && sig_start_addr < end_addr) {
        warn!(
            "Address ordering violated ({:#x}, {:#x}, {:#x}); image boundaries unavailable",
            start_addr, sig_start_addr, end_addr
        );
        return None;
    }

    let offset_from_image_start = sig_start_addr - start_addr;
    if offset_from_image_start > file_offset {
        warn!(
            "Signature at {:#x} cannot sit {:#x} bytes into its image; boundaries unavailable",
            file_offset, offset_from_image_start
        );
        return None;
    }

    Some(ImageBoundaries {
        start_addr,
        sig_start_addr,
        end_addr,
        image_size: end_addr - start_addr,
        offset_from_image_start,
        image_offset: file_offset - offset_from_image_start,
    })
}

/// Resolve the image byte range for a signature.
///
/// With boundaries the range is exactly the derived one. Without them the
/// file itself is treated as the image: offset zero, the signature at its
/// file offset, and the stored `image_size` plus `padding_bytes` as the
/// length when a usable `image_size` field exists.
pub(crate) fn image_range(
    boundaries: Option<&ImageBoundaries>,
    fields: &[Field],
    file_offset: u64,
) -> ImageRange {
    match boundaries {
        Some(b) => ImageRange {
            image_offset: b.image_offset,
            length: Some(b.image_size),
            overlay_offset: b.offset_from_image_start,
        },
        None => {
            let stored = int_field(fields, "image_size").unwrap_or(0);
            let padding = int_field(fields, "padding_bytes").unwrap_or(0);
            ImageRange {
                image_offset: 0,
                length: if stored > 0 { Some(stored + padding) } else { None },
                overlay_offset: file_offset,
            }
        }
    }
}

/// CRC32 over `image` excluding `exclude_len` bytes at `exclude_offset`
/// (the integrity field's own range).
pub(crate) fn compute_crc(image: &[u8], exclude_offset: usize, exclude_len: usize) -> Result<u32> {
    let exclude_end = exclude_offset + exclude_len;
    if exclude_end > image.len() {
        return Err(Error::OutOfBounds {
            offset: exclude_offset as u64,
            size: exclude_len,
            image_len: image.len() as u64,
        });
    }
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&image[..exclude_offset]);
    hasher.update(&image[exclude_end..]);
    Ok(hasher.finalize())
}

/// Splice the signature's current bytes into the image buffer so edits
/// that have not been flushed still participate in the CRC.
pub(crate) fn overlay(image: &mut [u8], overlay_offset: u64, buffer: &[u8]) -> Result<()> {
    let offset = overlay_offset as usize;
    let end = offset + buffer.len();
    if end > image.len() {
        return Err(Error::OutOfBounds {
            offset: overlay_offset,
            size: buffer.len(),
            image_len: image.len() as u64,
        });
    }
    image[offset..end].copy_from_slice(buffer);
    Ok(())
}

/// Integer value of the first field named `name`, if any.
pub(crate) fn int_field(fields: &[Field], name: &str) -> Option<u64> {
    fields
        .iter()
        .find(|f| f.def.name == name)
        .and_then(|f| f.value.as_int())
}
