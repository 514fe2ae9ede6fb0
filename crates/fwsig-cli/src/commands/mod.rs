//! CLI command implementations.

pub mod fields;
pub mod hexdump;
pub mod scan;
pub mod set;
pub mod verify;

use anyhow::{Context, Result, bail};
use fwsig_core::{FileHandle, Signature};

/// Pick one signature by scan index.
pub(crate) fn signature_at(handle: &mut FileHandle, index: usize) -> Result<&mut Signature> {
    let count = handle.signatures().len();
    handle
        .signatures_mut()
        .get_mut(index)
        .with_context(|| format!("signature index {} out of range (found {})", index, count))
}

/// Require a decoded signature before any field access.
pub(crate) fn require_decoded(sig: &Signature) -> Result<()> {
    if !sig.is_decoded() {
        bail!(
            "signature at {:#x} matched but could not be decoded",
            sig.file_offset()
        );
    }
    Ok(())
}
