use std::path::Path;

use anyhow::{Result, bail};
use fwsig_core::{FileHandle, SchemaRegistry};

/// Run the verify command
pub fn run(registry: &SchemaRegistry, image: &Path) -> Result<()> {
    let mut handle = FileHandle::deserialize(image, registry)?;

    let mut failures = 0usize;
    for sig in handle.signatures_mut() {
        if !sig.is_decoded() {
            println!("{:#x}: matched but not decodable", sig.file_offset());
            failures += 1;
            continue;
        }
        match sig.verify() {
            Ok(true) => println!("{:#x}: ok", sig.file_offset()),
            Ok(false) => {
                println!("{:#x}: CRC MISMATCH", sig.file_offset());
                failures += 1;
            }
            Err(e) => {
                println!("{:#x}: {}", sig.file_offset(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} signature(s) failed verification", failures);
    }
    Ok(())
}
