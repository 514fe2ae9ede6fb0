//! Hexdump command implementation.
//!
//! Displays a signature's raw window bytes, useful for checking marker
//! placement and offset math against the schema.
//!
//! # Output Format
//!
//! ```text
//! 0x000: DD CC BB AA 07 00 9A 3C  71 55 00 00 00 00 00 00  |........qU......|
//! ```

use std::path::Path;

use anyhow::Result;
use fwsig_core::{FileHandle, SchemaRegistry};

/// Run the hexdump command
pub fn run(registry: &SchemaRegistry, image: &Path, index: usize, ascii: bool) -> Result<()> {
    let mut handle = FileHandle::deserialize(image, registry)?;
    let sig = super::signature_at(&mut handle, index)?;

    println!(
        "Signature '{}' at {:#x} ({} bytes):",
        sig.schema().name,
        sig.file_offset(),
        sig.raw_bytes().len()
    );
    println!();

    for (i, chunk) in sig.raw_bytes().chunks(16).enumerate() {
        let offset = i * 16;
        print!("0x{:03X}: ", offset);

        // Hex bytes
        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                print!(" ");
            }
            print!("{:02X} ", byte);
        }

        // Padding for incomplete lines
        if chunk.len() < 16 {
            for j in chunk.len()..16 {
                if j == 8 {
                    print!(" ");
                }
                print!("   ");
            }
        }

        // ASCII representation
        if ascii {
            print!(" |");
            for byte in chunk {
                if *byte >= 0x20 && *byte < 0x7F {
                    print!("{}", *byte as char);
                } else {
                    print!(".");
                }
            }
            for _ in chunk.len()..16 {
                print!(" ");
            }
            print!("|");
        }

        println!();
    }

    Ok(())
}
