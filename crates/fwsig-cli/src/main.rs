use anyhow::Result;
use clap::{Parser, Subcommand};
use fwsig_core::SchemaRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "fwsig")]
#[command(about = "Firmware signature inspection and signing tool")]
struct Cli {
    /// Schema descriptor file (JSON, comments allowed)
    #[arg(short, long, default_value = "signatures.json")]
    schemas: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every signature found in an image
    Scan {
        image: PathBuf,
        /// Restrict the listing to one schema
        #[arg(long)]
        schema: Option<String>,
    },
    /// Print the decoded fields of a signature
    Fields {
        image: PathBuf,
        /// Signature index from `scan` (defaults to all)
        #[arg(long)]
        index: Option<usize>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set a field value and save the signature back
    Set {
        image: PathBuf,
        /// Field name to write
        #[arg(long)]
        field: String,
        /// New value (integers accept 0x/0o prefixes)
        #[arg(long)]
        value: String,
        /// Signature index from `scan` (defaults to 0)
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// Save even when the integrity check failed
        #[arg(long)]
        force: bool,
        /// Write the signed image somewhere else
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check every signature's CRC; non-zero exit on failure
    Verify { image: PathBuf },
    /// Dump a signature's raw bytes
    Hexdump {
        image: PathBuf,
        /// Signature index from `scan` (defaults to 0)
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// Append an ASCII column
        #[arg(long)]
        ascii: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fwsig=info".parse()?))
        .init();

    let cli = Cli::parse();
    let registry = SchemaRegistry::load(&cli.schemas)?;

    match cli.command {
        Command::Scan { image, schema } => commands::scan::run(&registry, &image, schema.as_deref()),
        Command::Fields { image, index, json } => {
            commands::fields::run(&registry, &image, index, json)
        }
        Command::Set {
            image,
            field,
            value,
            index,
            force,
            output,
        } => commands::set::run(&registry, &image, &field, &value, index, force, output.as_deref()),
        Command::Verify { image } => commands::verify::run(&registry, &image),
        Command::Hexdump { image, index, ascii } => {
            commands::hexdump::run(&registry, &image, index, ascii)
        }
    }
}
