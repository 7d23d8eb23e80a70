//! Assigns new EPIC IDs to all catalog entries.
//!
//! Streams the catalog one line at a time, so arbitrarily large catalogs
//! renumber in constant memory.
//!
//! Usage:
//! ```
//! cargo run --release --bin epicwash_renumber -- [OPTIONS] <FILENAME> <EPICID>
//! ```

use clap::Parser;
use epicwash::renumber::renumber_file;
use epicwash::shared_args::{DelimiterArg, LoggingArgs};
use std::path::PathBuf;

/// Suffix appended to the input path when no output path is given
const DEFAULT_RENUMBER_SUFFIX: &str = "-renumbered";

#[derive(Parser, Debug)]
#[command(
    name = "epicwash-renumber",
    about = "Assigns new EPIC IDs to all catalog entries.",
    long_about = None
)]
struct Args {
    /// EPIC catalog in DMC format
    filename: PathBuf,

    /// Desired EPIC ID of the first entry
    epicid: u64,

    /// Output filename. Adds suffix '-renumbered' by default
    #[arg(short, long, value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Field separator of the catalog
    #[arg(long, value_enum, default_value_t = DelimiterArg::Pipe)]
    delimiter: DelimiterArg,

    /// Pass the first line through untouched as a header
    #[arg(long)]
    header: bool,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    args.logging.init();

    let output = args.output.clone().unwrap_or_else(|| {
        let mut name = args.filename.as_os_str().to_owned();
        name.push(DEFAULT_RENUMBER_SUFFIX);
        PathBuf::from(name)
    });

    let summary = renumber_file(
        &args.filename,
        &output,
        args.epicid,
        args.delimiter.into(),
        args.header,
    )?;
    println!("Renumbered {} entries into {}", summary.records, output.display());
    Ok(())
}
