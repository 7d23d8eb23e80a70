//! Extract ra & dec from a set of EPIC catalogs into a reference catalog.
//!
//! The result can be passed to `epicwash --epic` to exclude sources that
//! have already been published.
//!
//! Usage:
//! ```
//! cargo run --release --bin epicwash_prepare -- [OPTIONS] <FILENAME>...
//! ```

use clap::Parser;
use epicwash::reference::{prepare_reference, DEFAULT_REFERENCE_FILENAME};
use epicwash::shared_args::{LoggingArgs, MatchingArgs};
use epicwash::{CatalogSchema, Tolerance};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "epicwash-prepare",
    about = "Extract ra & dec from a set of EPIC catalogs and write them to a reference \
             catalog. Such a catalog can then be used as input for the `epicwash` command.",
    long_about = None
)]
struct Args {
    /// EPIC catalogs in DMC format (may be gzipped)
    #[arg(required = true)]
    filename: Vec<PathBuf>,

    /// Output filename
    #[arg(short, long, value_name = "FILENAME", default_value = DEFAULT_REFERENCE_FILENAME)]
    output: PathBuf,

    #[command(flatten)]
    matching: MatchingArgs,

    /// The input catalogs start with a header line
    #[arg(long)]
    header: bool,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    args.logging.init();

    let tolerance = Tolerance::from_arcsec(args.matching.matching_radius)?;
    let schema = CatalogSchema::dmc().with_header(args.header);
    let report = prepare_reference(&args.filename, &schema, &args.output, &tolerance)?;

    println!(
        "Read {} positions from {} catalogs, removed {} duplicates, wrote {} to {}",
        report.positions_read,
        report.inputs,
        report.duplicates_removed,
        report.positions_written,
        report.output_path.display()
    );
    Ok(())
}
