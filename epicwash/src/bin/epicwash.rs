//! Removes duplicate or pre-existing entries from a new EPIC catalog.
//!
//! Usage:
//! ```
//! cargo run --release --bin epicwash -- [OPTIONS] <FILENAME>
//! ```
//!
//! The washed catalog is written next to the input with an `.epicwash`
//! suffix unless `--output` is given.

use clap::Parser;
use epicwash::shared_args::{parse_matching_radius, LoggingArgs};
use epicwash::{Pipeline, WashConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "epicwash",
    about = "Removes duplicate or pre-existing entries from a new EPIC catalog.",
    long_about = None
)]
struct Args {
    /// Path to a new EPIC catalog in DMC format (may be gzipped)
    filename: PathBuf,

    /// Output filename, defaults to the input path with the '.epicwash' suffix added
    #[arg(short, long, value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Cross-matching distance in arcsec (default: 0.1)
    #[arg(short = 'm', long, value_parser = parse_matching_radius)]
    matching_radius: Option<f64>,

    /// Catalog of pre-existing EPIC positions, ra in column 1 and dec in column 2
    #[arg(short, long, value_name = "CATALOG")]
    epic: Option<PathBuf>,

    /// Renumber surviving entries starting from this EPIC ID
    #[arg(long, value_name = "EPICID")]
    start_id: Option<u64>,

    /// JSON run configuration; explicit flags take precedence
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// The input catalog starts with a header line
    #[arg(long)]
    header: bool,

    /// Copy the input header line to the output
    #[arg(long, requires = "header")]
    keep_header: bool,

    #[command(flatten)]
    logging: LoggingArgs,
}

impl Args {
    fn to_config(&self) -> Result<WashConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => WashConfig::load_from_file(path)?,
            None => WashConfig::default(),
        };

        if let Some(radius) = self.matching_radius {
            config.tolerance_arcsec = radius;
        }
        if self.output.is_some() {
            config.output_path = self.output.clone();
        }
        if self.epic.is_some() {
            config.reference_path = self.epic.clone();
        }
        if self.start_id.is_some() {
            config.start_id = self.start_id;
        }
        if self.header {
            config.input_schema.header = true;
        }
        if self.keep_header {
            config.write_header = true;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    args.logging.init();

    let pipeline = Pipeline::new(args.to_config()?)?;
    let report = pipeline.run(&args.filename)?;

    println!("epicwash summary");
    println!("================");
    println!("Matching radius:       {} arcsec", pipeline.config().tolerance_arcsec);
    println!("Input rows:            {}", report.input_rows);
    println!(
        "Duplicates removed:    {} (in {} groups)",
        report.duplicates_removed, report.duplicate_groups
    );
    println!("Pre-existing removed:  {}", report.reference_matches_removed);
    println!("Output rows:           {}", report.output_rows);
    if let Some((first, last)) = report.id_range {
        println!("EPIC IDs assigned:     {first}..={last}");
    }
    println!("Output written to:     {}", report.output_path.display());

    Ok(())
}
