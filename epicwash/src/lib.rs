//! Prevents new K2 EPIC catalogs from containing duplicate entries.
//!
//! A new catalog is washed in three stages: sources observed more than once
//! within a small angular tolerance are collapsed to their first occurrence,
//! sources already present in a previously published reference catalog are
//! removed, and the survivors can be given fresh sequential identifiers.
//!
//! Positional matching is done in process with a declination-banded spatial
//! index and exact great-circle distances.
//!
//! ```no_run
//! use epicwash::{Pipeline, WashConfig};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> Result<(), epicwash::WashError> {
//! let config = WashConfig {
//!     tolerance_arcsec: 0.1,
//!     reference_path: Some(PathBuf::from("epic.csv")),
//!     start_id: Some(211_000_000),
//!     ..WashConfig::default()
//! };
//! let report = Pipeline::new(config)?.run(Path::new("c5_new.dmc"))?;
//! println!("kept {} of {} rows", report.output_rows, report.input_rows);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod index;
pub mod matcher;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod renumber;
pub mod shared_args;
pub mod sky;

pub use catalog::{Catalog, CatalogSchema, Delimiter, SourceRecord};
pub use config::WashConfig;
pub use error::{Result, WashError};
pub use pipeline::{Pipeline, WashReport};
pub use sky::{SkyPosition, Tolerance};
