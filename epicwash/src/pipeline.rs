//! The washing pipeline.
//!
//! One configurable pass over a new catalog:
//!
//! ```text
//! read ─► self-match ─► resolve duplicates ─► [reference filter] ─► [renumber] ─► write
//! ```
//!
//! The reference catalog, when configured, is loaded before any matching so
//! an unusable reference fails the run early. Output is written atomically
//! after every stage has succeeded; a failed run leaves nothing at the
//! output path.

use std::path::{Path, PathBuf};

use log::info;

use crate::catalog::{read_catalog, write_catalog};
use crate::config::WashConfig;
use crate::dedup::remove_duplicates;
use crate::error::{Result, WashError};
use crate::filter::exclude_reference_matches;
use crate::output::write_atomically;
use crate::reference::ReferenceCatalog;
use crate::renumber::renumber_catalog;
use crate::sky::Tolerance;

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WashReport {
    pub input_rows: usize,
    pub duplicate_groups: usize,
    pub duplicates_removed: usize,
    pub reference_matches_removed: usize,
    pub output_rows: usize,
    /// First and last identifiers assigned, when renumbering ran on a non-empty catalog
    pub id_range: Option<(u64, u64)>,
    pub output_path: PathBuf,
}

/// A validated washing configuration, ready to run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: WashConfig,
    tolerance: Tolerance,
}

impl Pipeline {
    pub fn new(config: WashConfig) -> Result<Self> {
        let tolerance = config.tolerance()?;
        Ok(Self { config, tolerance })
    }

    pub fn config(&self) -> &WashConfig {
        &self.config
    }

    /// Wash one catalog file.
    pub fn run(&self, input: &Path) -> Result<WashReport> {
        self.config.validate(input)?;
        let output = self.config.output_for(input);

        let reference = match &self.config.reference_path {
            Some(path) => Some(ReferenceCatalog::load(
                path,
                &self.config.reference_schema,
                &self.tolerance,
            )?),
            None => None,
        };

        info!("Reading {}", input.display());
        let catalog = read_catalog(input, &self.config.input_schema)?;
        let input_rows = catalog.len();

        let deduped = remove_duplicates(catalog, &self.tolerance);
        let mut catalog = deduped.catalog;

        let mut reference_matches_removed = 0;
        if let Some(reference) = &reference {
            info!("Removing objects that pre-exist in {}", reference.path().display());
            let filtered = exclude_reference_matches(catalog, reference.index(), &self.tolerance);
            reference_matches_removed = filtered.removed;
            catalog = filtered.catalog;
        }

        let id_range = match self.config.start_id {
            Some(start_id) => {
                info!("Assigning identifiers from {start_id}");
                renumber_catalog(&mut catalog, start_id)?
            }
            None => None,
        };

        info!("Writing {}", output.display());
        let write_header = self.config.write_header;
        write_atomically(&output, |writer| {
            write_catalog(writer, &catalog, write_header).map_err(|e| WashError::io(&output, e))
        })?;

        let report = WashReport {
            input_rows,
            duplicate_groups: deduped.groups.len(),
            duplicates_removed: deduped.removed,
            reference_matches_removed,
            output_rows: catalog.len(),
            id_range,
            output_path: output,
        };
        info!(
            "Kept {} of {} rows ({} duplicates, {} pre-existing)",
            report.output_rows, report.input_rows, report.duplicates_removed, report.reference_matches_removed
        );
        Ok(report)
    }
}
