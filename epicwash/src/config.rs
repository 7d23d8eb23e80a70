//! Run configuration.
//!
//! Everything a washing run needs is carried in one [`WashConfig`] passed to
//! the pipeline; nothing is read from process-wide state. Configurations can
//! be kept as JSON files and overridden from the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSchema;
use crate::error::{Result, WashError};
use crate::sky::{Tolerance, DEFAULT_MATCHING_RADIUS_ARCSEC};

/// Suffix appended to the input path when no output path is given.
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".epicwash";

/// Options for one washing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WashConfig {
    /// Cross-matching distance in arcseconds
    pub tolerance_arcsec: f64,
    /// Catalog of pre-existing sources to exclude; filtering is skipped when absent
    pub reference_path: Option<PathBuf>,
    /// Destination; defaults to the input path with [`DEFAULT_OUTPUT_SUFFIX`] appended
    pub output_path: Option<PathBuf>,
    /// First identifier to assign; renumbering is skipped when absent
    pub start_id: Option<u64>,
    pub input_schema: CatalogSchema,
    pub reference_schema: CatalogSchema,
    /// Re-emit the input header line, when the input schema declares one
    pub write_header: bool,
}

impl Default for WashConfig {
    fn default() -> Self {
        Self {
            tolerance_arcsec: DEFAULT_MATCHING_RADIUS_ARCSEC,
            reference_path: None,
            output_path: None,
            start_id: None,
            input_schema: CatalogSchema::dmc(),
            reference_schema: CatalogSchema::reference(),
            write_header: false,
        }
    }
}

impl WashConfig {
    pub fn tolerance(&self) -> Result<Tolerance> {
        Tolerance::from_arcsec(self.tolerance_arcsec)
    }

    /// The output path for washing `input`.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => {
                let mut name = input.as_os_str().to_owned();
                name.push(DEFAULT_OUTPUT_SUFFIX);
                PathBuf::from(name)
            }
        }
    }

    /// Check the configuration for washing `input`.
    pub fn validate(&self, input: &Path) -> Result<()> {
        self.tolerance()?;
        self.input_schema.validate()?;
        self.reference_schema.validate()?;

        let output = self.output_for(input);
        if output == input {
            return Err(WashError::InvalidConfig(format!(
                "output path {} would overwrite the input",
                output.display()
            )));
        }
        if self.reference_path.as_deref() == Some(output.as_path()) {
            return Err(WashError::InvalidConfig(format!(
                "output path {} would overwrite the reference catalog",
                output.display()
            )));
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| WashError::io(path, e))
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| WashError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
