//! Reference catalogs of previously published positions.
//!
//! A reference catalog is read once per run and only ever used to exclude
//! new sources. [`prepare_reference`] builds one from a set of published
//! catalogs by extracting their positions and removing duplicates.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::info;

use crate::catalog::{open_catalog_reader, parse_catalog, write_catalog, Catalog, CatalogSchema, SourceRecord};
use crate::dedup::remove_duplicates;
use crate::error::{Result, RowIssue, WashError};
use crate::index::SpatialIndex;
use crate::output::write_atomically;
use crate::sky::Tolerance;

/// Default output name for a prepared reference catalog.
pub const DEFAULT_REFERENCE_FILENAME: &str = "epic.csv";

/// Positions of a reference catalog, indexed for exclusion queries.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    path: PathBuf,
    index: SpatialIndex,
}

impl ReferenceCatalog {
    /// Load and index a reference catalog.
    ///
    /// Every failure, including malformed rows, is reported as
    /// [`WashError::ReferenceCatalogUnreadable`].
    pub fn load(path: &Path, schema: &CatalogSchema, tolerance: &Tolerance) -> Result<Self> {
        let unreadable = |reason: String| WashError::ReferenceCatalogUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unreadable("no such file".to_string()));
        }
        schema.validate().map_err(|e| unreadable(e.to_string()))?;

        let reader = open_catalog_reader(path).map_err(|e| unreadable(e.to_string()))?;
        let catalog = parse_catalog(reader, schema, path).map_err(|e| match e {
            WashError::MalformedRecords { issues, .. } => unreadable(format!(
                "wrong schema ({} bad row(s), first at line {})",
                issues.len(),
                issues.first().map(|i: &RowIssue| i.line).unwrap_or(0)
            )),
            other => unreadable(other.to_string()),
        })?;

        let index = SpatialIndex::build(catalog.positions(), tolerance);
        info!(
            "Loaded {} reference positions from {} into {} sky cells",
            index.len(),
            path.display(),
            index.occupied_cells()
        );
        Ok(Self {
            path: path.to_path_buf(),
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }
}

/// Summary of a reference preparation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub inputs: usize,
    pub positions_read: usize,
    pub duplicates_removed: usize,
    pub positions_written: usize,
    pub output_path: PathBuf,
}

/// Extract positions from every input catalog, deduplicate them and write a reference catalog.
///
/// Output rows are `ra,dec`, copied verbatim from the input fields, which is
/// the default reference schema.
pub fn prepare_reference(
    inputs: &[PathBuf],
    input_schema: &CatalogSchema,
    output: &Path,
    tolerance: &Tolerance,
) -> Result<PrepareReport> {
    if inputs.is_empty() {
        return Err(WashError::InvalidConfig(
            "at least one input catalog is required".to_string(),
        ));
    }
    if inputs.iter().any(|input| input == output) {
        return Err(WashError::InvalidConfig(format!(
            "output {} is also an input",
            output.display()
        )));
    }
    input_schema.validate()?;

    info!("Extracting ra & dec from {} catalog files", inputs.len());
    let reference_schema = CatalogSchema::reference();
    let mut positions = Catalog::new(reference_schema);
    for input in inputs {
        let reader = open_catalog_reader(input)?;
        extract_positions(reader, input_schema, input, &mut positions)?;
    }
    let positions_read = positions.len();

    let outcome = remove_duplicates(positions, tolerance);
    let positions_written = outcome.catalog.len();

    write_atomically(output, |writer| {
        write_catalog(writer, &outcome.catalog, false).map_err(|e| WashError::io(output, e))
    })?;
    info!(
        "Processing finished. Output saved as {}",
        output.display()
    );

    Ok(PrepareReport {
        inputs: inputs.len(),
        positions_read,
        duplicates_removed: outcome.removed,
        positions_written,
        output_path: output.to_path_buf(),
    })
}

/// Append the position fields of each row of one catalog as `ra,dec` records.
fn extract_positions<R: BufRead>(
    reader: R,
    schema: &CatalogSchema,
    path: &Path,
    out: &mut Catalog,
) -> Result<()> {
    let catalog = parse_catalog(reader, schema, path)?;
    let delimiter = out.schema().delimiter;
    let ra_idx = schema.ra_column - 1;
    let dec_idx = schema.dec_column - 1;

    for record in catalog.records() {
        let fields: Vec<&[u8]> = record.fields(schema.delimiter).collect();
        let mut line = fields[ra_idx].trim_ascii().to_vec();
        line.push(delimiter.as_byte());
        line.extend_from_slice(fields[dec_idx].trim_ascii());
        out.push(SourceRecord::new(line, delimiter, record.position()));
    }
    Ok(())
}
