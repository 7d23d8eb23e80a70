//! Exclusion of sources that already exist in a published catalog.

use log::debug;
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::index::SpatialIndex;
use crate::sky::Tolerance;

/// Outcome of filtering against a reference catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub catalog: Catalog,
    pub removed: usize,
}

/// Drop every record that lies within `tolerance` of any reference position.
///
/// Reference content is never copied into the output; surviving records keep
/// their relative order.
pub fn exclude_reference_matches(
    catalog: Catalog,
    reference: &SpatialIndex,
    tolerance: &Tolerance,
) -> FilterOutcome {
    debug!(
        "Checking {} records against {} reference positions",
        catalog.len(),
        reference.len()
    );
    let keep: Vec<bool> = catalog
        .records()
        .par_iter()
        .map(|record| !reference.any_within(&record.position(), tolerance))
        .collect();
    let removed = keep.iter().filter(|&&k| !k).count();
    debug!(
        "{} of {} records matched the reference catalog",
        removed,
        catalog.len()
    );

    FilterOutcome {
        catalog: catalog.retain_flagged(&keep),
        removed,
    }
}
