//! Spatial index for cone searches over catalog positions.
//!
//! The sky is split into declination bands of equal height. Each band is
//! split into right ascension bins whose count shrinks toward the poles so
//! that every cell spans at least the cell size on the sky; bands touching a
//! pole collapse to a single bin. Only occupied cells are stored.
//!
//! Query flow:
//! 1. Find the bands overlapping `[dec - r, dec + r]`, plus one neighbor on each side.
//! 2. Within each band, find the RA bins overlapping the cone's RA extent
//!    `asin(sin r / cos dec)`, plus one neighbor on each side, wrapping at 0/360.
//!    When the cone reaches a pole the whole band is scanned.
//! 3. Filter candidates with the exact haversine test.
//!
//! Neighbor padding keeps floating point rounding at cell edges from ever
//! dropping a candidate; the exact test removes anything outside the cone.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use crate::sky::{haversine_term, SkyPosition, Tolerance};

/// Smallest cell edge in degrees (one arcminute).
///
/// Sub-arcsecond tolerances would otherwise produce cells so small that each
/// record sits alone and every query pays for empty neighbor lookups.
pub const MIN_CELL_SIZE_DEG: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    band: u32,
    bin: u32,
}

/// Declination-banded index over a fixed set of positions.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    band_bins: Vec<u32>,
    cells: HashMap<CellKey, Vec<u32>>,
    positions: Vec<SkyPosition>,
}

impl SpatialIndex {
    /// Build an index with cells sized for matching at `tolerance`.
    ///
    /// Cells are at least twice the tolerance and never below [`MIN_CELL_SIZE_DEG`].
    pub fn build(positions: Vec<SkyPosition>, tolerance: &Tolerance) -> Self {
        let cell_size = (2.0 * tolerance.degrees()).max(MIN_CELL_SIZE_DEG);
        Self::with_cell_size(positions, cell_size)
    }

    /// Build an index with an explicit cell edge in degrees.
    pub fn with_cell_size(positions: Vec<SkyPosition>, cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.clamp(MIN_CELL_SIZE_DEG, 180.0)
        } else {
            180.0
        };
        let n_bands = (180.0 / cell_size).ceil().max(1.0) as usize;
        let band_bins = (0..n_bands)
            .map(|band| bins_in_band(band, cell_size))
            .collect::<Vec<_>>();

        let keys: Vec<CellKey> = positions
            .par_iter()
            .map(|p| cell_key(&band_bins, cell_size, p))
            .collect();

        let mut cells: HashMap<CellKey, Vec<u32>> = HashMap::new();
        for (idx, key) in keys.into_iter().enumerate() {
            cells.entry(key).or_default().push(idx as u32);
        }

        debug!(
            "Indexed {} positions into {} occupied cells ({:.2} arcsec cells, {} bands)",
            positions.len(),
            cells.len(),
            cell_size * 3600.0,
            n_bands
        );

        Self {
            cell_size,
            band_bins,
            cells,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Cell edge in degrees
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn positions(&self) -> &[SkyPosition] {
        &self.positions
    }

    /// Indices of all indexed positions within `tolerance` of `center`, ascending.
    pub fn query(&self, center: &SkyPosition, tolerance: &Tolerance) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .query_with_haversine(center, tolerance)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        out.sort_unstable();
        out
    }

    /// Matches within `tolerance` of `center` with their haversine terms, in no particular order.
    pub fn query_with_haversine(&self, center: &SkyPosition, tolerance: &Tolerance) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        self.for_each_candidate(center, tolerance.degrees(), |idx| {
            let h = haversine_term(center, &self.positions[idx]);
            if h <= tolerance.haversine() {
                out.push((idx, h));
            }
        });
        out
    }

    /// Whether any indexed position lies within `tolerance` of `center`.
    pub fn any_within(&self, center: &SkyPosition, tolerance: &Tolerance) -> bool {
        let mut found = false;
        self.for_each_candidate(center, tolerance.degrees(), |idx| {
            if !found && tolerance.contains(center, &self.positions[idx]) {
                found = true;
            }
        });
        found
    }

    /// Visit every indexed position in cells that may intersect the cone.
    ///
    /// Each index is visited at most once.
    fn for_each_candidate<F>(&self, center: &SkyPosition, radius_deg: f64, mut f: F)
    where
        F: FnMut(usize),
    {
        if self.cells.is_empty() {
            return;
        }
        let n_bands = self.band_bins.len() as i64;
        let band_lo = (band_of(center.dec - radius_deg, self.cell_size, n_bands) - 1).max(0);
        let band_hi = (band_of(center.dec + radius_deg, self.cell_size, n_bands) + 1).min(n_bands - 1);

        let reaches_pole = center.dec.abs() + radius_deg >= 90.0;
        let ra_half_span = if reaches_pole {
            None
        } else {
            let ratio = radius_deg.to_radians().sin() / center.dec_rad().cos();
            Some(ratio.clamp(0.0, 1.0).asin().to_degrees())
        };

        for band in band_lo..=band_hi {
            let n_bins = self.band_bins[band as usize] as i64;
            let bin_width = 360.0 / n_bins as f64;

            let span = ra_half_span.and_then(|half| {
                let lo = ((center.ra - half) / bin_width).floor() as i64 - 1;
                let hi = ((center.ra + half) / bin_width).floor() as i64 + 1;
                (hi - lo + 1 < n_bins).then_some((lo, hi))
            });

            match span {
                Some((lo, hi)) => {
                    for k in lo..=hi {
                        self.visit_cell(band as u32, k.rem_euclid(n_bins) as u32, &mut f);
                    }
                }
                None => {
                    for bin in 0..n_bins as u32 {
                        self.visit_cell(band as u32, bin, &mut f);
                    }
                }
            }
        }
    }

    fn visit_cell<F: FnMut(usize)>(&self, band: u32, bin: u32, f: &mut F) {
        if let Some(members) = self.cells.get(&CellKey { band, bin }) {
            for &idx in members {
                f(idx as usize);
            }
        }
    }
}

fn band_of(dec: f64, cell_size: f64, n_bands: i64) -> i64 {
    (((dec + 90.0) / cell_size).floor() as i64).clamp(0, n_bands - 1)
}

/// RA bin count for a band, chosen so a bin spans at least `cell_size` at the band's poleward edge.
fn bins_in_band(band: usize, cell_size: f64) -> u32 {
    let lo = -90.0 + band as f64 * cell_size;
    let hi = (lo + cell_size).min(90.0);
    let cos_min = lo.to_radians().cos().min(hi.to_radians().cos()).max(0.0);
    ((360.0 * cos_min / cell_size).floor() as u32).max(1)
}

fn cell_key(band_bins: &[u32], cell_size: f64, p: &SkyPosition) -> CellKey {
    let band = band_of(p.dec, cell_size, band_bins.len() as i64) as usize;
    let n_bins = band_bins[band];
    let bin_width = 360.0 / n_bins as f64;
    let bin = ((p.ra / bin_width).floor() as i64).clamp(0, n_bins as i64 - 1) as u32;
    CellKey {
        band: band as u32,
        bin,
    }
}
