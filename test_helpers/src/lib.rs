//! Fixtures for catalog washing tests.
//!
//! This crate provides reproducible synthetic catalogs and small helpers for
//! writing them to disk, so unit and integration tests across the workspace
//! exercise the same data.
//!
//! # Reproducibility
//! All randomness comes from a ChaCha RNG seeded by the caller. The same seed
//! always produces the same catalog, on every platform.
//!
//! # Sky regions
//! Matching bugs concentrate where the sky's coordinates misbehave, so the
//! generator can focus sources on:
//! - **Full sky**: uniform on the sphere
//! - **North / south pole**: within a few arcminutes of a pole, where right
//!   ascension loses meaning
//! - **RA seam**: straddling right ascension 0/360
//!
//! # Injected duplicates
//! A configurable share of sources receive extra detections scattered within
//! a maximum offset. Tests must still compute ground truth themselves: a
//! scattered detection may land near an unrelated source.
//!
//! # Usage
//! ```rust
//! use test_helpers::{dmc_line, SkyRegion, SyntheticCatalog};
//!
//! let catalog = SyntheticCatalog::new(42)
//!     .sources(100)
//!     .region(SkyRegion::NorthPole)
//!     .duplicate_fraction(0.2)
//!     .max_offset_arcsec(0.05)
//!     .generate();
//! assert!(catalog.len() >= 100);
//!
//! let line = dmc_line(201000001, catalog[0].0, catalog[0].1);
//! assert_eq!(line.split('|').count(), 12);
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

/// Number of fields in a synthetic DMC row.
pub const DMC_FIELDS: usize = 12;

/// Where synthetic sources are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyRegion {
    FullSky,
    NorthPole,
    SouthPole,
    RaSeam,
}

/// Builder for seeded synthetic catalogs of `(ra, dec)` positions in degrees.
#[derive(Debug, Clone)]
pub struct SyntheticCatalog {
    seed: u64,
    sources: usize,
    region: SkyRegion,
    duplicate_fraction: f64,
    max_offset_arcsec: f64,
}

impl SyntheticCatalog {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            sources: 1000,
            region: SkyRegion::FullSky,
            duplicate_fraction: 0.0,
            max_offset_arcsec: 0.0,
        }
    }

    /// Number of distinct sources before duplicates are injected
    pub fn sources(mut self, sources: usize) -> Self {
        self.sources = sources;
        self
    }

    pub fn region(mut self, region: SkyRegion) -> Self {
        self.region = region;
        self
    }

    /// Share of sources that receive one to three extra detections
    pub fn duplicate_fraction(mut self, fraction: f64) -> Self {
        self.duplicate_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Largest offset of an extra detection from its source
    pub fn max_offset_arcsec(mut self, arcsec: f64) -> Self {
        self.max_offset_arcsec = arcsec.max(0.0);
        self
    }

    /// Generate positions. Extra detections are appended after all sources,
    /// in the order of the sources they copy.
    pub fn generate(&self) -> Vec<(f64, f64)> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut positions: Vec<(f64, f64)> = (0..self.sources)
            .map(|_| self.random_position(&mut rng))
            .collect();

        let mut extras = Vec::new();
        for &(ra, dec) in &positions {
            if rng.gen::<f64>() >= self.duplicate_fraction {
                continue;
            }
            let copies = rng.gen_range(1..=3);
            for _ in 0..copies {
                let offset = rng.gen_range(0.0..=self.max_offset_arcsec) / 3600.0;
                let bearing = rng.gen_range(0.0..std::f64::consts::TAU);
                extras.push(offset_position(ra, dec, offset, bearing));
            }
        }
        positions.extend(extras);
        positions
    }

    fn random_position(&self, rng: &mut ChaCha8Rng) -> (f64, f64) {
        match self.region {
            SkyRegion::FullSky => {
                let ra = rng.gen_range(0.0..360.0);
                let dec = rng.gen_range(-1.0f64..1.0).asin().to_degrees();
                (ra, dec)
            }
            SkyRegion::NorthPole => (rng.gen_range(0.0..360.0), 90.0 - rng.gen_range(0.0..0.05)),
            SkyRegion::SouthPole => (rng.gen_range(0.0..360.0), -90.0 + rng.gen_range(0.0..0.05)),
            SkyRegion::RaSeam => {
                let ra = wrap_ra(rng.gen_range(-0.05..0.05));
                (ra, rng.gen_range(-30.0..30.0))
            }
        }
    }
}

/// Move a position by `offset` degrees along `bearing` radians (flat-sky approximation).
fn offset_position(ra: f64, dec: f64, offset: f64, bearing: f64) -> (f64, f64) {
    let new_dec = (dec + offset * bearing.cos()).clamp(-90.0, 90.0);
    let cos_dec = new_dec.to_radians().cos().max(1e-6);
    let new_ra = wrap_ra(ra + offset * bearing.sin() / cos_dec);
    (new_ra, new_dec)
}

/// Fold a right ascension into `[0, 360)`.
pub fn wrap_ra(ra: f64) -> f64 {
    let wrapped = ra.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// A DMC row with the identifier in column 1, ra/dec in columns 10 and 11.
///
/// Positions are written with Rust's shortest round-trip formatting so they
/// parse back to exactly the same values.
pub fn dmc_line(id: u64, ra: f64, dec: f64) -> String {
    format!("{id}|K2|C05|0|1|2|3|4|5|{ra}|{dec}|14.2")
}

/// Write `(ra, dec)` positions as DMC rows with identifiers `1..=n`.
pub fn write_dmc(path: &Path, positions: &[(f64, f64)]) -> io::Result<()> {
    let text: String = positions
        .iter()
        .enumerate()
        .map(|(i, &(ra, dec))| dmc_line(i as u64 + 1, ra, dec) + "\n")
        .collect();
    fs::write(path, text)
}

/// Write `(ra, dec)` positions as a comma-delimited reference catalog.
pub fn write_reference(path: &Path, positions: &[(f64, f64)]) -> io::Result<()> {
    let text: String = positions
        .iter()
        .map(|&(ra, dec)| format!("{ra},{dec}\n"))
        .collect();
    fs::write(path, text)
}

/// A temporary directory removed when dropped, with a path helper.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("epicwash_test").tempdir()?,
        })
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Names of all files currently in the directory, sorted.
    pub fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(self.dir.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_reproducible() {
        let a = SyntheticCatalog::new(7).sources(50).duplicate_fraction(0.3).max_offset_arcsec(1.0).generate();
        let b = SyntheticCatalog::new(7).sources(50).duplicate_fraction(0.3).max_offset_arcsec(1.0).generate();
        assert_eq!(a, b);
        assert!(a.len() > 50);
    }

    #[test]
    fn test_positions_in_range() {
        for region in [SkyRegion::FullSky, SkyRegion::NorthPole, SkyRegion::SouthPole, SkyRegion::RaSeam] {
            let positions = SyntheticCatalog::new(1)
                .sources(200)
                .region(region)
                .duplicate_fraction(0.5)
                .max_offset_arcsec(5.0)
                .generate();
            for (ra, dec) in positions {
                assert!((0.0..360.0).contains(&ra), "{region:?} ra {ra}");
                assert!((-90.0..=90.0).contains(&dec), "{region:?} dec {dec}");
            }
        }
    }

    #[test]
    fn test_wrap_ra() {
        assert_eq!(wrap_ra(-10.0), 350.0);
        assert_eq!(wrap_ra(370.0), 10.0);
        assert_eq!(wrap_ra(0.0), 0.0);
        assert!(wrap_ra(-1e-20) < 360.0);
    }

    #[test]
    fn test_dmc_line_round_trips_positions() {
        let line = dmc_line(5, 123.456789012345, -0.000001);
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields.len(), DMC_FIELDS);
        assert_eq!(fields[9].parse::<f64>().unwrap(), 123.456789012345);
        assert_eq!(fields[10].parse::<f64>().unwrap(), -0.000001);
    }

    #[test]
    fn test_scratch_lists_files() {
        let scratch = Scratch::new().unwrap();
        write_dmc(&scratch.join("b.dmc"), &[(1.0, 2.0)]).unwrap();
        write_reference(&scratch.join("a.csv"), &[(1.0, 2.0)]).unwrap();
        assert_eq!(scratch.file_names().unwrap(), vec!["a.csv", "b.dmc"]);
    }
}
