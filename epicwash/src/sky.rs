//! Sky positions and angular separations.
//!
//! Positions are equatorial (right ascension, declination) in degrees, as
//! they appear in catalog files. Separations are great-circle distances
//! computed with the haversine formula, which stays well conditioned for
//! the sub-arcsecond tolerances used when washing catalogs.
//!
//! Tolerance checks compare the haversine term `sin²(d/2)` directly rather
//! than the recovered angle. The term is monotonic in `d` on `[0, π]`, so the
//! comparison is equivalent, and a pair placed exactly at the tolerance
//! compares equal instead of drifting by an ulp through `asin`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WashError};

/// Number of arcseconds in one degree.
pub const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// Default cross-matching distance in arcseconds.
pub const DEFAULT_MATCHING_RADIUS_ARCSEC: f64 = 0.1;

/// An equatorial sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    /// Right ascension in degrees, `[0, 360)`
    pub ra: f64,
    /// Declination in degrees, `[-90, 90]`
    pub dec: f64,
}

impl SkyPosition {
    /// Create a position, rejecting non-finite or out of range coordinates.
    ///
    /// A right ascension of exactly 360 is folded onto 0.
    pub fn new(ra: f64, dec: f64) -> Result<Self> {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(WashError::InvalidPosition { ra, dec });
        }
        if !(0.0..=360.0).contains(&ra) || !(-90.0..=90.0).contains(&dec) {
            return Err(WashError::InvalidPosition { ra, dec });
        }
        let ra = if ra == 360.0 { 0.0 } else { ra };
        Ok(Self { ra, dec })
    }

    /// Right ascension in radians
    pub fn ra_rad(&self) -> f64 {
        self.ra.to_radians()
    }

    /// Declination in radians
    pub fn dec_rad(&self) -> f64 {
        self.dec.to_radians()
    }

    /// Great-circle separation to another position, in radians.
    pub fn separation(&self, other: &SkyPosition) -> f64 {
        haversine_to_angle(haversine_term(self, other))
    }

    /// Great-circle separation to another position, in arcseconds.
    pub fn separation_arcsec(&self, other: &SkyPosition) -> f64 {
        self.separation(other).to_degrees() * ARCSEC_PER_DEGREE
    }
}

/// The haversine term `sin²(d/2)` for the great-circle distance `d` between two positions.
///
/// Ranges over `[0, 1]`; zero for coincident positions, one for antipodes.
pub fn haversine_term(a: &SkyPosition, b: &SkyPosition) -> f64 {
    let dec1 = a.dec_rad();
    let dec2 = b.dec_rad();
    let half_ddec = ((b.dec - a.dec).to_radians() * 0.5).sin();
    let half_dra = ((b.ra - a.ra).to_radians() * 0.5).sin();
    let h = half_ddec * half_ddec + dec1.cos() * dec2.cos() * half_dra * half_dra;
    h.clamp(0.0, 1.0)
}

/// Invert the haversine term back into an angle in radians.
pub fn haversine_to_angle(h: f64) -> f64 {
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

/// An angular matching tolerance.
///
/// Stored in arcseconds, the unit catalog users think in, and carried as an
/// immutable parameter through every matching stage of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    arcsec: f64,
    radians: f64,
    haversine: f64,
}

impl Tolerance {
    /// Build a tolerance from arcseconds.
    ///
    /// Zero is allowed (exact positional duplicates only); negative or
    /// non-finite values are rejected.
    pub fn from_arcsec(arcsec: f64) -> Result<Self> {
        if !arcsec.is_finite() || arcsec < 0.0 {
            return Err(WashError::InvalidConfig(format!(
                "matching radius must be a finite, non-negative number of arcseconds, got {arcsec}"
            )));
        }
        let radians = (arcsec / ARCSEC_PER_DEGREE).to_radians();
        if radians > std::f64::consts::PI {
            return Err(WashError::InvalidConfig(format!(
                "matching radius of {arcsec} arcsec exceeds 180 degrees"
            )));
        }
        let half = (radians * 0.5).sin();
        Ok(Self {
            arcsec,
            radians,
            haversine: half * half,
        })
    }

    /// Tolerance in arcseconds
    pub fn arcsec(&self) -> f64 {
        self.arcsec
    }

    /// Tolerance in degrees
    pub fn degrees(&self) -> f64 {
        self.arcsec / ARCSEC_PER_DEGREE
    }

    /// Tolerance in radians
    pub fn radians(&self) -> f64 {
        self.radians
    }

    /// The haversine term of the tolerance, for direct comparison with [`haversine_term`].
    pub fn haversine(&self) -> f64 {
        self.haversine
    }

    /// Whether two positions lie within the tolerance of each other (inclusive).
    pub fn contains(&self, a: &SkyPosition, b: &SkyPosition) -> bool {
        haversine_term(a, b) <= self.haversine
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        let radians = (DEFAULT_MATCHING_RADIUS_ARCSEC / ARCSEC_PER_DEGREE).to_radians();
        let half = (radians * 0.5).sin();
        Self {
            arcsec: DEFAULT_MATCHING_RADIUS_ARCSEC,
            radians,
            haversine: half * half,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pos(ra: f64, dec: f64) -> SkyPosition {
        SkyPosition::new(ra, dec).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_positions() {
        assert!(SkyPosition::new(-0.1, 0.0).is_err());
        assert!(SkyPosition::new(360.1, 0.0).is_err());
        assert!(SkyPosition::new(10.0, 90.5).is_err());
        assert!(SkyPosition::new(f64::NAN, 0.0).is_err());
        assert!(SkyPosition::new(10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_ra_360_folds_to_zero() {
        assert_eq!(pos(360.0, 5.0).ra, 0.0);
    }

    #[test]
    fn test_separation_along_meridian() {
        let a = pos(10.0, 20.0);
        let b = pos(10.0, 21.0);
        assert_relative_eq!(a.separation(&b).to_degrees(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separation_across_wraparound() {
        let a = pos(359.9, 0.0);
        let b = pos(0.1, 0.0);
        assert_relative_eq!(a.separation(&b).to_degrees(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_separation_at_pole_ignores_ra() {
        let a = pos(0.0, 90.0);
        let b = pos(180.0, 90.0);
        assert!(a.separation(&b) < 1e-12);
    }

    #[test]
    fn test_separation_shrinks_with_declination() {
        // One degree of RA spans cos(dec) degrees on the sky
        let a = pos(100.0, 60.0);
        let b = pos(100.001, 60.0);
        let expected = 0.001 * 60f64.to_radians().cos() * ARCSEC_PER_DEGREE;
        assert_relative_eq!(a.separation_arcsec(&b), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_tolerance_conversions() {
        let tol = Tolerance::from_arcsec(36.0).unwrap();
        assert_relative_eq!(tol.degrees(), 0.01);
        assert_relative_eq!(tol.radians(), 0.01f64.to_radians());
    }

    #[test]
    fn test_tolerance_rejects_invalid() {
        assert!(Tolerance::from_arcsec(-1.0).is_err());
        assert!(Tolerance::from_arcsec(f64::NAN).is_err());
        assert!(Tolerance::from_arcsec(180.0 * 3600.0 + 1.0).is_err());
        assert!(Tolerance::from_arcsec(0.0).is_ok());
    }

    #[test]
    fn test_default_tolerance_matches_cli_default() {
        let tol = Tolerance::default();
        assert_eq!(tol, Tolerance::from_arcsec(0.1).unwrap());
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let tol = Tolerance::from_arcsec(0.5).unwrap();
        let a = pos(0.0, 0.0);
        let on_boundary = pos(0.0, 0.5 / ARCSEC_PER_DEGREE);
        let beyond = pos(0.0, 0.5 / ARCSEC_PER_DEGREE + 1e-9);
        assert!(tol.contains(&a, &on_boundary));
        assert!(!tol.contains(&a, &beyond));
    }
}
