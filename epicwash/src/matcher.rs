//! Positional pair matching.
//!
//! Two modes share one spatial index implementation:
//!
//! - **Self-match** finds every unordered pair of records in one catalog that
//!   lie within the tolerance of each other. Each pair is emitted once, lower
//!   index first, and the output is sorted.
//! - **Cross-match** pairs each record of catalog A with its nearest record of
//!   catalog B within the tolerance. Ties on distance go to the lowest B index.
//!
//! Per-record queries are independent, so they run on the rayon pool; the
//! results are collected in record order, which keeps output deterministic.

use log::debug;
use rayon::prelude::*;

use crate::index::SpatialIndex;
use crate::sky::{haversine_to_angle, SkyPosition, Tolerance};

/// Two records of one catalog within tolerance of each other, `first < second`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
    pub first: usize,
    pub second: usize,
    /// Separation in radians
    pub separation: f64,
}

/// A record of catalog A and its nearest counterpart in catalog B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossMatch {
    pub a: usize,
    pub b: usize,
    /// Separation in radians
    pub separation: f64,
}

/// Find all pairs within `tolerance` among the positions held by `index`.
pub fn self_match(index: &SpatialIndex, tolerance: &Tolerance) -> Vec<MatchPair> {
    let pairs: Vec<MatchPair> = index
        .positions()
        .par_iter()
        .enumerate()
        .map(|(i, position)| {
            let mut found: Vec<MatchPair> = index
                .query_with_haversine(position, tolerance)
                .into_iter()
                .filter(|&(j, _)| j > i)
                .map(|(j, h)| MatchPair {
                    first: i,
                    second: j,
                    separation: haversine_to_angle(h),
                })
                .collect();
            found.sort_unstable_by_key(|pair| pair.second);
            found
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    debug!(
        "Self-match over {} positions found {} pairs",
        index.len(),
        pairs.len()
    );
    pairs
}

/// For each position in `a`, find the nearest position in `b_index` within `tolerance`.
///
/// Positions without a counterpart produce no entry. Output is ordered by A index.
pub fn cross_match(a: &[SkyPosition], b_index: &SpatialIndex, tolerance: &Tolerance) -> Vec<CrossMatch> {
    let matches: Vec<CrossMatch> = a
        .par_iter()
        .enumerate()
        .map(|(i, position)| {
            nearest(b_index, position, tolerance).map(|(j, h)| CrossMatch {
                a: i,
                b: j,
                separation: haversine_to_angle(h),
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    debug!(
        "Cross-match of {} positions against {} found {} matches",
        a.len(),
        b_index.len(),
        matches.len()
    );
    matches
}

/// Nearest indexed position within tolerance, as `(index, haversine term)`.
fn nearest(index: &SpatialIndex, position: &SkyPosition, tolerance: &Tolerance) -> Option<(usize, f64)> {
    index
        .query_with_haversine(position, tolerance)
        .into_iter()
        .min_by(|(ia, ha), (ib, hb)| ha.total_cmp(hb).then(ia.cmp(ib)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pos(ra: f64, dec: f64) -> SkyPosition {
        SkyPosition::new(ra, dec).unwrap()
    }

    fn arcsec(a: f64) -> f64 {
        a / 3600.0
    }

    fn pair_indices(pairs: &[MatchPair]) -> Vec<(usize, usize)> {
        pairs.iter().map(|p| (p.first, p.second)).collect()
    }

    #[test]
    fn test_self_match_emits_each_pair_once() {
        let tol = Tolerance::from_arcsec(1.0).unwrap();
        let positions = vec![
            pos(10.0, 10.0),
            pos(80.0, -20.0),
            pos(10.0, 10.0 + arcsec(0.5)),
            pos(10.0, 10.0 + arcsec(0.9)),
        ];
        let index = SpatialIndex::build(positions, &tol);
        let pairs = self_match(&index, &tol);
        assert_eq!(pair_indices(&pairs), vec![(0, 2), (0, 3), (2, 3)]);
        assert_relative_eq!(pairs[0].separation.to_degrees() * 3600.0, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_self_match_empty_and_single() {
        let tol = Tolerance::default();
        let empty = SpatialIndex::build(Vec::new(), &tol);
        assert!(self_match(&empty, &tol).is_empty());
        let single = SpatialIndex::build(vec![pos(1.0, 1.0)], &tol);
        assert!(self_match(&single, &tol).is_empty());
    }

    #[test]
    fn test_self_match_coincident_positions() {
        let tol = Tolerance::from_arcsec(0.0).unwrap();
        let index = SpatialIndex::build(vec![pos(5.0, 5.0), pos(5.0, 5.0), pos(5.0, 5.1)], &tol);
        assert_eq!(pair_indices(&self_match(&index, &tol)), vec![(0, 1)]);
    }

    #[test]
    fn test_cross_match_picks_nearest() {
        let tol = Tolerance::from_arcsec(2.0).unwrap();
        let b = vec![
            pos(30.0, 0.0 + arcsec(1.5)),
            pos(30.0, 0.0 + arcsec(0.5)),
            pos(90.0, 0.0),
        ];
        let b_index = SpatialIndex::build(b, &tol);
        let a = vec![pos(30.0, 0.0), pos(200.0, 50.0)];
        let matches = cross_match(&a, &b_index, &tol);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].a, matches[0].b), (0, 1));
    }

    #[test]
    fn test_cross_match_tie_goes_to_lowest_index() {
        let tol = Tolerance::from_arcsec(2.0).unwrap();
        let b = vec![
            pos(30.0, 0.0),
            pos(30.0, arcsec(1.0)),
            pos(30.0, -arcsec(1.0)),
        ];
        let b_index = SpatialIndex::build(b, &tol);
        let matches = cross_match(&[pos(150.0, 0.0), pos(30.0, 0.0)], &b_index, &tol);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].a, matches[0].b), (1, 0));

        // Equidistant below and above the target
        let b = vec![pos(30.0, -arcsec(1.0)), pos(30.0, arcsec(1.0))];
        let b_index = SpatialIndex::build(b, &tol);
        let matches = cross_match(&[pos(30.0, 0.0)], &b_index, &tol);
        assert_eq!(matches[0].b, 0);
    }

    #[test]
    fn test_cross_match_against_empty() {
        let tol = Tolerance::default();
        let b_index = SpatialIndex::build(Vec::new(), &tol);
        assert!(cross_match(&[pos(1.0, 1.0)], &b_index, &tol).is_empty());
    }
}
