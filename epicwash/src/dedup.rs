//! Duplicate resolution within one catalog.
//!
//! Matched pairs are joined into groups by transitive closure: if A matches
//! B and B matches C, all three form one group even when A and C are farther
//! apart than the tolerance. Chained detections of an extended or moving
//! source collapse this way. Each group keeps its lowest-index record, so the
//! survivor does not depend on the order pairs were found in.

use log::{debug, info};

use crate::catalog::Catalog;
use crate::index::SpatialIndex;
use crate::matcher::{self_match, MatchPair};
use crate::sky::Tolerance;

/// Disjoint-set forest whose roots are always the smallest member.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }
}

/// A set of records judged to be the same physical source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    /// Member indices in ascending order; the first is the survivor
    pub members: Vec<usize>,
}

impl MatchGroup {
    pub fn representative(&self) -> usize {
        self.members[0]
    }
}

/// Outcome of resolving duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub catalog: Catalog,
    /// Groups with more than one member, ordered by representative
    pub groups: Vec<MatchGroup>,
    pub removed: usize,
}

/// Collapse matched groups to their lowest-index record.
///
/// `pairs` must come from a self-match over `catalog`. Survivors keep their
/// original relative order.
pub fn resolve_duplicates(catalog: Catalog, pairs: &[MatchPair]) -> DedupOutcome {
    let n = catalog.len();
    let mut sets = UnionFind::new(n);
    for pair in pairs {
        sets.union(pair.first, pair.second);
    }

    let mut keep = vec![true; n];
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, flag) in keep.iter_mut().enumerate() {
        let root = sets.find(idx);
        if root != idx {
            *flag = false;
            if members[root].is_empty() {
                members[root].push(root);
            }
            members[root].push(idx);
        }
    }

    let groups: Vec<MatchGroup> = members
        .into_iter()
        .filter(|m| !m.is_empty())
        .map(|members| MatchGroup { members })
        .collect();
    let removed = keep.iter().filter(|&&k| !k).count();

    debug!(
        "Resolved {} pairs into {} duplicate groups, removing {} records",
        pairs.len(),
        groups.len(),
        removed
    );

    DedupOutcome {
        catalog: catalog.retain_flagged(&keep),
        groups,
        removed,
    }
}

/// Self-match a catalog and drop its duplicates.
pub fn remove_duplicates(catalog: Catalog, tolerance: &Tolerance) -> DedupOutcome {
    info!(
        "Removing duplicate entries from {} records within {} arcsec",
        catalog.len(),
        tolerance.arcsec()
    );
    let index = SpatialIndex::build(catalog.positions(), tolerance);
    let pairs = self_match(&index, tolerance);
    resolve_duplicates(catalog, &pairs)
}
