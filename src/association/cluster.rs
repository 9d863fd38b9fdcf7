//! Cluster formation
//!
//! Partitions the track set into independent association problems. Tracks
//! that share a gated measurement (directly or transitively) must be resolved
//! jointly; everything else factorizes.

use alloc::vec;
use alloc::vec::Vec;

use super::gate::ValidationMatrix;

// ============================================================================
// Cluster
// ============================================================================

/// A set of track indices and the measurement indices they jointly compete
/// for.
///
/// Tracks with no gated measurement form singleton clusters with an empty
/// measurement list. Clusters are recomputed every cycle and together
/// partition the track set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Track indices in this cluster (ascending)
    pub tracks: Vec<usize>,
    /// Measurement indices gated by any member track (ascending, deduplicated)
    pub measurements: Vec<usize>,
}

// ============================================================================
// Union-Find
// ============================================================================

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

// ============================================================================
// Cluster Formation
// ============================================================================

/// Forms association clusters from the validation matrix.
///
/// With `joint_association` the validation matrix is treated as a bipartite
/// graph: any two tracks gating the same measurement are merged transitively
/// into one cluster. Without it (plain PDAF mode) every track becomes a
/// singleton cluster carrying its own gated measurements and no joint
/// resolution happens; a measurement may then appear in several clusters.
pub fn form_clusters(validation: &ValidationMatrix, joint_association: bool) -> Vec<Cluster> {
    let n_tracks = validation.n_tracks();
    let n_meas = validation.n_measurements();

    if !joint_association {
        return (0..n_tracks)
            .map(|i| Cluster {
                tracks: vec![i],
                measurements: validation.gated_measurements(i).collect(),
            })
            .collect();
    }

    let mut sets = DisjointSets::new(n_tracks);
    for j in 0..n_meas {
        let mut first: Option<usize> = None;
        for i in 0..n_tracks {
            if validation.is_gated(i, j) {
                match first {
                    None => first = Some(i),
                    Some(f) => sets.union(f, i),
                }
            }
        }
    }

    // Group tracks by root, preserving ascending order
    let mut root_to_cluster: Vec<Option<usize>> = vec![None; n_tracks];
    let mut clusters: Vec<Cluster> = Vec::new();

    for i in 0..n_tracks {
        let root = sets.find(i);
        let idx = match root_to_cluster[root] {
            Some(idx) => idx,
            None => {
                clusters.push(Cluster {
                    tracks: Vec::new(),
                    measurements: Vec::new(),
                });
                root_to_cluster[root] = Some(clusters.len() - 1);
                clusters.len() - 1
            }
        };
        clusters[idx].tracks.push(i);
        for j in validation.gated_measurements(i) {
            if !clusters[idx].measurements.contains(&j) {
                clusters[idx].measurements.push(j);
            }
        }
    }

    for cluster in &mut clusters {
        cluster.measurements.sort_unstable();
    }

    clusters
}

// ============================================================================
// Tests
// ============================================================================
