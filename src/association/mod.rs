//! Joint probabilistic data association engine
//!
//! Per cycle: gate measurements against every track's predicted measurement
//! distribution ([`gate`]), partition tracks into independent association
//! problems ([`cluster`]), and marginalize per-track association
//! probabilities over the feasible joint events of each cluster
//! ([`hypothesis`]).

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec;
use alloc::vec::Vec;

use crate::{JipdaError, Result};

pub mod cluster;
pub mod gate;
pub mod hypothesis;

pub use cluster::{form_clusters, Cluster};
pub use gate::{gate_measurements, GatingResult, ValidationMatrix};
pub use hypothesis::{ExactEnumeration, HypothesisResolver, LikelihoodTable};

// ============================================================================
// Association Weights
// ============================================================================

/// Per-track association probability rows for one cycle.
///
/// Row i is `[miss, m_0, …, m_{M-1}]` over the global measurement indices,
/// summing to 1, with exactly 0 for every pair outside track i's gate.
/// Consumed immediately by the weighted update and exposed read-only for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationWeights<T> {
    rows: Vec<Vec<T>>,
}

impl<T: RealField + Copy> AssociationWeights<T> {
    /// Creates weights where every track is certainly undetected.
    ///
    /// Used as the starting point before cluster results are merged in, and
    /// as the surviving value for clusters whose resolution was skipped.
    pub fn all_miss(n_tracks: usize, n_measurements: usize) -> Self {
        let mut rows = Vec::with_capacity(n_tracks);
        for _ in 0..n_tracks {
            let mut row = vec![T::zero(); n_measurements + 1];
            row[0] = T::one();
            rows.push(row);
        }
        Self { rows }
    }

    /// Number of track rows.
    #[inline]
    pub fn n_tracks(&self) -> usize {
        self.rows.len()
    }

    /// Returns the weight row of one track: `[miss, m_0, …]`.
    #[inline]
    pub fn track(&self, i: usize) -> &[T] {
        &self.rows[i]
    }

    /// Overwrites the weight row of one track.
    #[inline]
    pub(crate) fn set_track(&mut self, i: usize, row: Vec<T>) {
        self.rows[i] = row;
    }
}

// ============================================================================
// Cluster Resolution
// ============================================================================

/// Resolves one cluster into global-index weight rows.
///
/// Builds the cluster-local likelihood table (miss column λ_fa·(1 - PD·PG),
/// measurement columns PD·PG·likelihood for gated pairs), hands it to the
/// resolver, and scatters the local marginals back to global measurement
/// indices.
///
/// # Errors
/// [`JipdaError::AssociationInconsistency`] if the cluster references a
/// measurement index outside the current scan. The caller is expected to
/// skip the weighted update for this cluster and continue the cycle.
pub fn resolve_cluster<T, R>(
    cluster: &Cluster,
    gating: &GatingResult<T>,
    n_measurements: usize,
    prob_detection: T,
    prob_gating: T,
    resolver: &R,
) -> Result<Vec<(usize, Vec<T>)>>
where
    T: RealField + Float + Copy,
    R: HypothesisResolver<T>,
{
    for &j in &cluster.measurements {
        if j >= n_measurements {
            return Err(JipdaError::AssociationInconsistency { measurement: j });
        }
    }

    let pd_pg = prob_detection * prob_gating;
    let miss_likelihood = gating.clutter_intensity * (T::one() - pd_pg);

    let mut table = LikelihoodTable::new(cluster.tracks.len(), cluster.measurements.len());
    for (row, &track) in cluster.tracks.iter().enumerate() {
        table.set(row, 0, miss_likelihood);
        for (col, &meas) in cluster.measurements.iter().enumerate() {
            if gating.validation.is_gated(track, meas) {
                table.set(row, col + 1, pd_pg * gating.likelihoods[track][meas]);
            }
        }
    }

    let marginals = resolver.marginals(&table)?;

    let mut result = Vec::with_capacity(cluster.tracks.len());
    for (row, &track) in cluster.tracks.iter().enumerate() {
        let mut global = vec![T::zero(); n_measurements + 1];
        global[0] = marginals[row][0];
        for (col, &meas) in cluster.measurements.iter().enumerate() {
            global[meas + 1] = marginals[row][col + 1];
        }
        result.push((track, global));
    }
    Ok(result)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gating_for(
        n_tracks: usize,
        n_meas: usize,
        entries: &[(usize, usize, f64)],
    ) -> GatingResult<f64> {
        let mut validation = ValidationMatrix::new(n_tracks, n_meas);
        let mut likelihoods = vec![vec![0.0; n_meas]; n_tracks];
        for &(i, j, g) in entries {
            validation.set(i, j);
            likelihoods[i][j] = g;
        }
        GatingResult {
            validation,
            likelihoods,
            total_gate_volume: 1.0,
            clutter_intensity: 1.0,
        }
    }

    #[test]
    fn test_resolve_certain_association() {
        // One track, one gated measurement with overwhelming likelihood
        let gating = gating_for(1, 1, &[(0, 0, 1e6)]);
        let cluster = Cluster {
            tracks: vec![0],
            measurements: vec![0],
        };

        let rows = resolve_cluster(&cluster, &gating, 1, 0.9, 0.99, &ExactEnumeration).unwrap();
        assert_eq!(rows.len(), 1);
        let (track, weights) = &rows[0];
        assert_eq!(*track, 0);
        assert!(weights[1] > 0.999);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_scatters_to_global_indices() {
        // Cluster covers only measurement 2 of a 4-measurement scan
        let gating = gating_for(1, 4, &[(0, 2, 5.0)]);
        let cluster = Cluster {
            tracks: vec![0],
            measurements: vec![2],
        };

        let rows = resolve_cluster(&cluster, &gating, 4, 0.9, 0.99, &ExactEnumeration).unwrap();
        let (_, weights) = &rows[0];
        assert_eq!(weights.len(), 5);
        assert_eq!(weights[1], 0.0);
        assert_eq!(weights[3], 0.0);
        assert!(weights[2 + 1] > 0.0);
    }

    #[test]
    fn test_resolve_rejects_unknown_measurement() {
        let gating = gating_for(1, 1, &[(0, 0, 5.0)]);
        let cluster = Cluster {
            tracks: vec![0],
            measurements: vec![7],
        };

        let err =
            resolve_cluster(&cluster, &gating, 1, 0.9, 0.99, &ExactEnumeration).unwrap_err();
        assert_eq!(err, JipdaError::AssociationInconsistency { measurement: 7 });
    }

    #[test]
    fn test_all_miss_rows() {
        let weights: AssociationWeights<f64> = AssociationWeights::all_miss(2, 3);
        assert_eq!(weights.n_tracks(), 2);
        assert_eq!(weights.track(0), &[1.0, 0.0, 0.0, 0.0]);
    }
}
