//! Joint hypothesis resolution
//!
//! Marginalizes per-track association probabilities over all feasible joint
//! assignment events of one cluster. The resolver is an abstract collaborator
//! so that exact enumeration can be swapped for sampling or approximate
//! schemes on large clusters without touching the engine.

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec;
use alloc::vec::Vec;

use crate::Result;

// ============================================================================
// Likelihood Table
// ============================================================================

/// Local likelihood table of one cluster.
///
/// Rows are cluster tracks; column 0 is the "no detection" event, columns
/// 1.. are the cluster's measurements. An entry of exactly 0 marks an
/// ungated pair that no feasible event may use.
#[derive(Debug, Clone)]
pub struct LikelihoodTable<T> {
    n_tracks: usize,
    n_columns: usize,
    data: Vec<T>,
}

impl<T: RealField + Copy> LikelihoodTable<T> {
    /// Creates a zeroed table for `n_tracks` tracks and `n_measurements`
    /// measurements (plus the implicit miss column).
    pub fn new(n_tracks: usize, n_measurements: usize) -> Self {
        Self {
            n_tracks,
            n_columns: n_measurements + 1,
            data: vec![T::zero(); n_tracks * (n_measurements + 1)],
        }
    }

    /// Number of track rows.
    #[inline]
    pub fn n_tracks(&self) -> usize {
        self.n_tracks
    }

    /// Number of columns including the miss column.
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Sets the entry for track row `i`, column `c` (0 = miss).
    #[inline]
    pub fn set(&mut self, i: usize, c: usize, value: T) {
        self.data[i * self.n_columns + c] = value;
    }

    /// Returns the entry for track row `i`, column `c`.
    #[inline]
    pub fn get(&self, i: usize, c: usize) -> T {
        self.data[i * self.n_columns + c]
    }

    /// Returns one track row.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.n_columns..(i + 1) * self.n_columns]
    }
}

// ============================================================================
// Resolver Contract
// ============================================================================

/// Marginalizes a cluster's likelihood table into per-track association
/// probabilities.
///
/// Implementations must return one row per track row of the table, each row
/// `[miss, m_0, …]` with non-negative entries summing to 1 and exactly 0
/// wherever the table entry is 0. A feasible joint event assigns each
/// measurement to at most one track and each track to at most one measurement
/// or none.
pub trait HypothesisResolver<T: RealField> {
    /// Computes the marginal association probabilities.
    fn marginals(&self, table: &LikelihoodTable<T>) -> Result<Vec<Vec<T>>>;
}

// ============================================================================
// Exact Enumeration
// ============================================================================

/// Exact resolver: enumerates every feasible joint event.
///
/// Event weight is the product of one table entry per track; marginals are
/// the normalized per-cell sums. Exponential in the cluster size, which is
/// fine for the small clusters gating produces in practice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactEnumeration;

impl ExactEnumeration {
    /// Creates the exact resolver.
    pub fn new() -> Self {
        Self
    }
}

impl<T: RealField + Float + Copy> HypothesisResolver<T> for ExactEnumeration {
    fn marginals(&self, table: &LikelihoodTable<T>) -> Result<Vec<Vec<T>>> {
        let n_tracks = table.n_tracks();
        let n_columns = table.n_columns();

        if n_tracks == 0 {
            return Ok(Vec::new());
        }

        // Scale each row by its maximum: every event picks exactly one entry
        // per row, so the total scales by the product of the factors and the
        // normalized marginals are unchanged. Keeps tiny densities from
        // underflowing the event products.
        let mut scaled = LikelihoodTable::new(n_tracks, n_columns - 1);
        for i in 0..n_tracks {
            let mut row_max = T::zero();
            for c in 0..n_columns {
                let v = table.get(i, c);
                if v > row_max {
                    row_max = v;
                }
            }
            let factor = if row_max > T::zero() {
                T::one() / row_max
            } else {
                T::one()
            };
            for c in 0..n_columns {
                scaled.set(i, c, table.get(i, c) * factor);
            }
        }

        let mut accum = vec![vec![T::zero(); n_columns]; n_tracks];
        let mut total = T::zero();
        let mut used = vec![false; n_columns];
        let mut choices = vec![0usize; n_tracks];

        enumerate(
            &scaled,
            0,
            T::one(),
            &mut used,
            &mut choices,
            &mut accum,
            &mut total,
        );

        let mut marginals = Vec::with_capacity(n_tracks);
        if total <= T::zero() {
            // Every event weight vanished (e.g. unity detection probability
            // with all likelihood mass on contested measurements); fall back
            // to certain miss rather than produce an unnormalized row.
            log::warn!("joint hypothesis enumeration found no feasible mass; forcing miss");
            for _ in 0..n_tracks {
                let mut row = vec![T::zero(); n_columns];
                row[0] = T::one();
                marginals.push(row);
            }
            return Ok(marginals);
        }

        for row in accum {
            marginals.push(row.iter().map(|&w| w / total).collect());
        }
        Ok(marginals)
    }
}

/// Depth-first enumeration over feasible joint events.
fn enumerate<T: RealField + Float + Copy>(
    table: &LikelihoodTable<T>,
    row: usize,
    weight: T,
    used: &mut [bool],
    choices: &mut [usize],
    accum: &mut [Vec<T>],
    total: &mut T,
) {
    if row == table.n_tracks() {
        *total += weight;
        for (i, &c) in choices.iter().enumerate() {
            accum[i][c] += weight;
        }
        return;
    }

    for c in 0..table.n_columns() {
        // The miss column is shareable; measurement columns are not
        if c > 0 && used[c] {
            continue;
        }
        let v = table.get(row, c);
        if v <= T::zero() {
            continue;
        }
        if c > 0 {
            used[c] = true;
        }
        choices[row] = c;
        enumerate(table, row + 1, weight * v, used, choices, accum, total);
        if c > 0 {
            used[c] = false;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[f64]]) -> LikelihoodTable<f64> {
        let n_tracks = rows.len();
        let n_meas = rows[0].len() - 1;
        let mut t = LikelihoodTable::new(n_tracks, n_meas);
        for (i, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                t.set(i, c, v);
            }
        }
        t
    }

    fn assert_rows_normalized(marginals: &[Vec<f64>]) {
        for row in marginals {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row sums to {}", sum);
            assert!(row.iter().all(|&w| w >= 0.0));
        }
    }

    #[test]
    fn test_single_track_single_measurement() {
        let t = table(&[&[1.0, 3.0]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        assert!((marginals[0][0] - 0.25).abs() < 1e-12);
        assert!((marginals[0][1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_ungated_entries_stay_zero() {
        let t = table(&[&[1.0, 2.0, 0.0], &[1.0, 0.0, 2.0]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        assert_eq!(marginals[0][2], 0.0);
        assert_eq!(marginals[1][1], 0.0);
    }

    #[test]
    fn test_contested_measurement_excludes_double_assignment() {
        // Two tracks, one shared measurement. Feasible events: (miss, miss),
        // (take, miss), (miss, take); never both taking it.
        let t = table(&[&[1.0, 4.0], &[1.0, 4.0]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        // Events: 1*1, 4*1, 1*4 -> total 9; each track takes with 4/9
        assert!((marginals[0][1] - 4.0 / 9.0).abs() < 1e-12);
        assert!((marginals[1][1] - 4.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_asymmetric_likelihoods_split_proportionally() {
        let t = table(&[&[1.0, 8.0], &[1.0, 2.0]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        // Events: 1*1, 8*1, 1*2 -> total 11
        assert!((marginals[0][1] - 8.0 / 11.0).abs() < 1e-12);
        assert!((marginals[1][1] - 2.0 / 11.0).abs() < 1e-12);
        assert!(marginals[0][1] > marginals[1][1]);
    }

    #[test]
    fn test_tiny_likelihoods_survive_scaling() {
        let t = table(&[&[1e-300, 3e-300], &[2e-300, 1e-300]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        assert!(marginals[0][1] > marginals[0][0]);
    }

    #[test]
    fn test_infeasible_table_forces_miss() {
        // No miss mass and a single shared measurement: the only joint events
        // would double-assign, so nothing is feasible except... nothing.
        let t = table(&[&[0.0, 1.0], &[0.0, 1.0]]);
        let marginals = ExactEnumeration.marginals(&t).unwrap();

        assert_rows_normalized(&marginals);
        assert_eq!(marginals[0][0], 1.0);
        assert_eq!(marginals[1][0], 1.0);
    }

    #[test]
    fn test_empty_cluster() {
        let t: LikelihoodTable<f64> = LikelihoodTable::new(0, 0);
        let marginals = ExactEnumeration.marginals(&t).unwrap();
        assert!(marginals.is_empty());
    }
}
