//! Statistical gating
//!
//! Builds the validation matrix for one cycle: which measurements fall
//! inside which track's gate, the Gaussian likelihood of each admitted pair,
//! and the combined false-alarm/new-target intensity estimated from the gate
//! volumes.

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec;
use alloc::vec::Vec;

use crate::filters::Prediction;
use crate::types::gaussian::{gaussian_likelihood, mahalanobis_squared};
use crate::types::spaces::Measurement;
use crate::Result;

// ============================================================================
// Validation Matrix
// ============================================================================

/// Boolean tracks × measurements matrix; entry (i, j) is set iff measurement
/// j falls inside track i's statistical gate.
///
/// Recomputed every cycle from the current predictions; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMatrix {
    n_tracks: usize,
    n_measurements: usize,
    data: Vec<bool>,
}

impl ValidationMatrix {
    /// Creates an all-false matrix.
    pub fn new(n_tracks: usize, n_measurements: usize) -> Self {
        Self {
            n_tracks,
            n_measurements,
            data: vec![false; n_tracks * n_measurements],
        }
    }

    /// Number of track rows.
    #[inline]
    pub fn n_tracks(&self) -> usize {
        self.n_tracks
    }

    /// Number of measurement columns.
    #[inline]
    pub fn n_measurements(&self) -> usize {
        self.n_measurements
    }

    /// Marks measurement `j` as validated for track `i`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize) {
        self.data[i * self.n_measurements + j] = true;
    }

    /// Returns whether measurement `j` is inside track `i`'s gate.
    #[inline]
    pub fn is_gated(&self, i: usize, j: usize) -> bool {
        self.data[i * self.n_measurements + j]
    }

    /// Iterates over the measurement indices gated by track `i`.
    pub fn gated_measurements(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let row = &self.data[i * self.n_measurements..(i + 1) * self.n_measurements];
        row.iter()
            .enumerate()
            .filter_map(|(j, &v)| if v { Some(j) } else { None })
    }

    /// Returns whether any track gates measurement `j`.
    pub fn measurement_is_gated(&self, j: usize) -> bool {
        (0..self.n_tracks).any(|i| self.is_gated(i, j))
    }

    /// Total number of set entries.
    pub fn validated_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

// ============================================================================
// Gating
// ============================================================================

/// The per-cycle gating product consumed by clustering and association
/// weighting.
#[derive(Debug, Clone)]
pub struct GatingResult<T> {
    /// The validation matrix
    pub validation: ValidationMatrix,
    /// Gaussian likelihood of each gated pair, 0 where ungated
    /// (shape: tracks × measurements)
    pub likelihoods: Vec<Vec<T>>,
    /// Total gate volume summed over tracks
    pub total_gate_volume: T,
    /// Combined false-alarm/new-target intensity: validated count over total
    /// gate volume, defaulted to 1 when the estimate degenerates to zero
    pub clutter_intensity: T,
}

/// Builds the validation matrix for the current measurement set.
///
/// A measurement is admitted to a track's gate when its squared Mahalanobis
/// distance against the track's innovation covariance is below
/// `gate_threshold` (a χ² quantile for the measurement dimension). The
/// hyper-ellipsoid volumes of all gates are accumulated so that the
/// false-alarm intensity can be estimated from the data itself.
///
/// # Errors
/// [`crate::JipdaError::NumericalInstability`] if a track's innovation
/// covariance is not positive definite.
pub fn gate_measurements<T, const N: usize, const M: usize>(
    predictions: &[Prediction<T, N, M>],
    measurements: &[Measurement<T, M>],
    gate_threshold: T,
) -> Result<GatingResult<T>>
where
    T: RealField + Float + Copy,
{
    let n_tracks = predictions.len();
    let n_meas = measurements.len();

    let mut validation = ValidationMatrix::new(n_tracks, n_meas);
    let mut likelihoods = vec![vec![T::zero(); n_meas]; n_tracks];
    let mut total_volume = T::zero();

    for (i, pred) in predictions.iter().enumerate() {
        let s = pred.innovation_cov.as_innovation_cov();
        for (j, z) in measurements.iter().enumerate() {
            let residual = *z - pred.meas_mean;
            let d_sq = mahalanobis_squared(&residual, &s)?;
            if d_sq < gate_threshold {
                validation.set(i, j);
                likelihoods[i][j] = gaussian_likelihood(&residual, &s)?;
            }
        }

        // Gate volume: c_M * γ^{M/2} * sqrt(det S)
        if let Some(det) = pred.innovation_cov.determinant_cholesky() {
            let half_dim = T::from_usize(M).unwrap() / T::from_f64(2.0).unwrap();
            total_volume += unit_ball_volume::<T>(M)
                * Float::powf(gate_threshold, half_dim)
                * Float::sqrt(det);
        }
    }

    let validated = validation.validated_count();
    let clutter_intensity = if validated == 0 || total_volume <= T::zero() {
        // A degenerate estimate would zero out every association weight
        T::one()
    } else {
        T::from_usize(validated).unwrap() / total_volume
    };

    Ok(GatingResult {
        validation,
        likelihoods,
        total_gate_volume: total_volume,
        clutter_intensity,
    })
}

/// Volume of the unit ball in `dim` dimensions, via the two-step recurrence
/// V_n = V_{n-2} · 2π/n.
fn unit_ball_volume<T: RealField + Float + Copy>(dim: usize) -> T {
    let two_pi = T::from_f64(2.0 * core::f64::consts::PI).unwrap();
    match dim {
        0 => T::one(),
        1 => T::from_f64(2.0).unwrap(),
        n => unit_ball_volume::<T>(n - 2) * two_pi / T::from_usize(n).unwrap(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Estimate, EstimatorKind};
    use crate::models::{ConstantVelocity2D, PositionSensor2D};
    use crate::types::spaces::{StateCovariance, StateVector};

    fn prediction_at(x: f64, y: f64) -> Prediction<f64, 4, 2> {
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let sensor = PositionSensor2D::new(1.0_f64);
        let estimate = Estimate::new(
            StateVector::from_array([x, y, 0.0, 0.0]),
            StateCovariance::identity(),
        );
        EstimatorKind::Linear
            .predict(&estimate, &dynamics, &sensor, 1.0)
            .unwrap()
    }

    #[test]
    fn test_unit_ball_volumes() {
        use core::f64::consts::PI;
        assert!((unit_ball_volume::<f64>(2) - PI).abs() < 1e-12);
        assert!((unit_ball_volume::<f64>(3) - 4.0 * PI / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_near_measurement_gated_far_rejected() {
        let predictions = [prediction_at(0.0, 0.0)];
        let measurements = [
            Measurement::from_array([0.5, 0.0]),
            Measurement::from_array([50.0, 50.0]),
        ];

        let result = gate_measurements(&predictions, &measurements, 9.21).unwrap();
        assert!(result.validation.is_gated(0, 0));
        assert!(!result.validation.is_gated(0, 1));
        assert!(result.likelihoods[0][0] > 0.0);
        assert!(result.likelihoods[0][1] == 0.0);
    }

    #[test]
    fn test_clutter_intensity_defaults_to_one() {
        let predictions = [prediction_at(0.0, 0.0)];
        let measurements = [Measurement::from_array([100.0, 100.0])];

        let result = gate_measurements(&predictions, &measurements, 9.21).unwrap();
        assert_eq!(result.validation.validated_count(), 0);
        assert!((result.clutter_intensity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gate_volume_grows_with_uncertainty() {
        let tight = [prediction_at(0.0, 0.0)];

        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let sensor = PositionSensor2D::new(1.0_f64);
        let diffuse_estimate = Estimate::new(
            StateVector::from_array([0.0, 0.0, 0.0, 0.0]),
            StateCovariance::identity().scale(25.0),
        );
        let diffuse = [EstimatorKind::Linear
            .predict(&diffuse_estimate, &dynamics, &sensor, 1.0)
            .unwrap()];

        let measurements: [Measurement<f64, 2>; 0] = [];
        let v_tight = gate_measurements(&tight, &measurements, 9.21)
            .unwrap()
            .total_gate_volume;
        let v_diffuse = gate_measurements(&diffuse, &measurements, 9.21)
            .unwrap()
            .total_gate_volume;

        assert!(v_diffuse > v_tight);
    }

    #[test]
    fn test_empty_inputs() {
        let predictions: [Prediction<f64, 4, 2>; 0] = [];
        let measurements = [Measurement::from_array([1.0, 1.0])];

        let result = gate_measurements(&predictions, &measurements, 9.21).unwrap();
        assert_eq!(result.validation.n_tracks(), 0);
        assert!(!result.validation.measurement_is_gated(0));
    }
}
