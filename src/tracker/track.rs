//! Confirmed tracks
//!
//! A track owns its belief, its latest prediction, its model-provider pair,
//! and the filtered history consumed by on-demand smoothing. All mutation
//! goes through the pure estimator operations; nothing here reaches outside
//! the record.

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec::Vec;

use crate::filters::{Estimate, EstimatorKind, FilteredStep, Prediction};
use crate::models::{DynamicModel, SensorModel};
use crate::types::labels::Label;
use crate::types::spaces::{Measurement, StateCovariance, StateVector};
use crate::{JipdaError, Result};

// ============================================================================
// Track
// ============================================================================

/// One confirmed track.
///
/// Created on promotion (or manual seeding), mutated in place each cycle by
/// predict then the weighted update, and removed from the active set once its
/// existence probability decays below the death threshold.
#[derive(Debug, Clone)]
pub struct Track<T, Dyn, Sen, const N: usize, const M: usize>
where
    T: RealField,
{
    /// Stable identity of this track
    pub label: Label,
    /// Probability that this track corresponds to a real object
    pub existence: T,
    /// Current posterior belief
    pub estimate: Estimate<T, N>,
    /// Latest prediction; `None` before the first predict of a cycle
    prediction: Option<Prediction<T, N, M>>,
    /// Dynamic model provider for this track
    pub dynamics: Dyn,
    /// Sensor model provider for this track
    pub sensor: Sen,
    /// Filtered history for on-demand smoothing
    history: Vec<FilteredStep<T, N>>,
}

impl<T, Dyn, Sen, const N: usize, const M: usize> Track<T, Dyn, Sen, N, M>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N>,
    Sen: SensorModel<T, N, M>,
{
    /// Creates a new track seeded from an initial belief.
    pub fn new(
        label: Label,
        existence: T,
        estimate: Estimate<T, N>,
        dynamics: Dyn,
        sensor: Sen,
    ) -> Self {
        let mut history = Vec::new();
        history.push(FilteredStep {
            estimate: estimate.clone(),
            dt: T::zero(),
        });
        Self {
            label,
            existence,
            estimate,
            prediction: None,
            dynamics,
            sensor,
            history,
        }
    }

    /// Runs the prediction step over `dt`.
    ///
    /// Stores the prediction for the association phase and decays the
    /// existence probability by the model's survival probability.
    pub fn predict(&mut self, estimator: &EstimatorKind<T>, dt: T) -> Result<()> {
        self.existence *= self.dynamics.survival_probability(&self.estimate.mean);
        self.prediction = Some(estimator.predict(
            &self.estimate,
            &self.dynamics,
            &self.sensor,
            dt,
        )?);
        Ok(())
    }

    /// Returns the latest prediction, if one is pending.
    #[inline]
    pub fn prediction(&self) -> Option<&Prediction<T, N, M>> {
        self.prediction.as_ref()
    }

    /// Applies the association-weighted update and records the posterior in
    /// the filtered history.
    ///
    /// # Errors
    /// [`JipdaError::MissingMeasurement`] if called before `predict`;
    /// [`JipdaError::AssociationInconsistency`] on a weight/measurement
    /// length mismatch.
    pub fn apply_weighted_update(
        &mut self,
        estimator: &EstimatorKind<T>,
        measurements: &[Measurement<T, M>],
        weights: &[T],
        dt: T,
    ) -> Result<()> {
        let prediction = self
            .prediction
            .as_ref()
            .ok_or(JipdaError::MissingMeasurement)?;
        self.estimate = estimator.update_multi(prediction, measurements, weights)?;
        self.history.push(FilteredStep {
            estimate: self.estimate.clone(),
            dt,
        });
        Ok(())
    }

    /// Returns the filtered history.
    #[inline]
    pub fn history(&self) -> &[FilteredStep<T, N>] {
        &self.history
    }

    /// Returns a copyable summary for reporting.
    pub fn summary(&self) -> TrackSummary<T, N> {
        TrackSummary {
            label: self.label,
            existence: self.existence,
            mean: self.estimate.mean,
            covariance: self.estimate.covariance.clone(),
        }
    }
}

// ============================================================================
// Track Summary
// ============================================================================

/// Per-cycle snapshot of one track for the diagnostics surface.
#[derive(Debug, Clone)]
pub struct TrackSummary<T: RealField, const N: usize> {
    /// Track identity
    pub label: Label,
    /// Existence probability after the cycle
    pub existence: T,
    /// Posterior mean
    pub mean: StateVector<T, N>,
    /// Posterior covariance
    pub covariance: StateCovariance<T, N>,
}

// ============================================================================
// Tests
// ============================================================================
