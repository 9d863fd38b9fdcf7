//! Track lifecycle
//!
//! Existence-probability arithmetic shared by confirmed tracks and the
//! search hypothesis, and the search hypothesis itself: one extra estimator
//! run over the measurements no confirmed track claims, promoted into a
//! confirmed track once its existence clears the birth threshold.

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec::Vec;

use crate::filters::{Estimate, EstimatorKind, Prediction};
use crate::models::{DynamicModel, SensorModel};
use crate::types::gaussian::{gaussian_likelihood, mahalanobis_squared};
use crate::types::labels::LabelGenerator;
use crate::types::spaces::Measurement;
use crate::Result;

use super::track::Track;

// ============================================================================
// Existence Arithmetic
// ============================================================================

/// Association likelihood ratio of one cycle for one hypothesis:
///
/// Λ = (1 - PD·PG) + PD·PG · (Σⱼ gⱼ) / λ_fa
///
/// where gⱼ are the Gaussian likelihoods of the gated candidates and λ_fa is
/// the false-alarm intensity. Λ < 1 (nothing plausible seen) shrinks
/// existence; Λ > 1 grows it.
pub fn association_likelihood_ratio<T: RealField + Copy>(
    pd_pg: T,
    gated_likelihood_sum: T,
    clutter_intensity: T,
) -> T {
    (T::one() - pd_pg) + pd_pg * gated_likelihood_sum / clutter_intensity
}

/// Bernoulli existence update:
///
/// r⁺ = Λ·r⁻ / (1 - r⁻ + Λ·r⁻)
pub fn existence_posterior<T: RealField + Copy>(predicted: T, likelihood_ratio: T) -> T {
    let denom = T::one() - predicted + likelihood_ratio * predicted;
    if denom <= T::zero() {
        return T::zero();
    }
    let r = likelihood_ratio * predicted / denom;
    if r > T::one() {
        T::one()
    } else {
        r
    }
}

// ============================================================================
// Search Hypothesis
// ============================================================================

/// The untracked-object hypothesis.
///
/// Runs its own predict/update pair every cycle over the unassociated
/// measurements. Promotion hands the current belief to a new confirmed track
/// and reseeds this hypothesis from its configured prior.
#[derive(Debug, Clone)]
pub struct SearchHypothesis<T, Dyn, Sen, const N: usize, const M: usize>
where
    T: RealField,
{
    /// Existence probability of the hypothesis
    pub existence: T,
    /// Current belief
    pub estimate: Estimate<T, N>,
    prediction: Option<Prediction<T, N, M>>,
    prior: Estimate<T, N>,
    seed_existence: T,
    dynamics: Dyn,
    sensor: Sen,
}

impl<T, Dyn, Sen, const N: usize, const M: usize> SearchHypothesis<T, Dyn, Sen, N, M>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N>,
    Sen: SensorModel<T, N, M>,
{
    /// Creates a search hypothesis seeded from the given prior.
    pub fn new(prior: Estimate<T, N>, seed_existence: T, dynamics: Dyn, sensor: Sen) -> Self {
        Self {
            existence: seed_existence,
            estimate: prior.clone(),
            prediction: None,
            prior,
            seed_existence,
            dynamics,
            sensor,
        }
    }

    /// Runs the prediction step over `dt`.
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

    /// Feeds the cycle's unassociated measurements to the hypothesis.
    ///
    /// Candidates inside the search gate drive the existence update through
    /// the Bernoulli form; the state updates with the best-likelihood
    /// candidate, or keeps the prediction when nothing gates.
    pub fn observe(
        &mut self,
        estimator: &EstimatorKind<T>,
        candidates: &[Measurement<T, M>],
        gate_threshold: T,
        pd_pg: T,
        clutter_intensity: T,
    ) -> Result<()> {
        let prediction = match self.prediction.take() {
            Some(p) => p,
            None => return Ok(()),
        };

        let mut likelihood_sum = T::zero();
        let mut best: Option<(T, &Measurement<T, M>)> = None;
        let s = prediction.innovation_cov.as_innovation_cov();
        for z in candidates {
            let residual = *z - prediction.meas_mean;
            let d_sq = mahalanobis_squared(&residual, &s)?;
            if d_sq >= gate_threshold {
                continue;
            }
            let g = gaussian_likelihood(&residual, &s)?;
            likelihood_sum += g;
            if best.map_or(true, |(best_g, _)| g > best_g) {
                best = Some((g, z));
            }
        }

        let ratio = association_likelihood_ratio(pd_pg, likelihood_sum, clutter_intensity);
        self.existence = existence_posterior(self.existence, ratio);
        self.estimate = estimator.update(&prediction, best.map(|(_, z)| z));
        Ok(())
    }

    /// Promotes the hypothesis into a confirmed track once its existence
    /// clears `birth_threshold`, reseeding the hypothesis from its prior.
    pub fn try_promote(
        &mut self,
        birth_threshold: T,
        labels: &mut LabelGenerator,
    ) -> Option<Track<T, Dyn, Sen, N, M>>
    where
        Dyn: Clone,
        Sen: Clone,
    {
        if self.existence <= birth_threshold {
            return None;
        }

        let track = Track::new(
            labels.next_label(),
            self.existence,
            self.estimate.clone(),
            self.dynamics.clone(),
            self.sensor.clone(),
        );

        self.estimate = self.prior.clone();
        self.existence = self.seed_existence;
        self.prediction = None;

        Some(track)
    }

    /// Partitions a scan into the measurements no confirmed track gates.
    pub fn unassociated_measurements(
        validation: &crate::association::ValidationMatrix,
        measurements: &[Measurement<T, M>],
    ) -> Vec<Measurement<T, M>> {
        measurements
            .iter()
            .enumerate()
            .filter(|&(j, _)| !validation.measurement_is_gated(j))
            .map(|(_, z)| *z)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstantVelocity2D, PositionSensor2D};
    use crate::types::spaces::{StateCovariance, StateVector};

    #[test]
    fn test_existence_posterior_bounds() {
        // Nothing plausible seen: existence shrinks
        let shrunk = existence_posterior(0.5_f64, 0.2);
        assert!(shrunk < 0.5);

        // Strong evidence: existence grows toward 1 without exceeding it
        let grown = existence_posterior(0.5_f64, 50.0);
        assert!(grown > 0.5 && grown <= 1.0);

        // Dead stays dead
        assert_eq!(existence_posterior(0.0_f64, 10.0), 0.0);
    }

    #[test]
    fn test_likelihood_ratio_neutral_point() {
        // With no gated likelihood mass the ratio is exactly 1 - PD*PG
        let ratio = association_likelihood_ratio(0.9_f64, 0.0, 1.0);
        assert!((ratio - 0.1).abs() < 1e-12);
    }

    fn search() -> SearchHypothesis<f64, ConstantVelocity2D<f64>, PositionSensor2D<f64>, 4, 2> {
        SearchHypothesis::new(
            Estimate::new(
                StateVector::from_array([0.0, 0.0, 0.0, 0.0]),
                StateCovariance::identity().scale(100.0),
            ),
            0.05,
            ConstantVelocity2D::new(0.5, 0.99),
            PositionSensor2D::new(1.0),
        )
    }

    #[test]
    fn test_repeated_detections_drive_promotion() {
        let mut s = search();
        let mut labels = LabelGenerator::new();
        let estimator = EstimatorKind::Linear;

        let mut promoted = None;
        for _ in 0..20 {
            s.predict(&estimator, 1.0).unwrap();
            let z = Measurement::from_array([10.0, 10.0]);
            s.observe(&estimator, &[z], 9.21, 0.9 * 0.99, 1e-4).unwrap();
            if let Some(track) = s.try_promote(0.9, &mut labels) {
                promoted = Some(track);
                break;
            }
        }

        let track = promoted.expect("persistent detections must promote");
        assert!(track.existence > 0.9);
        // Belief converged near the detection location
        assert!((track.estimate.mean.index(0) - 10.0).abs() < 2.0);
        // Hypothesis reseeded
        assert!((s.existence - 0.05).abs() < 1e-12);
        assert!((s.estimate.mean.index(0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_silence_decays_existence() {
        let mut s = search();
        s.existence = 0.5;
        let estimator = EstimatorKind::Linear;

        for _ in 0..5 {
            s.predict(&estimator, 1.0).unwrap();
            s.observe(&estimator, &[], 9.21, 0.9 * 0.99, 1.0).unwrap();
        }
        assert!(s.existence < 0.05);
    }
}
