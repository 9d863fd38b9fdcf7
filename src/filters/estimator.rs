//! State estimator contract
//!
//! A single track's belief together with the predict/update operations every
//! estimator variant implements. The variant is a closed enum selected at
//! construction; nothing downstream ever branches on model types at runtime.

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::models::{DynamicModel, SensorModel};
use crate::types::spaces::{Measurement, MeasurementCovariance, StateCovariance, StateVector};
use crate::types::transforms::{
    cross_covariance, gain_from_cross, innovation_covariance, CrossCovariance, KalmanGain,
};
use crate::{JipdaError, Result};

use super::unscented::UkfParams;

// ============================================================================
// State Estimate
// ============================================================================

/// A Gaussian state belief: mean and covariance.
///
/// # Type Parameters
///
/// - `T`: Scalar type (typically `f32` or `f64`)
/// - `N`: State dimension (compile-time constant)
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate<T: RealField, const N: usize> {
    /// State estimate mean
    pub mean: StateVector<T, N>,
    /// State estimate covariance
    pub covariance: StateCovariance<T, N>,
}

impl<T: RealField + Copy, const N: usize> Estimate<T, N> {
    /// Creates a new estimate.
    #[inline]
    pub fn new(mean: StateVector<T, N>, covariance: StateCovariance<T, N>) -> Self {
        Self { mean, covariance }
    }

    /// Creates an estimate with diagonal covariance.
    #[inline]
    pub fn with_diagonal_covariance(
        mean: StateVector<T, N>,
        diagonal: &SVector<T, N>,
    ) -> Self {
        Self {
            mean,
            covariance: StateCovariance::from_diagonal(diagonal),
        }
    }

    /// Returns the trace of the covariance matrix (sum of variances).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.covariance.trace()
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// The product of one prediction step.
///
/// Carries everything the association engine and the weighted update need:
/// the predicted state, the predicted measurement with its innovation
/// covariance S, the state/measurement cross covariance, and the Kalman gain
/// K = P_xz S⁻¹ derived from them.
#[derive(Debug, Clone)]
pub struct Prediction<T: RealField, const N: usize, const M: usize> {
    /// Predicted state mean
    pub mean: StateVector<T, N>,
    /// Predicted state covariance
    pub covariance: StateCovariance<T, N>,
    /// Predicted measurement mean
    pub meas_mean: Measurement<T, M>,
    /// Innovation covariance S
    pub innovation_cov: MeasurementCovariance<T, M>,
    /// State/measurement cross covariance P_xz
    pub cross_cov: CrossCovariance<T, N, M>,
    /// Kalman gain K = P_xz S⁻¹
    pub gain: KalmanGain<T, N, M>,
}

impl<T: RealField + Copy, const N: usize, const M: usize> Prediction<T, N, M> {
    /// Returns the predicted state as an estimate, used as the posterior when
    /// no measurement is associated.
    #[inline]
    pub fn as_estimate(&self) -> Estimate<T, N> {
        Estimate {
            mean: self.mean,
            covariance: self.covariance,
        }
    }
}

// ============================================================================
// Estimator Variants
// ============================================================================

/// The estimator algorithm applied to a track.
///
/// Selected at construction; the three variants share one
/// predict/update/smooth contract over the model-provider traits.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorKind<T: RealField> {
    /// Linear Kalman filter: the model's Jacobian is its transition matrix.
    Linear,
    /// Extended Kalman filter: propagates through the nonlinear functions,
    /// linearizes covariances with the analytic Jacobians.
    ExtendedJacobian,
    /// Augmented-state unscented filter with the given scaling parameters.
    Unscented(UkfParams<T>),
}

impl<T: RealField + Float + Copy> EstimatorKind<T> {
    /// Performs the prediction step over the interval `dt`.
    ///
    /// Produces the predicted state together with the predicted measurement
    /// distribution and gain consumed by gating and the weighted update.
    ///
    /// # Errors
    /// [`JipdaError::SingularMatrix`] if the innovation covariance cannot be
    /// inverted; [`JipdaError::NumericalInstability`] if the unscented path
    /// cannot recover a factorizable augmented covariance.
    pub fn predict<Dyn, Sen, const N: usize, const M: usize>(
        &self,
        estimate: &Estimate<T, N>,
        dynamics: &Dyn,
        sensor: &Sen,
        dt: T,
    ) -> Result<Prediction<T, N, M>>
    where
        Dyn: DynamicModel<T, N>,
        Sen: SensorModel<T, N, M>,
    {
        match self {
            // The linear filter is the Jacobian filter whose linearization is
            // exact, so both variants share the linearized path.
            EstimatorKind::Linear | EstimatorKind::ExtendedJacobian => {
                linearized_predict(estimate, dynamics, sensor, dt)
            }
            #[cfg(feature = "alloc")]
            EstimatorKind::Unscented(params) => {
                super::unscented::unscented_predict(estimate, dynamics, sensor, dt, params)
            }
            #[cfg(not(feature = "alloc"))]
            EstimatorKind::Unscented(_) => Err(JipdaError::InvalidConfiguration(
                "the unscented estimator requires the `alloc` feature",
            )),
        }
    }

    /// Performs the update step with a single measurement.
    ///
    /// Posterior mean = predicted mean + K·ν, posterior covariance =
    /// P - K S Kᵀ. With no measurement the predicted state is kept as the
    /// posterior and a diagnostic is logged; a missing measurement is a
    /// recovered condition, not an error.
    pub fn update<const N: usize, const M: usize>(
        &self,
        prediction: &Prediction<T, N, M>,
        measurement: Option<&Measurement<T, M>>,
    ) -> Estimate<T, N> {
        let z = match measurement {
            Some(z) => z,
            None => {
                log::debug!("update called without a measurement; keeping the predicted state");
                return prediction.as_estimate();
            }
        };

        let innovation = *z - prediction.meas_mean;
        let correction = prediction.gain.correct(&innovation);
        let mean = StateVector::from_svector(
            prediction.mean.as_svector() + correction.as_svector(),
        );

        let k = prediction.gain.as_matrix();
        let covariance = StateCovariance::from_matrix(
            prediction.covariance.as_matrix()
                - k * prediction.innovation_cov.as_matrix() * k.transpose(),
        )
        .symmetrized();

        Estimate { mean, covariance }
    }

    /// Performs the association-weighted update over a set of candidate
    /// measurements.
    ///
    /// `weights` is `[miss, w_0, …, w_{m-1}]` summing to 1, with `weights[0]`
    /// the probability that none of the candidates originated from this
    /// track. The posterior combines the weighted innovation with the
    /// spread-of-innovations term that accounts for not knowing which
    /// candidate (if any) was correct:
    ///
    /// - ν̄ = Σⱼ wⱼ νⱼ
    /// - Pc = P - K S Kᵀ
    /// - spread = K·(Σⱼ wⱼ νⱼνⱼᵀ - ν̄ν̄ᵀ)·Kᵀ
    /// - P⁺ = w₀·P + (1-w₀)·Pc + spread
    ///
    /// With a single candidate and weights [0, 1] this reduces exactly to
    /// [`EstimatorKind::update`].
    ///
    /// # Errors
    /// [`JipdaError::AssociationInconsistency`] if the weight vector length
    /// does not match the candidate count.
    pub fn update_multi<const N: usize, const M: usize>(
        &self,
        prediction: &Prediction<T, N, M>,
        measurements: &[Measurement<T, M>],
        weights: &[T],
    ) -> Result<Estimate<T, N>> {
        if weights.len() != measurements.len() + 1 {
            return Err(JipdaError::AssociationInconsistency {
                measurement: weights.len().saturating_sub(1),
            });
        }

        let miss_weight = weights[0];

        let mut weighted_innovation = SVector::<T, M>::zeros();
        let mut innovation_spread = SMatrix::<T, M, M>::zeros();
        for (j, z) in measurements.iter().enumerate() {
            let w = weights[j + 1];
            if w <= T::zero() {
                continue;
            }
            let nu = (*z - prediction.meas_mean).into_svector();
            weighted_innovation += nu.scale(w);
            innovation_spread += (nu * nu.transpose()).scale(w);
        }

        let k = prediction.gain.as_matrix();
        let p = prediction.covariance.as_matrix();

        let mean = StateVector::from_svector(
            prediction.mean.as_svector() + k * weighted_innovation,
        );

        let updated = p - k * prediction.innovation_cov.as_matrix() * k.transpose();
        let spread = k
            * (innovation_spread - weighted_innovation * weighted_innovation.transpose())
            * k.transpose();

        let one = T::one();
        let covariance = StateCovariance::from_matrix(
            p.scale(miss_weight) + updated.scale(one - miss_weight) + spread,
        )
        .symmetrized();

        Ok(Estimate { mean, covariance })
    }
}

/// Shared predict path for the linear and extended variants.
fn linearized_predict<T, Dyn, Sen, const N: usize, const M: usize>(
    estimate: &Estimate<T, N>,
    dynamics: &Dyn,
    sensor: &Sen,
    dt: T,
) -> Result<Prediction<T, N, M>>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N>,
    Sen: SensorModel<T, N, M>,
{
    let f = dynamics.transition_jacobian(dt, &estimate.mean);
    let q = dynamics.process_noise(dt);

    let mean = dynamics.transition(dt, &estimate.mean);
    let covariance = f
        .propagate_covariance(&estimate.covariance)
        .add(&q)
        .symmetrized();

    let h = sensor.observation_jacobian(&mean);
    let r = sensor.observation_noise();

    let meas_mean = sensor.observe(&mean);
    let innovation_cov = innovation_covariance(&covariance, &h, &r).symmetrized();
    let cross_cov = cross_covariance(&covariance, &h);
    let gain = gain_from_cross(&cross_cov, &innovation_cov)?;

    Ok(Prediction {
        mean,
        covariance,
        meas_mean,
        innovation_cov,
        cross_cov,
        gain,
    })
}

// ============================================================================
// Tests
// ============================================================================
