//! Backward smoothing over a completed filtered trajectory
//!
//! Rauch-Tung-Striebel-style recursion shared by all estimator variants.
//! Smoothing is a strictly sequential post-processing pass over an immutable
//! history; it never touches the live track and is restartable only from
//! scratch.

use nalgebra::{RealField, SMatrix};
use num_traits::Float;

use alloc::vec::Vec;

use crate::models::DynamicModel;
use crate::types::spaces::{StateCovariance, StateVector};
use crate::{JipdaError, Result};

use super::estimator::{Estimate, EstimatorKind};
use super::unscented::unscented_forward;

// ============================================================================
// Trajectory Types
// ============================================================================

/// One entry of a filtered trajectory.
#[derive(Debug, Clone)]
pub struct FilteredStep<T: RealField, const N: usize> {
    /// Posterior estimate at this step
    pub estimate: Estimate<T, N>,
    /// Interval since the previous step (unused for the first entry)
    pub dt: T,
}

/// A post-hoc corrected estimate for one historical step.
#[derive(Debug, Clone)]
pub struct SmoothedEstimate<T: RealField, const N: usize> {
    /// Smoothed state mean
    pub mean: StateVector<T, N>,
    /// Smoothed state covariance
    pub covariance: StateCovariance<T, N>,
    /// Smoothing gain applied at this step (zero at the terminal step)
    pub gain: SMatrix<T, N, N>,
}

// ============================================================================
// Backward Recursion
// ============================================================================

impl<T: RealField + Float + Copy> EstimatorKind<T> {
    /// Smooths a completed filtered trajectory.
    ///
    /// The last smoothed estimate equals the last filtered estimate. Each
    /// earlier step re-derives the one-step forward prediction from that
    /// step's filtered covariance and the process noise (sigma-point
    /// transform for the unscented variant, Jacobian propagation otherwise),
    /// forms the smoothing gain G = C·(P⁻)⁻¹ from the
    /// filtered/predicted-state cross covariance, and back-corrects with the
    /// next step's smoothed-minus-predicted residual.
    ///
    /// A one-step trajectory is returned unchanged.
    ///
    /// # Errors
    /// [`JipdaError::MissingMeasurement`] for an empty trajectory;
    /// [`JipdaError::SingularMatrix`] if a forward-predicted covariance
    /// cannot be inverted.
    pub fn smooth<Dyn, const N: usize>(
        &self,
        trajectory: &[FilteredStep<T, N>],
        dynamics: &Dyn,
    ) -> Result<Vec<SmoothedEstimate<T, N>>>
    where
        Dyn: DynamicModel<T, N>,
    {
        let last = trajectory.last().ok_or(JipdaError::MissingMeasurement)?;

        // Built back-to-front, reversed before returning
        let mut backward: Vec<SmoothedEstimate<T, N>> = Vec::with_capacity(trajectory.len());
        backward.push(SmoothedEstimate {
            mean: last.estimate.mean,
            covariance: last.estimate.covariance.clone(),
            gain: SMatrix::zeros(),
        });

        for k in (0..trajectory.len() - 1).rev() {
            let filtered = &trajectory[k].estimate;
            let dt = trajectory[k + 1].dt;

            let (pred_mean, pred_cov, cross) = match self {
                EstimatorKind::Linear | EstimatorKind::ExtendedJacobian => {
                    let f = dynamics.transition_jacobian(dt, &filtered.mean);
                    let q = dynamics.process_noise(dt);
                    let mean = dynamics.transition(dt, &filtered.mean);
                    let cov = f
                        .propagate_covariance(&filtered.covariance)
                        .add(&q)
                        .symmetrized();
                    let cross = filtered.covariance.as_matrix() * f.as_matrix().transpose();
                    (mean.into_svector(), cov.into_matrix(), cross)
                }
                EstimatorKind::Unscented(params) => {
                    unscented_forward(filtered, dynamics, dt, params)?
                }
            };

            let pred_cov_inv = pred_cov
                .try_inverse()
                .ok_or(JipdaError::SingularMatrix)?;
            let gain = cross * pred_cov_inv;

            let next = backward.last().expect("seeded with the terminal step");
            let mean = StateVector::from_svector(
                filtered.mean.as_svector() + gain * (next.mean.as_svector() - pred_mean),
            );
            let covariance = StateCovariance::from_matrix(
                filtered.covariance.as_matrix()
                    + gain * (next.covariance.as_matrix() - pred_cov) * gain.transpose(),
            )
            .symmetrized();

            backward.push(SmoothedEstimate {
                mean,
                covariance,
                gain,
            });
        }

        backward.reverse();
        Ok(backward)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConstantVelocity2D;
    use crate::types::spaces::StateCovariance;

    fn step(mean: [f64; 4], cov: StateCovariance<f64, 4>, dt: f64) -> FilteredStep<f64, 4> {
        FilteredStep {
            estimate: Estimate::new(StateVector::from_array(mean), cov),
            dt,
        }
    }

    #[test]
    fn test_empty_trajectory_is_an_error() {
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let err = EstimatorKind::<f64>::Linear
            .smooth::<_, 4>(&[], &dynamics)
            .unwrap_err();
        assert_eq!(err, JipdaError::MissingMeasurement);
    }

    #[test]
    fn test_single_step_returns_filtered_unchanged() {
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let trajectory = [step([1.0, 2.0, 3.0, 4.0], StateCovariance::identity(), 0.0)];

        let smoothed = EstimatorKind::<f64>::Linear
            .smooth(&trajectory, &dynamics)
            .unwrap();

        assert_eq!(smoothed.len(), 1);
        assert_eq!(smoothed[0].mean, trajectory[0].estimate.mean);
        assert_eq!(smoothed[0].covariance, trajectory[0].estimate.covariance);
    }

    #[test]
    fn test_zero_process_noise_smoothing_recovers_true_trajectory() {
        // Constant velocity with zero process noise: the filtered history of
        // a run over noise-free position measurements, once smoothed, must
        // land on the true trajectory.
        use crate::models::PositionSensor2D;

        let dynamics = ConstantVelocity2D::new(0.0_f64, 0.99);
        let sensor = PositionSensor2D::new(1.0_f64);
        let kind = EstimatorKind::<f64>::Linear;

        let truth = |t: f64| [t, 0.5 * t, 1.0, 0.5];

        // Deliberately wrong prior velocity
        let mut estimate = Estimate::new(
            StateVector::from_array([0.0, 0.0, 0.8, 0.4]),
            StateCovariance::identity(),
        );
        let mut trajectory = vec![FilteredStep {
            estimate: estimate.clone(),
            dt: 0.0,
        }];

        for k in 1..=8 {
            let t = k as f64;
            let pred = kind
                .predict::<_, _, 4, 2>(&estimate, &dynamics, &sensor, 1.0)
                .unwrap();
            let z = crate::types::spaces::Measurement::from_array([t, 0.5 * t]);
            estimate = kind.update(&pred, Some(&z));
            trajectory.push(FilteredStep {
                estimate: estimate.clone(),
                dt: 1.0,
            });
        }

        let smoothed = kind.smooth(&trajectory, &dynamics).unwrap();

        for (k, s) in smoothed.iter().enumerate() {
            let expected = truth(k as f64);
            for i in 0..4 {
                assert!(
                    (s.mean.index(i) - expected[i]).abs() < 0.05,
                    "step {} component {}: {} vs {}",
                    k,
                    i,
                    s.mean.index(i),
                    expected[i]
                );
            }
        }
    }

    #[test]
    fn test_unscented_smoothing_matches_linear_for_linear_model() {
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let trajectory: Vec<_> = (0..4)
            .map(|k| {
                let t = k as f64;
                step(
                    [t, t * 0.5, 1.0, 0.5],
                    StateCovariance::identity().scale(1.0 + 0.1 * t),
                    if k == 0 { 0.0 } else { 1.0 },
                )
            })
            .collect();

        let linear = EstimatorKind::<f64>::Linear
            .smooth(&trajectory, &dynamics)
            .unwrap();
        let unscented = EstimatorKind::Unscented(crate::filters::UkfParams::default())
            .smooth(&trajectory, &dynamics)
            .unwrap();

        for (a, b) in linear.iter().zip(unscented.iter()) {
            for i in 0..4 {
                assert!((a.mean.index(i) - b.mean.index(i)).abs() < 1e-6);
                for j in 0..4 {
                    assert!(
                        (a.covariance.as_matrix()[(i, j)] - b.covariance.as_matrix()[(i, j)])
                            .abs()
                            < 1e-5
                    );
                }
            }
        }
    }
}
