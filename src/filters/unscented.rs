//! Augmented-state unscented transform
//!
//! Sigma-point machinery shared by the unscented predict path and the
//! unscented smoother. The augmented state concatenates the state with the
//! process- and observation-noise vectors, so one sigma set carries the state
//! through both the transition and the observation function with the noise
//! applied per point rather than added after the fact.
//!
//! # Sigma Point Selection
//!
//! Symmetric selection over the augmented dimension na:
//! - χ₀ = μ
//! - χᵢ = μ ± column_i(√((na+λ) P_aug))
//!
//! with λ = α²(na+κ) - na and weights
//! Wm₀ = λ/(na+λ), Wc₀ = Wm₀ + (1 - α² + β), Wᵢ = 1/(2(na+λ)).
//!
//! # Positive-Definiteness Recovery
//!
//! Round-off routinely leaves the augmented covariance indefinite after many
//! cycles. A failed factorization is therefore not an error: the matrix is
//! projected to the nearest symmetric positive-definite matrix (symmetrize,
//! clamp eigenvalues, recompose) and factorization is retried, with
//! escalating diagonal loading as the last resort.

use nalgebra::RealField;
use num_traits::Float;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;
#[cfg(feature = "alloc")]
use nalgebra::{DMatrix, DVector, SMatrix, SVector};

#[cfg(feature = "alloc")]
use crate::filters::estimator::{Estimate, Prediction};
#[cfg(feature = "alloc")]
use crate::models::{DynamicModel, SensorModel};
#[cfg(feature = "alloc")]
use crate::types::spaces::{Measurement, MeasurementCovariance, StateCovariance, StateVector};
#[cfg(feature = "alloc")]
use crate::types::transforms::{gain_from_cross, CrossCovariance};
#[cfg(feature = "alloc")]
use crate::{JipdaError, Result};

// ============================================================================
// Scaling Parameters
// ============================================================================

/// Scaling parameters for the unscented transform.
///
/// These control the sigma point spread and weighting over the augmented
/// state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UkfParams<T: RealField> {
    /// Primary scaling parameter (controls sigma point spread)
    ///
    /// Smaller α puts sigma points closer to the mean.
    pub alpha: T,

    /// Distribution parameter; β=2 is optimal for Gaussian priors.
    pub beta: T,

    /// Tertiary scaling parameter, κ ≥ 0.
    pub kappa: T,
}

impl<T: RealField + Float> Default for UkfParams<T> {
    fn default() -> Self {
        Self {
            alpha: T::from_f64(0.5).unwrap(),
            beta: T::from_f64(2.0).unwrap(),
            kappa: T::zero(),
        }
    }
}

impl<T: RealField + Float + Copy> UkfParams<T> {
    /// Creates new scaling parameters.
    ///
    /// # Panics
    /// Panics if α ≤ 0.
    pub fn new(alpha: T, beta: T, kappa: T) -> Self {
        assert!(alpha > T::zero(), "Alpha must be positive");
        Self { alpha, beta, kappa }
    }

    /// Computes the scaling parameter λ = α²(na + κ) - na for augmented
    /// dimension `na`.
    #[inline]
    fn lambda(&self, na: usize) -> T {
        let na_t = T::from_usize(na).unwrap();
        self.alpha * self.alpha * (na_t + self.kappa) - na_t
    }

    /// Computes the sigma weights for augmented dimension `na`.
    #[inline]
    pub(crate) fn weights(&self, na: usize) -> SigmaWeights<T> {
        let na_t = T::from_usize(na).unwrap();
        let lambda = self.lambda(na);
        let denom = na_t + lambda;
        let two = T::from_f64(2.0).unwrap();

        SigmaWeights {
            mean_0: lambda / denom,
            cov_0: lambda / denom + (T::one() - self.alpha * self.alpha + self.beta),
            rest: T::one() / (two * denom),
            scale: denom,
        }
    }
}

/// Sigma weights for a given augmented dimension.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SigmaWeights<T> {
    /// Mean weight of the central point: λ/(na+λ)
    pub mean_0: T,
    /// Covariance weight of the central point, with the (1 - α² + β)
    /// higher-order moment correction
    pub cov_0: T,
    /// Weight of every non-central point: 1/(2(na+λ))
    pub rest: T,
    /// Covariance scale (na + λ) applied before the square root
    pub scale: T,
}

// ============================================================================
// Positive-Definiteness Recovery
// ============================================================================

/// Projects a matrix to the nearest symmetric positive-definite matrix.
///
/// Symmetrizes, decomposes, clamps eigenvalues to a small positive floor,
/// and recomposes.
#[cfg(feature = "alloc")]
pub(crate) fn nearest_spd<T: RealField + Float + Copy>(m: &DMatrix<T>) -> DMatrix<T> {
    let half = T::from_f64(0.5).unwrap();
    let sym = (m + m.transpose()).scale(half);

    let eig = sym.symmetric_eigen();

    // Floor relative to the largest eigenvalue magnitude so the projection
    // scales with the problem
    let mut max_abs = T::zero();
    for l in eig.eigenvalues.iter() {
        let a = Float::abs(*l);
        if a > max_abs {
            max_abs = a;
        }
    }
    let floor = T::from_f64(1e-9).unwrap() * (max_abs + T::one());

    let clamped = eig.eigenvalues.map(|l| if l < floor { floor } else { l });
    &eig.eigenvectors * DMatrix::from_diagonal(&clamped) * eig.eigenvectors.transpose()
}

/// Computes a lower-triangular square-root factor of a covariance, recovering
/// positive definiteness when the factorization fails.
///
/// The recovery order is: plain Cholesky, nearest-SPD projection, then
/// escalating diagonal loading. Only a matrix that defeats all three (e.g.
/// one with non-finite entries) surfaces an error.
#[cfg(feature = "alloc")]
pub(crate) fn sqrt_with_recovery<T: RealField + Float + Copy>(
    m: DMatrix<T>,
) -> Result<DMatrix<T>> {
    if let Some(chol) = nalgebra::Cholesky::new(m.clone()) {
        return Ok(chol.unpack());
    }

    log::debug!("covariance factorization failed; projecting to nearest SPD");
    let mut projected = nearest_spd(&m);
    if let Some(chol) = nalgebra::Cholesky::new(projected.clone()) {
        return Ok(chol.unpack());
    }

    let n = projected.nrows();
    let n_t = T::from_usize(n).unwrap();
    let scale = Float::abs(projected.trace()) / n_t + T::one();
    let mut jitter = scale * T::from_f64(1e-12).unwrap();
    let ten = T::from_f64(10.0).unwrap();

    for _ in 0..8 {
        for i in 0..n {
            projected[(i, i)] += jitter;
        }
        if let Some(chol) = nalgebra::Cholesky::new(projected.clone()) {
            return Ok(chol.unpack());
        }
        jitter *= ten;
    }

    Err(JipdaError::NumericalInstability)
}

// ============================================================================
// Augmented Prediction
// ============================================================================

/// Runs the full augmented unscented prediction: state, process noise, and
/// observation noise are concatenated (na = nx + nw + nv), 2·na+1 sigma
/// points are pushed through the transition and then the observation
/// function, and the predicted state and measurement statistics are
/// recombined from the transformed set.
#[cfg(feature = "alloc")]
pub(crate) fn unscented_predict<T, Dyn, Sen, const N: usize, const M: usize>(
    estimate: &Estimate<T, N>,
    dynamics: &Dyn,
    sensor: &Sen,
    dt: T,
    params: &UkfParams<T>,
) -> Result<Prediction<T, N, M>>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N>,
    Sen: SensorModel<T, N, M>,
{
    let na = 2 * N + M;
    let w = params.weights(na);

    let q = dynamics.process_noise(dt);
    let r = sensor.observation_noise();

    // Augmented mean [x; 0; 0] and block-diagonal covariance diag(P, Q, R)
    let mut aug_mean = DVector::<T>::zeros(na);
    for i in 0..N {
        aug_mean[i] = *estimate.mean.index(i);
    }

    let mut aug_cov = DMatrix::<T>::zeros(na, na);
    for i in 0..N {
        for j in 0..N {
            aug_cov[(i, j)] = estimate.covariance.as_matrix()[(i, j)];
            aug_cov[(N + i, N + j)] = q.as_matrix()[(i, j)];
        }
    }
    for i in 0..M {
        for j in 0..M {
            aug_cov[(2 * N + i, 2 * N + j)] = r.as_matrix()[(i, j)];
        }
    }

    let sqrt = sqrt_with_recovery(aug_cov.scale(w.scale))?;

    // Propagate each augmented point: state through the dynamics with its
    // process-noise component, then through the sensor with its
    // observation-noise component
    let propagate = |point: &DVector<T>| -> (SVector<T, N>, SVector<T, M>) {
        let x = SVector::<T, N>::from_fn(|i, _| point[i]);
        let wn = SVector::<T, N>::from_fn(|i, _| point[N + i]);
        let vn = SVector::<T, M>::from_fn(|i, _| point[2 * N + i]);

        let x_pred = dynamics
            .transition(dt, &StateVector::from_svector(x))
            .into_svector()
            + wn;
        let z = sensor
            .observe(&StateVector::from_svector(x_pred))
            .into_svector()
            + vn;
        (x_pred, z)
    };

    let count = 2 * na + 1;
    let mut states: Vec<SVector<T, N>> = Vec::with_capacity(count);
    let mut meas: Vec<SVector<T, M>> = Vec::with_capacity(count);

    let (x0, z0) = propagate(&aug_mean);
    states.push(x0);
    meas.push(z0);

    for i in 0..na {
        let col = sqrt.column(i).into_owned();
        let (xp, zp) = propagate(&(&aug_mean + &col));
        states.push(xp);
        meas.push(zp);
        let (xm, zm) = propagate(&(&aug_mean - &col));
        states.push(xm);
        meas.push(zm);
    }

    // Recombine means
    let mut x_mean = states[0].scale(w.mean_0);
    let mut z_mean = meas[0].scale(w.mean_0);
    for i in 1..count {
        x_mean += states[i].scale(w.rest);
        z_mean += meas[i].scale(w.rest);
    }

    // Recombine covariances and the state/measurement cross term
    let dx0 = states[0] - x_mean;
    let dz0 = meas[0] - z_mean;
    let mut p = (dx0 * dx0.transpose()).scale(w.cov_0);
    let mut s = (dz0 * dz0.transpose()).scale(w.cov_0);
    let mut pxz: SMatrix<T, N, M> = (dx0 * dz0.transpose()).scale(w.cov_0);

    for i in 1..count {
        let dx = states[i] - x_mean;
        let dz = meas[i] - z_mean;
        p += (dx * dx.transpose()).scale(w.rest);
        s += (dz * dz.transpose()).scale(w.rest);
        pxz += (dx * dz.transpose()).scale(w.rest);
    }

    let covariance = StateCovariance::from_matrix(p).symmetrized();
    let innovation_cov = MeasurementCovariance::from_matrix(s).symmetrized();
    let cross_cov = CrossCovariance::from_matrix(pxz);
    let gain = gain_from_cross(&cross_cov, &innovation_cov)?;

    Ok(Prediction {
        mean: StateVector::from_svector(x_mean),
        covariance,
        meas_mean: Measurement::from_svector(z_mean),
        innovation_cov,
        cross_cov,
        gain,
    })
}

// ============================================================================
// Forward Transform for Smoothing
// ============================================================================

/// One-step forward sigma transform used by the backward smoothing recursion.
///
/// Augments only with process noise ([x; w], na = 2·nx), propagates through
/// the transition, and returns the forward-predicted mean and covariance
/// together with the filtered-state/predicted-state cross covariance that the
/// smoothing gain is built from.
#[cfg(feature = "alloc")]
pub(crate) fn unscented_forward<T, Dyn, const N: usize>(
    estimate: &Estimate<T, N>,
    dynamics: &Dyn,
    dt: T,
    params: &UkfParams<T>,
) -> Result<(SVector<T, N>, SMatrix<T, N, N>, SMatrix<T, N, N>)>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N>,
{
    let na = 2 * N;
    let w = params.weights(na);

    let q = dynamics.process_noise(dt);

    let mut aug_mean = DVector::<T>::zeros(na);
    for i in 0..N {
        aug_mean[i] = *estimate.mean.index(i);
    }

    let mut aug_cov = DMatrix::<T>::zeros(na, na);
    for i in 0..N {
        for j in 0..N {
            aug_cov[(i, j)] = estimate.covariance.as_matrix()[(i, j)];
            aug_cov[(N + i, N + j)] = q.as_matrix()[(i, j)];
        }
    }

    let sqrt = sqrt_with_recovery(aug_cov.scale(w.scale))?;

    let propagate = |point: &DVector<T>| -> (SVector<T, N>, SVector<T, N>) {
        let x = SVector::<T, N>::from_fn(|i, _| point[i]);
        let wn = SVector::<T, N>::from_fn(|i, _| point[N + i]);
        let x_pred = dynamics
            .transition(dt, &StateVector::from_svector(x))
            .into_svector()
            + wn;
        (x, x_pred)
    };

    let count = 2 * na + 1;
    let mut priors: Vec<SVector<T, N>> = Vec::with_capacity(count);
    let mut preds: Vec<SVector<T, N>> = Vec::with_capacity(count);

    let (x0, p0) = propagate(&aug_mean);
    priors.push(x0);
    preds.push(p0);

    for i in 0..na {
        let col = sqrt.column(i).into_owned();
        let (xa, pa) = propagate(&(&aug_mean + &col));
        priors.push(xa);
        preds.push(pa);
        let (xb, pb) = propagate(&(&aug_mean - &col));
        priors.push(xb);
        preds.push(pb);
    }

    let mut pred_mean = preds[0].scale(w.mean_0);
    for i in 1..count {
        pred_mean += preds[i].scale(w.rest);
    }

    let filtered_mean = estimate.mean.as_svector();

    let dprior0 = priors[0] - filtered_mean;
    let dpred0 = preds[0] - pred_mean;
    let mut pred_cov = (dpred0 * dpred0.transpose()).scale(w.cov_0);
    let mut cross = (dprior0 * dpred0.transpose()).scale(w.cov_0);

    for i in 1..count {
        let dprior = priors[i] - filtered_mean;
        let dpred = preds[i] - pred_mean;
        pred_cov += (dpred * dpred.transpose()).scale(w.rest);
        cross += (dprior * dpred.transpose()).scale(w.rest);
    }

    let half = T::from_f64(0.5).unwrap();
    pred_cov = (pred_cov + pred_cov.transpose()).scale(half);

    Ok((pred_mean, pred_cov, cross))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::models::{ConstantVelocity2D, PositionSensor2D};

    #[test]
    fn test_default_params() {
        let params: UkfParams<f64> = UkfParams::default();
        assert!((params.alpha - 0.5).abs() < 1e-12);
        assert!((params.beta - 2.0).abs() < 1e-12);
        assert!(params.kappa.abs() < 1e-12);
    }

    #[test]
    fn test_mean_weights_sum_to_one() {
        let params: UkfParams<f64> = UkfParams::default();
        let na = 10;
        let w = params.weights(na);

        let sum = w.mean_0 + 2.0 * na as f64 * w.rest;
        assert!((sum - 1.0).abs() < 1e-9, "mean weights sum: {}", sum);
    }

    #[test]
    fn test_nearest_spd_repairs_indefinite_matrix() {
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -2.0]);
        let repaired = nearest_spd(&indefinite);
        assert!(nalgebra::Cholesky::new(repaired).is_some());
    }

    #[test]
    fn test_sqrt_recovery_never_fails_on_finite_input() {
        // Slightly indefinite from simulated round-off
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.999, 0.0, 0.999, 1.0, 0.0, 0.0, 0.0, -1e-14]);
        let l = sqrt_with_recovery(m).unwrap();
        // L * L^T must reproduce an SPD matrix
        let product = &l * l.transpose();
        assert!(nalgebra::Cholesky::new(product).is_some());
    }

    #[test]
    fn test_augmented_predict_matches_linear_filter() {
        // For linear models the unscented transform is exact, so the
        // augmented prediction must match the closed-form Kalman prediction.
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let sensor = PositionSensor2D::new(2.0_f64);
        let params = UkfParams::default();

        let estimate = Estimate::new(
            StateVector::from_array([10.0, -5.0, 1.0, 2.0]),
            StateCovariance::identity(),
        );
        let dt = 1.0;

        let pred: Prediction<f64, 4, 2> =
            unscented_predict(&estimate, &dynamics, &sensor, dt, &params).unwrap();

        // Closed-form: x' = F x, P' = F P F^T + Q
        use crate::models::DynamicModel;
        let f = dynamics.transition_jacobian(dt, &estimate.mean);
        let expected_mean = f.apply_state(&estimate.mean);
        let expected_cov = f
            .propagate_covariance(&estimate.covariance)
            .add(&dynamics.process_noise(dt));

        for i in 0..4 {
            assert!(
                (pred.mean.index(i) - expected_mean.index(i)).abs() < 1e-8,
                "mean[{}]: {} vs {}",
                i,
                pred.mean.index(i),
                expected_mean.index(i)
            );
        }
        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    (pred.covariance.as_matrix()[(i, j)] - expected_cov.as_matrix()[(i, j)]).abs()
                        < 1e-6,
                    "cov[{},{}]",
                    i,
                    j
                );
            }
        }

        // Predicted measurement sits at the predicted position
        assert!((pred.meas_mean.index(0) - 11.0).abs() < 1e-8);
        assert!((pred.meas_mean.index(1) - -3.0).abs() < 1e-8);
    }

    #[test]
    fn test_predict_recovers_from_indefinite_covariance() {
        let dynamics = ConstantVelocity2D::new(0.5_f64, 0.99);
        let sensor = PositionSensor2D::new(2.0_f64);
        let params = UkfParams::default();

        // Negative variance entry from accumulated round-off
        let mut cov = nalgebra::SMatrix::<f64, 4, 4>::identity();
        cov[(3, 3)] = -1e-12;
        let estimate = Estimate::new(
            StateVector::from_array([0.0, 0.0, 1.0, 1.0]),
            StateCovariance::from_matrix(cov),
        );

        let pred: Prediction<f64, 4, 2> =
            unscented_predict(&estimate, &dynamics, &sensor, 1.0, &params).unwrap();
        assert!(pred.covariance.determinant_cholesky().is_some());
    }

    #[test]
    fn test_forward_transform_matches_linear_prediction() {
        let dynamics = ConstantVelocity2D::new(0.3_f64, 0.99);
        let params = UkfParams::default();

        let estimate = Estimate::new(
            StateVector::from_array([1.0, 2.0, 3.0, 4.0]),
            StateCovariance::identity(),
        );
        let dt = 0.5;

        let (pred_mean, pred_cov, cross) =
            unscented_forward(&estimate, &dynamics, dt, &params).unwrap();

        use crate::models::DynamicModel;
        let f = dynamics.transition_jacobian(dt, &estimate.mean);
        let expected_mean = f.apply_state(&estimate.mean);
        let expected_cov = f
            .propagate_covariance(&estimate.covariance)
            .add(&dynamics.process_noise(dt));
        let expected_cross = estimate.covariance.as_matrix() * f.as_matrix().transpose();

        for i in 0..4 {
            assert!((pred_mean[i] - expected_mean.index(i)).abs() < 1e-8);
            for j in 0..4 {
                assert!((pred_cov[(i, j)] - expected_cov.as_matrix()[(i, j)]).abs() < 1e-6);
                assert!((cross[(i, j)] - expected_cross[(i, j)]).abs() < 1e-6);
            }
        }
    }
}
