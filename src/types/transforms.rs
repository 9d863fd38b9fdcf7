//! Typed transformation matrices
//!
//! Matrices that map vectors between spaces, with type-level encoding of
//! source and target spaces, plus the shared Kalman-gain algebra used by all
//! estimator variants.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, Scalar};

use crate::{JipdaError, Result};

use super::spaces::{
    Innovation, Measurement, MeasurementCovariance, MeasurementSpace, StateCovariance, StateSpace,
    StateVector, Vector,
};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A transformation matrix that maps vectors from one space to another.
///
/// # Type Parameters
///
/// - `T`: Scalar type
/// - `ROWS`: Number of rows (dimension of target space)
/// - `COLS`: Number of columns (dimension of source space)
/// - `To`: Target space marker
/// - `From`: Source space marker
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    /// Creates a transform from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }

    /// Consumes self and returns the underlying matrix.
    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, ROWS, COLS> {
        self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where
    SMatrix<T, ROWS, COLS>: Copy,
{
}

impl<T: RealField + Copy, const ROWS: usize, const COLS: usize, To, From>
    Transform<T, ROWS, COLS, To, From>
{
    /// Creates a zero transform.
    #[inline]
    pub fn zeros() -> Self {
        Self {
            inner: SMatrix::zeros(),
            _marker: PhantomData,
        }
    }

    /// Applies the transform to a vector in the source space.
    #[inline]
    pub fn apply(&self, v: &Vector<T, COLS, From>) -> Vector<T, ROWS, To> {
        Vector::from_svector(self.inner * v.as_svector())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// State transition matrix (or transition Jacobian): StateSpace -> StateSpace
pub type TransitionMatrix<T, const N: usize> = Transform<T, N, N, StateSpace, StateSpace>;

/// Observation matrix (or observation Jacobian): StateSpace -> MeasurementSpace
pub type ObservationMatrix<T, const M: usize, const N: usize> =
    Transform<T, M, N, MeasurementSpace, StateSpace>;

/// State/measurement cross covariance: the E[(x - x̄)(z - ẑ)'] block shared by
/// linearized and sigma-point estimators.
pub type CrossCovariance<T, const N: usize, const M: usize> =
    Transform<T, N, M, StateSpace, MeasurementSpace>;

/// Kalman gain: maps innovations into state corrections.
pub type KalmanGain<T, const N: usize, const M: usize> =
    Transform<T, N, M, StateSpace, MeasurementSpace>;

// ============================================================================
// Specific Transform Applications
// ============================================================================

impl<T: RealField + Copy, const N: usize> TransitionMatrix<T, N> {
    /// Creates an identity transition matrix.
    #[inline]
    pub fn identity() -> Self {
        Self {
            inner: SMatrix::identity(),
            _marker: PhantomData,
        }
    }

    /// Applies the transition to a state vector.
    #[inline]
    pub fn apply_state(&self, state: &StateVector<T, N>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * state.as_svector())
    }

    /// Propagates a covariance matrix: F * P * F^T
    #[inline]
    pub fn propagate_covariance(&self, cov: &StateCovariance<T, N>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const M: usize, const N: usize> ObservationMatrix<T, M, N> {
    /// Applies the observation model to a state vector.
    #[inline]
    pub fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, M> {
        Measurement::from_svector(self.inner * state.as_svector())
    }

    /// Projects state covariance to measurement space: H * P * H^T
    #[inline]
    pub fn project_covariance(&self, cov: &StateCovariance<T, N>) -> MeasurementCovariance<T, M> {
        MeasurementCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize, const M: usize> KalmanGain<T, N, M> {
    /// Applies the Kalman gain to an innovation vector.
    #[inline]
    pub fn correct(&self, innovation: &Innovation<T, M>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * innovation.as_svector())
    }
}

// ============================================================================
// Shared Gain Algebra
// ============================================================================

/// Computes the innovation covariance.
///
/// S = H * P * H^T + R
pub fn innovation_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> MeasurementCovariance<T, M> {
    let h_p_ht = obs_matrix.project_covariance(state_cov);
    MeasurementCovariance::from_matrix(h_p_ht.as_matrix() + meas_noise.as_matrix())
}

/// Computes the state/measurement cross covariance for a linearized model.
///
/// P_xz = P * H^T
pub fn cross_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
) -> CrossCovariance<T, N, M> {
    CrossCovariance::from_matrix(state_cov.as_matrix() * obs_matrix.as_matrix().transpose())
}

/// Computes the Kalman gain from a cross covariance and an innovation
/// covariance.
///
/// K = P_xz * S^{-1}
///
/// This formulation covers both the linearized filters (P_xz = P * H^T) and
/// the sigma-point filter, where P_xz is recovered from the sample spread.
///
/// # Errors
/// [`JipdaError::SingularMatrix`] if S cannot be inverted.
pub fn gain_from_cross<T: RealField + Copy, const N: usize, const M: usize>(
    cross_cov: &CrossCovariance<T, N, M>,
    innovation_cov: &MeasurementCovariance<T, M>,
) -> Result<KalmanGain<T, N, M>> {
    let s_inv = innovation_cov
        .as_matrix()
        .try_inverse()
        .ok_or(JipdaError::SingularMatrix)?;
    Ok(KalmanGain::from_matrix(cross_cov.as_matrix() * s_inv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_propagation() {
        let f: TransitionMatrix<f64, 2> =
            TransitionMatrix::from_matrix(nalgebra::matrix![1.0, 1.0; 0.0, 1.0]);
        let state = StateVector::from_array([1.0, 2.0]);

        let next = f.apply_state(&state);
        assert!((next.index(0) - 3.0).abs() < 1e-12);
        assert!((next.index(1) - 2.0).abs() < 1e-12);

        let cov = StateCovariance::identity();
        let propagated = f.propagate_covariance(&cov);
        assert!((propagated.as_matrix()[(0, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gain_for_direct_observation() {
        // Observing the full state with unit noise halves the uncertainty
        let p: StateCovariance<f64, 2> = StateCovariance::identity();
        let h: ObservationMatrix<f64, 2, 2> =
            ObservationMatrix::from_matrix(SMatrix::identity());
        let r: MeasurementCovariance<f64, 2> = MeasurementCovariance::identity();

        let s = innovation_covariance(&p, &h, &r);
        let pxz = cross_covariance(&p, &h);
        let k = gain_from_cross(&pxz, &s).unwrap();

        assert!((k.as_matrix()[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((k.as_matrix()[(1, 1)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_gain_singular_innovation() {
        let pxz: CrossCovariance<f64, 2, 2> = CrossCovariance::from_matrix(SMatrix::identity());
        let s: MeasurementCovariance<f64, 2> = MeasurementCovariance::zeros();
        assert_eq!(
            gain_from_cross(&pxz, &s).unwrap_err(),
            JipdaError::SingularMatrix
        );
    }
}
