//! Gaussian density evaluation
//!
//! Likelihood helpers used by gating, association weighting, and track
//! existence updates.

use ::core::f64::consts::PI;
use nalgebra::RealField;
use num_traits::Float;

use crate::{JipdaError, Result};

use super::spaces::{Covariance, Vector};

/// Computes the log of the multivariate Gaussian density at a residual.
///
/// ln p(z) = -0.5 * (M ln(2π) + ln|S| + z^T S^{-1} z)
///
/// The quadratic form and determinant are both obtained from a single
/// Cholesky factorization, so a residual that fails to factor indicates a
/// covariance that is not positive definite.
///
/// # Errors
/// [`JipdaError::NumericalInstability`] if the covariance is not positive
/// definite.
pub fn log_gaussian_likelihood<T: RealField + Float + Copy, Space, const M: usize>(
    residual: &Vector<T, M, Space>,
    covariance: &Covariance<T, M, Space>,
) -> Result<T> {
    let chol = nalgebra::Cholesky::new(*covariance.as_matrix())
        .ok_or(JipdaError::NumericalInstability)?;

    // ln|S| = 2 * sum of log-diagonal of the Cholesky factor
    let l = chol.l();
    let mut ln_det = T::zero();
    for i in 0..M {
        ln_det += Float::ln(l[(i, i)]);
    }
    let two = T::from_f64(2.0).unwrap();
    ln_det *= two;

    // z^T S^{-1} z via triangular solve
    let solved = chol.solve(residual.as_svector());
    let quad = residual.as_svector().dot(&solved);

    let m_t = T::from_usize(M).unwrap();
    let ln_two_pi = T::from_f64((2.0 * PI).ln()).unwrap();
    let half = T::from_f64(0.5).unwrap();

    Ok(-half * (m_t * ln_two_pi + ln_det + quad))
}

/// Computes the multivariate Gaussian density at a residual.
///
/// See [`log_gaussian_likelihood`] for the error contract.
#[inline]
pub fn gaussian_likelihood<T: RealField + Float + Copy, Space, const M: usize>(
    residual: &Vector<T, M, Space>,
    covariance: &Covariance<T, M, Space>,
) -> Result<T> {
    log_gaussian_likelihood(residual, covariance).map(Float::exp)
}

/// Computes the squared Mahalanobis distance of a residual.
///
/// d² = z^T S^{-1} z
///
/// # Errors
/// [`JipdaError::NumericalInstability`] if the covariance is not positive
/// definite.
pub fn mahalanobis_squared<T: RealField + Float + Copy, Space, const M: usize>(
    residual: &Vector<T, M, Space>,
    covariance: &Covariance<T, M, Space>,
) -> Result<T> {
    let chol = nalgebra::Cholesky::new(*covariance.as_matrix())
        .ok_or(JipdaError::NumericalInstability)?;
    let solved = chol.solve(residual.as_svector());
    Ok(residual.as_svector().dot(&solved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::spaces::{Innovation, MeasurementCovariance};

    #[test]
    fn test_standard_normal_peak() {
        let zero: Innovation<f64, 2> = Innovation::zeros();
        let cov = MeasurementCovariance::identity();

        let p = gaussian_likelihood(&zero, &Covariance::from_matrix(*cov.as_matrix())).unwrap();
        // Peak of a 2D standard normal is 1/(2π)
        assert!((p - 1.0 / (2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_likelihood_decays_with_distance() {
        let cov: Covariance<f64, 2, crate::types::spaces::InnovationSpace> =
            Covariance::identity();
        let near: Innovation<f64, 2> = Innovation::from_array([0.1, 0.0]);
        let far: Innovation<f64, 2> = Innovation::from_array([3.0, 3.0]);

        let p_near = gaussian_likelihood(&near, &cov).unwrap();
        let p_far = gaussian_likelihood(&far, &cov).unwrap();
        assert!(p_near > p_far);
    }

    #[test]
    fn test_mahalanobis_accounts_for_scale() {
        let residual: Innovation<f64, 2> = Innovation::from_array([2.0, 0.0]);
        let tight: Covariance<f64, 2, crate::types::spaces::InnovationSpace> =
            Covariance::identity();
        let loose = tight.scale(4.0);

        let d_tight = mahalanobis_squared(&residual, &tight).unwrap();
        let d_loose = mahalanobis_squared(&residual, &loose).unwrap();
        assert!((d_tight - 4.0).abs() < 1e-12);
        assert!((d_loose - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_indefinite_covariance_rejected() {
        let residual: Innovation<f64, 2> = Innovation::zeros();
        let indefinite: Covariance<f64, 2, crate::types::spaces::InnovationSpace> =
            Covariance::from_matrix(nalgebra::matrix![1.0, 0.0; 0.0, -1.0]);
        assert_eq!(
            gaussian_likelihood(&residual, &indefinite).unwrap_err(),
            JipdaError::NumericalInstability
        );
    }
}
