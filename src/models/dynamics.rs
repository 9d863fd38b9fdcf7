//! Dynamic models for target motion
//!
//! Concrete [`DynamicModel`] implementations covering the linear and
//! nonlinear cases the estimator variants are built for.

use nalgebra::RealField;
use num_traits::Float;

use super::DynamicModel;
use crate::types::spaces::{StateCovariance, StateVector};
use crate::types::transforms::TransitionMatrix;

// ============================================================================
// Constant Velocity (linear)
// ============================================================================

/// Constant velocity model in 2D.
///
/// State: [x, y, vx, vy]
#[derive(Debug, Clone)]
pub struct ConstantVelocity2D<T: RealField> {
    /// Process noise intensity (acceleration standard deviation)
    pub sigma_a: T,
    /// Survival probability
    pub p_survival: T,
}

impl<T: RealField + Float + Copy> ConstantVelocity2D<T> {
    /// Creates a new constant velocity model.
    ///
    /// # Arguments
    /// - `sigma_a`: Acceleration standard deviation (must be >= 0)
    /// - `p_survival`: Per-cycle survival probability (must be in [0, 1])
    ///
    /// # Panics
    /// Panics if `sigma_a < 0` or `p_survival` is not in [0, 1].
    pub fn new(sigma_a: T, p_survival: T) -> Self {
        assert!(
            sigma_a >= T::zero(),
            "Process noise sigma_a must be non-negative"
        );
        assert!(
            p_survival >= T::zero() && p_survival <= T::one(),
            "Survival probability must be in [0, 1]"
        );
        Self {
            sigma_a,
            p_survival,
        }
    }

    fn matrix(&self, dt: T) -> TransitionMatrix<T, 4> {
        let one = T::one();
        let zero = T::zero();

        TransitionMatrix::from_matrix(nalgebra::matrix![
            one, zero, dt, zero;
            zero, one, zero, dt;
            zero, zero, one, zero;
            zero, zero, zero, one
        ])
    }
}

impl<T: RealField + Float + Copy> DynamicModel<T, 4> for ConstantVelocity2D<T> {
    fn transition(&self, dt: T, state: &StateVector<T, 4>) -> StateVector<T, 4> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        self.matrix(dt).apply_state(state)
    }

    fn transition_jacobian(&self, dt: T, _state: &StateVector<T, 4>) -> TransitionMatrix<T, 4> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        self.matrix(dt)
    }

    fn process_noise(&self, dt: T) -> StateCovariance<T, 4> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let two = T::from_f64(2.0).unwrap();
        let four = T::from_f64(4.0).unwrap();

        let sigma_sq = self.sigma_a * self.sigma_a;

        // Discrete white noise acceleration model
        let q11 = dt4 / four * sigma_sq;
        let q13 = dt3 / two * sigma_sq;
        let q33 = dt2 * sigma_sq;

        let zero = T::zero();

        StateCovariance::from_matrix(nalgebra::matrix![
            q11, zero, q13, zero;
            zero, q11, zero, q13;
            q13, zero, q33, zero;
            zero, q13, zero, q33
        ])
    }

    fn survival_probability(&self, _state: &StateVector<T, 4>) -> T {
        self.p_survival
    }
}

// ============================================================================
// Coordinated Turn (nonlinear)
// ============================================================================

/// Nearly constant turn rate model in 2D.
///
/// State: [x, y, vx, vy, omega] where omega is the turn rate (rad/s).
///
/// The target moves with constant speed and turn rate:
/// - x' = x + (vx·sin(ωΔt) + vy·(1 - cos(ωΔt)))/ω
/// - y' = y + (vx·(1 - cos(ωΔt)) + vy·sin(ωΔt))/ω
/// - [vx', vy'] = velocity rotated by ωΔt
/// - ω' = ω
///
/// Near ω = 0 the dynamics fall back to constant velocity to avoid the
/// singular division.
#[derive(Debug, Clone)]
pub struct CoordinatedTurn2D<T: RealField> {
    /// Process noise intensity for linear acceleration
    pub sigma_a: T,
    /// Process noise intensity for turn rate acceleration
    pub sigma_omega: T,
    /// Survival probability
    pub p_survival: T,
}

impl<T: RealField + Float + Copy> CoordinatedTurn2D<T> {
    /// Creates a new coordinated turn model.
    ///
    /// # Arguments
    /// - `sigma_a`: Linear acceleration noise intensity (must be >= 0)
    /// - `sigma_omega`: Turn rate noise intensity (must be >= 0)
    /// - `p_survival`: Per-cycle survival probability (must be in [0, 1])
    ///
    /// # Panics
    /// Panics if noise parameters are negative or `p_survival` is not in [0, 1].
    pub fn new(sigma_a: T, sigma_omega: T, p_survival: T) -> Self {
        assert!(
            sigma_a >= T::zero(),
            "Process noise sigma_a must be non-negative"
        );
        assert!(
            sigma_omega >= T::zero(),
            "Process noise sigma_omega must be non-negative"
        );
        assert!(
            p_survival >= T::zero() && p_survival <= T::one(),
            "Survival probability must be in [0, 1]"
        );
        Self {
            sigma_a,
            sigma_omega,
            p_survival,
        }
    }
}

impl<T: RealField + Float + Copy> DynamicModel<T, 5> for CoordinatedTurn2D<T> {
    fn transition(&self, dt: T, state: &StateVector<T, 5>) -> StateVector<T, 5> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let x = *state.index(0);
        let y = *state.index(1);
        let vx = *state.index(2);
        let vy = *state.index(3);
        let omega = *state.index(4);

        let omega_dt = omega * dt;
        let eps = T::from_f64(1e-10).unwrap();

        if Float::abs(omega) < eps {
            // Nearly zero turn rate - constant velocity
            StateVector::from_array([x + vx * dt, y + vy * dt, vx, vy, omega])
        } else {
            let sin_omega_dt = Float::sin(omega_dt);
            let cos_omega_dt = Float::cos(omega_dt);
            let one_minus_cos = T::one() - cos_omega_dt;

            let x_new = x + (vx * sin_omega_dt + vy * one_minus_cos) / omega;
            let y_new = y + (vx * one_minus_cos + vy * sin_omega_dt) / omega;

            let vx_new = vx * cos_omega_dt - vy * sin_omega_dt;
            let vy_new = vx * sin_omega_dt + vy * cos_omega_dt;

            StateVector::from_array([x_new, y_new, vx_new, vy_new, omega])
        }
    }

    fn transition_jacobian(&self, dt: T, state: &StateVector<T, 5>) -> TransitionMatrix<T, 5> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let vx = *state.index(2);
        let vy = *state.index(3);
        let omega = *state.index(4);

        let omega_dt = omega * dt;
        let eps = T::from_f64(1e-10).unwrap();
        let one = T::one();
        let zero = T::zero();

        if Float::abs(omega) < eps {
            // Linearization at zero turn rate
            TransitionMatrix::from_matrix(nalgebra::matrix![
                one, zero, dt, zero, zero;
                zero, one, zero, dt, zero;
                zero, zero, one, zero, zero;
                zero, zero, zero, one, zero;
                zero, zero, zero, zero, one
            ])
        } else {
            let sin_omega_dt = Float::sin(omega_dt);
            let cos_omega_dt = Float::cos(omega_dt);
            let one_minus_cos = one - cos_omega_dt;
            let omega_sq = omega * omega;

            let dx_dvx = sin_omega_dt / omega;
            let dx_dvy = one_minus_cos / omega;
            let dy_dvx = one_minus_cos / omega;
            let dy_dvy = sin_omega_dt / omega;

            // Quotient rule for the omega partials of the position rows
            let dx_domega = (vx * (omega_dt * cos_omega_dt - sin_omega_dt)
                + vy * (omega_dt * sin_omega_dt - one_minus_cos))
                / omega_sq;
            let dy_domega = (vx * (omega_dt * sin_omega_dt - one_minus_cos)
                + vy * (omega_dt * cos_omega_dt - sin_omega_dt))
                / omega_sq;

            let dvx_domega = -vx * dt * sin_omega_dt - vy * dt * cos_omega_dt;
            let dvy_domega = vx * dt * cos_omega_dt - vy * dt * sin_omega_dt;

            TransitionMatrix::from_matrix(nalgebra::matrix![
                one, zero, dx_dvx, dx_dvy, dx_domega;
                zero, one, dy_dvx, dy_dvy, dy_domega;
                zero, zero, cos_omega_dt, -sin_omega_dt, dvx_domega;
                zero, zero, sin_omega_dt, cos_omega_dt, dvy_domega;
                zero, zero, zero, zero, one
            ])
        }
    }

    fn process_noise(&self, dt: T) -> StateCovariance<T, 5> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let two = T::from_f64(2.0).unwrap();
        let four = T::from_f64(4.0).unwrap();

        let sigma_a_sq = self.sigma_a * self.sigma_a;
        let sigma_omega_sq = self.sigma_omega * self.sigma_omega;
        let zero = T::zero();

        let q11 = dt4 / four * sigma_a_sq;
        let q13 = dt3 / two * sigma_a_sq;
        let q33 = dt2 * sigma_a_sq;

        let q55 = dt2 * sigma_omega_sq;

        StateCovariance::from_matrix(nalgebra::matrix![
            q11, zero, q13, zero, zero;
            zero, q11, zero, q13, zero;
            q13, zero, q33, zero, zero;
            zero, q13, zero, q33, zero;
            zero, zero, zero, zero, q55
        ])
    }

    fn survival_probability(&self, _state: &StateVector<T, 5>) -> T {
        self.p_survival
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_velocity_transition() {
        let model = ConstantVelocity2D::new(1.0_f64, 0.99);
        let state = StateVector::from_array([0.0, 0.0, 1.0, 2.0]);

        let next = model.transition(1.0, &state);
        assert!((next.index(0) - 1.0).abs() < 1e-10);
        assert!((next.index(1) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_survival_probability() {
        let model = ConstantVelocity2D::new(1.0_f64, 0.95);
        let state = StateVector::from_array([0.0, 0.0, 1.0, 2.0]);

        assert!((model.survival_probability(&state) - 0.95).abs() < 1e-10);
    }

    #[test]
    fn test_coordinated_turn_straight() {
        // With zero turn rate, behaves like constant velocity
        let model = CoordinatedTurn2D::new(1.0_f64, 0.1, 0.99);
        let state = StateVector::from_array([0.0, 0.0, 10.0, 0.0, 0.0]);

        let predicted = model.transition(1.0, &state);

        assert!((predicted.index(0) - 10.0).abs() < 1e-10);
        assert!((predicted.index(1) - 0.0).abs() < 1e-10);
        assert!((predicted.index(2) - 10.0).abs() < 1e-10);
        assert!((predicted.index(3) - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_coordinated_turn_quarter_circle() {
        use std::f64::consts::FRAC_PI_2;

        let model = CoordinatedTurn2D::new(1.0_f64, 0.1, 0.99);
        // Moving east at 10 m/s, turning left at pi/2 rad/s
        let state = StateVector::from_array([0.0, 0.0, 10.0, 0.0, FRAC_PI_2]);

        let predicted = model.transition(1.0, &state);

        // Turn radius r = v/omega; after 90 degrees the target sits at (r, r)
        // with its velocity rotated to point north.
        let r = 10.0 / FRAC_PI_2;
        assert!((predicted.index(0) - r).abs() < 1e-6);
        assert!((predicted.index(1) - r).abs() < 1e-6);
        assert!((predicted.index(2) - 0.0).abs() < 1e-6);
        assert!((predicted.index(3) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_coordinated_turn_jacobian_vs_numerical() {
        use std::f64::consts::FRAC_PI_4;

        let model = CoordinatedTurn2D::new(1.0_f64, 0.1, 0.99);
        let state = StateVector::from_array([5.0, 3.0, 8.0, 4.0, FRAC_PI_4]);
        let dt = 0.5;

        let jacobian = model.transition_jacobian(dt, &state);

        let eps = 1e-6;
        for col in 0..5 {
            let mut plus = [5.0, 3.0, 8.0, 4.0, FRAC_PI_4];
            let mut minus = plus;
            plus[col] += eps;
            minus[col] -= eps;

            let f_plus = model.transition(dt, &StateVector::from_array(plus));
            let f_minus = model.transition(dt, &StateVector::from_array(minus));

            for row in 0..5 {
                let numerical = (f_plus.index(row) - f_minus.index(row)) / (2.0 * eps);
                let analytical = jacobian.as_matrix()[(row, col)];
                assert!(
                    (numerical - analytical).abs() < 1e-4,
                    "d{}/d{}: numerical {} vs analytical {}",
                    row,
                    col,
                    numerical,
                    analytical
                );
            }
        }
    }
}
