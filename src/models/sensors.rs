//! Sensor models
//!
//! Concrete [`SensorModel`] implementations. Both sensors observe the
//! planar position components and are generic over the state dimension, so
//! they pair with any dynamic model whose first two components are [x, y].

use nalgebra::{RealField, SMatrix};
use num_traits::Float;

use super::SensorModel;
use crate::types::spaces::{Measurement, MeasurementCovariance, StateVector};
use crate::types::transforms::ObservationMatrix;

// ============================================================================
// Position Sensor (linear)
// ============================================================================

/// Position-only sensor in 2D.
///
/// Observes [x, y] from any state whose first two components are position.
#[derive(Debug, Clone)]
pub struct PositionSensor2D<T: RealField> {
    /// Position measurement noise standard deviation
    pub sigma_pos: T,
}

impl<T: RealField + Float + Copy> PositionSensor2D<T> {
    /// Creates a new position sensor.
    ///
    /// # Arguments
    /// - `sigma_pos`: Position measurement noise standard deviation (must be > 0)
    ///
    /// # Panics
    /// Panics if `sigma_pos <= 0`.
    pub fn new(sigma_pos: T) -> Self {
        assert!(
            sigma_pos > T::zero(),
            "Measurement noise sigma_pos must be positive"
        );
        Self { sigma_pos }
    }
}

impl<T: RealField + Float + Copy, const N: usize> SensorModel<T, N, 2> for PositionSensor2D<T> {
    fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, 2> {
        Measurement::from_array([*state.index(0), *state.index(1)])
    }

    fn observation_jacobian(&self, _state: &StateVector<T, N>) -> ObservationMatrix<T, 2, N> {
        let mut h: SMatrix<T, 2, N> = SMatrix::zeros();
        h[(0, 0)] = T::one();
        h[(1, 1)] = T::one();
        ObservationMatrix::from_matrix(h)
    }

    fn observation_noise(&self) -> MeasurementCovariance<T, 2> {
        let sigma_sq = self.sigma_pos * self.sigma_pos;
        let zero = T::zero();

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            sigma_sq, zero;
            zero, sigma_sq
        ])
    }
}

// ============================================================================
// Range-Bearing Sensor (nonlinear)
// ============================================================================

/// Range-bearing sensor (radar-like).
///
/// Observes [range, bearing] of the target position relative to the sensor
/// location. The observation function is nonlinear, so this sensor needs the
/// extended or unscented estimator variant.
#[derive(Debug, Clone)]
pub struct RangeBearingSensor2D<T: RealField> {
    /// Range measurement noise standard deviation
    pub sigma_range: T,
    /// Bearing measurement noise standard deviation (radians)
    pub sigma_bearing: T,
    /// Sensor position x
    pub sensor_x: T,
    /// Sensor position y
    pub sensor_y: T,
}

impl<T: RealField + Float + Copy> RangeBearingSensor2D<T> {
    /// Creates a new range-bearing sensor at the origin.
    ///
    /// # Arguments
    /// - `sigma_range`: Range noise standard deviation (must be > 0)
    /// - `sigma_bearing`: Bearing noise standard deviation in radians (must be > 0)
    ///
    /// # Panics
    /// Panics if a noise parameter is non-positive.
    pub fn new(sigma_range: T, sigma_bearing: T) -> Self {
        Self::at_position(sigma_range, sigma_bearing, T::zero(), T::zero())
    }

    /// Creates a sensor at a specific position.
    ///
    /// # Panics
    /// Panics if a noise parameter is non-positive.
    pub fn at_position(sigma_range: T, sigma_bearing: T, sensor_x: T, sensor_y: T) -> Self {
        assert!(
            sigma_range > T::zero(),
            "Range noise sigma_range must be positive"
        );
        assert!(
            sigma_bearing > T::zero(),
            "Bearing noise sigma_bearing must be positive"
        );
        Self {
            sigma_range,
            sigma_bearing,
            sensor_x,
            sensor_y,
        }
    }
}

impl<T: RealField + Float + Copy, const N: usize> SensorModel<T, N, 2> for RangeBearingSensor2D<T> {
    fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, 2> {
        let dx = *state.index(0) - self.sensor_x;
        let dy = *state.index(1) - self.sensor_y;

        let range = Float::sqrt(dx * dx + dy * dy);
        let bearing = Float::atan2(dy, dx);

        Measurement::from_array([range, bearing])
    }

    fn observation_jacobian(&self, state: &StateVector<T, N>) -> ObservationMatrix<T, 2, N> {
        let dx = *state.index(0) - self.sensor_x;
        let dy = *state.index(1) - self.sensor_y;

        let r_sq = dx * dx + dy * dy;
        let r = Float::sqrt(r_sq);

        let mut h: SMatrix<T, 2, N> = SMatrix::zeros();
        if r < T::from_f64(1e-10).unwrap() {
            // Target at the sensor position: the Jacobian is undefined there,
            // fall back to zero so the gain contributes nothing.
            return ObservationMatrix::from_matrix(h);
        }

        // d_range/d[x, y] = [dx/r, dy/r]
        // d_bearing/d[x, y] = [-dy/r^2, dx/r^2]
        h[(0, 0)] = dx / r;
        h[(0, 1)] = dy / r;
        h[(1, 0)] = -dy / r_sq;
        h[(1, 1)] = dx / r_sq;
        ObservationMatrix::from_matrix(h)
    }

    fn observation_noise(&self) -> MeasurementCovariance<T, 2> {
        let zero = T::zero();
        let sigma_r_sq = self.sigma_range * self.sigma_range;
        let sigma_b_sq = self.sigma_bearing * self.sigma_bearing;

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            sigma_r_sq, zero;
            zero, sigma_b_sq
        ])
    }
}
