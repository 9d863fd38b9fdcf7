//! Model providers for target dynamics and sensors
//!
//! The traits here are the only contract the estimators and the association
//! engine see: closed-form transition/observation functions with their noise
//! covariances, pure and deterministic given their inputs.

use nalgebra::RealField;

use crate::types::spaces::{Measurement, MeasurementCovariance, StateCovariance, StateVector};
use crate::types::transforms::{ObservationMatrix, TransitionMatrix};

mod dynamics;
mod sensors;

pub use dynamics::*;
pub use sensors::*;

/// Trait for target dynamics.
///
/// Describes how a target state evolves over an interval `dt`:
/// x_{k+1} = f(dt, x_k) + w, with w zero-mean Gaussian with covariance Q(dt).
///
/// Linear models implement `transition` as F(dt) * x and return F(dt) from
/// `transition_jacobian` independent of the state; nonlinear models linearize
/// at the supplied state.
pub trait DynamicModel<T: RealField, const N: usize> {
    /// Propagates a state through the dynamics over `dt`.
    fn transition(&self, dt: T, state: &StateVector<T, N>) -> StateVector<T, N>;

    /// Jacobian of the transition function at `state`.
    fn transition_jacobian(&self, dt: T, state: &StateVector<T, N>) -> TransitionMatrix<T, N>;

    /// Process noise covariance accumulated over `dt`.
    fn process_noise(&self, dt: T) -> StateCovariance<T, N>;

    /// Probability that a target survives from one cycle to the next.
    ///
    /// May depend on the state (e.g., targets leaving the surveillance
    /// region). Drives the existence-probability prediction.
    fn survival_probability(&self, state: &StateVector<T, N>) -> T;
}

/// Trait for sensors.
///
/// Describes the measurement process z = h(x) + v, with v zero-mean Gaussian
/// with covariance R.
pub trait SensorModel<T: RealField, const N: usize, const M: usize> {
    /// Maps a state to the noise-free measurement it would produce.
    fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, M>;

    /// Jacobian of the observation function at `state`.
    fn observation_jacobian(&self, state: &StateVector<T, N>) -> ObservationMatrix<T, M, N>;

    /// Measurement noise covariance.
    fn observation_noise(&self) -> MeasurementCovariance<T, M>;
}
