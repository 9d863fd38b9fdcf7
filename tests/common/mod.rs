//! Common test helpers for tracker integration tests

#![allow(dead_code)]

use jipda::prelude::*;

/// Creates a measurement at the given position
pub fn make_measurement(x: f64, y: f64) -> Measurement<f64, 2> {
    Measurement::from_array([x, y])
}

/// Creates the standard constant-velocity / position-sensor model pair
pub fn make_models() -> (ConstantVelocity2D<f64>, PositionSensor2D<f64>) {
    let dynamics = ConstantVelocity2D::new(0.5, 0.99);
    let sensor = PositionSensor2D::new(2.0);
    (dynamics, sensor)
}

/// Diffuse search prior over a [0, 200] x [0, 200] region
pub fn make_search_prior() -> Estimate<f64, 4> {
    Estimate::with_diagonal_covariance(
        StateVector::from_array([100.0, 100.0, 0.0, 0.0]),
        &nalgebra::vector![3400.0, 3400.0, 100.0, 100.0],
    )
}

/// Complete configuration with the conventional thresholds
pub fn make_config() -> JipdaConfig<f64, 4> {
    JipdaConfigBuilder::new()
        .gate_threshold(9.21) // chi-squared 99% quantile, 2 dof
        .prob_detection(0.9)
        .prob_gating(0.99)
        .birth_threshold(0.9)
        .death_threshold(0.1)
        .search_prior(make_search_prior())
        .build()
        .expect("complete test configuration")
}

/// Tracker over the standard models with exact hypothesis enumeration
pub fn make_tracker(
) -> JipdaTracker<f64, ConstantVelocity2D<f64>, PositionSensor2D<f64>, ExactEnumeration, 4, 2> {
    let (dynamics, sensor) = make_models();
    JipdaTracker::new(
        make_config(),
        EstimatorKind::Linear,
        dynamics,
        sensor,
        ExactEnumeration::new(),
    )
}

/// Seeds a confirmed track at a position with a moderate covariance
pub fn seed_track<R>(
    tracker: &mut JipdaTracker<f64, ConstantVelocity2D<f64>, PositionSensor2D<f64>, R, 4, 2>,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
) -> Label
where
    R: jipda::association::HypothesisResolver<f64>,
{
    tracker.spawn_track(
        Estimate::with_diagonal_covariance(
            StateVector::from_array([x, y, vx, vy]),
            &nalgebra::vector![4.0, 4.0, 1.0, 1.0],
        ),
        0.95,
    )
}
