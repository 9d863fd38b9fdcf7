//! State estimators
//!
//! One predict/update/smooth contract over three interchangeable variants:
//!
//! - [`EstimatorKind::Linear`]: standard linear Kalman filter
//! - [`EstimatorKind::ExtendedJacobian`]: extended Kalman filter via analytic
//!   Jacobians
//! - [`EstimatorKind::Unscented`]: augmented-state sigma-point filter

pub mod estimator;
pub mod unscented;
#[cfg(feature = "alloc")]
pub mod smoother;

pub use estimator::{Estimate, EstimatorKind, Prediction};
pub use unscented::UkfParams;
#[cfg(feature = "alloc")]
pub use smoother::{FilteredStep, SmoothedEstimate};
