//! JIPDA: Joint Probabilistic Data Association tracking for Rust
//!
//! A type-safe multi-target tracker that resolves ambiguous measurement-to-track
//! assignment by weighting all feasible joint association events instead of
//! committing to a single best assignment.
//!
//! # Features
//!
//! - **Interchangeable estimators**: linear Kalman, extended (Jacobian) and
//!   augmented-state unscented variants behind one predict/update/smooth contract
//! - **Joint data association**: statistical gating, measurement-sharing cluster
//!   formation, and exact joint-hypothesis marginalization
//! - **Track lifecycle**: existence probabilities with search-track promotion
//!   and existence-decay retirement
//! - **Type Safety**: vector spaces and dimensions encoded in the type system
//! - **no_std Support**: core estimator types work without the standard library

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod types;
pub mod models;
pub mod filters;
#[cfg(feature = "alloc")]
pub mod association;
#[cfg(feature = "alloc")]
pub mod tracker;

pub mod prelude {
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::types::labels::*;
    pub use crate::models::*;
    pub use crate::filters::{Estimate, EstimatorKind, Prediction, UkfParams};
    #[cfg(feature = "alloc")]
    pub use crate::association::ExactEnumeration;
    #[cfg(feature = "alloc")]
    pub use crate::tracker::{JipdaConfig, JipdaConfigBuilder, JipdaTracker};
}

/// Error types for the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JipdaError {
    /// An innovation or predicted covariance could not be inverted
    SingularMatrix,
    /// A covariance lost positive definiteness beyond what projection can repair
    NumericalInstability,
    /// An operation that needs measurement history was given none
    MissingMeasurement,
    /// A required configuration field was not supplied (names the field)
    InvalidConfiguration(&'static str),
    /// A cluster referenced a measurement index outside the current scan
    AssociationInconsistency {
        /// Index of the offending measurement reference
        measurement: usize,
    },
    /// No active track carries the requested label
    UnknownTrack,
}

#[cfg(feature = "std")]
impl std::error::Error for JipdaError {}

impl ::core::fmt::Display for JipdaError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            JipdaError::SingularMatrix => write!(f, "Matrix is singular"),
            JipdaError::NumericalInstability => {
                write!(f, "Covariance is not recoverably positive definite")
            }
            JipdaError::MissingMeasurement => write!(f, "No measurement history available"),
            JipdaError::InvalidConfiguration(field) => {
                write!(f, "Missing or invalid configuration field: {}", field)
            }
            JipdaError::AssociationInconsistency { measurement } => {
                write!(
                    f,
                    "Cluster references unknown measurement index {}",
                    measurement
                )
            }
            JipdaError::UnknownTrack => write!(f, "No active track with the given label"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, JipdaError>;
