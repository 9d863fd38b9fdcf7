//! Multi-target tracker
//!
//! The coordinator-owned track set, its lifecycle management, and the
//! validated configuration surface.

mod config;
mod coordinator;
mod lifecycle;
mod track;

pub use config::{JipdaConfig, JipdaConfigBuilder};
pub use coordinator::{CycleReport, JipdaTracker};
pub use lifecycle::{association_likelihood_ratio, existence_posterior, SearchHypothesis};
pub use track::{Track, TrackSummary};
