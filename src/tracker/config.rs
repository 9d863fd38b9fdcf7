//! Tracker configuration
//!
//! The association parameters directly control the detection/false-alarm
//! tradeoff, so the required ones are never silently defaulted: the builder
//! refuses to produce a config until every one of them is supplied.

use nalgebra::RealField;
use num_traits::Float;

use crate::filters::{Estimate, UkfParams};
use crate::{JipdaError, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Validated tracker configuration.
///
/// Construct through [`JipdaConfigBuilder`].
#[derive(Debug, Clone)]
pub struct JipdaConfig<T: RealField, const N: usize> {
    /// χ² gate threshold on the squared Mahalanobis distance
    pub gate_threshold: T,
    /// Probability of detection (PD)
    pub prob_detection: T,
    /// Probability that a true detection falls inside the gate (PG)
    pub prob_gating: T,
    /// Existence probability above which the search hypothesis becomes a
    /// confirmed track
    pub birth_threshold: T,
    /// Existence probability below which a confirmed track is retired
    pub death_threshold: T,
    /// Reseed distribution of the search hypothesis (uniform-over-region
    /// moment match or any other diffuse prior)
    pub search_prior: Estimate<T, N>,
    /// Existence probability assigned to a freshly (re)seeded search
    /// hypothesis
    pub search_seed_existence: T,
    /// Whether tracks sharing measurements are resolved jointly (false
    /// selects plain per-track PDAF clustering)
    pub joint_association: bool,
    /// Scaling parameters for the unscented estimator variant
    pub ukf: UkfParams<T>,
}

/// Builder for [`JipdaConfig`].
///
/// Gate threshold, detection and gating probabilities, and the birth/death
/// thresholds are required; `build` fails naming the first missing or invalid
/// field. Optional fields fall back to logged defaults.
#[derive(Debug, Clone)]
pub struct JipdaConfigBuilder<T: RealField, const N: usize> {
    gate_threshold: Option<T>,
    prob_detection: Option<T>,
    prob_gating: Option<T>,
    birth_threshold: Option<T>,
    death_threshold: Option<T>,
    search_prior: Option<Estimate<T, N>>,
    search_seed_existence: Option<T>,
    joint_association: bool,
    ukf: Option<UkfParams<T>>,
}

impl<T: RealField + Float + Copy, const N: usize> Default for JipdaConfigBuilder<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Float + Copy, const N: usize> JipdaConfigBuilder<T, N> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            gate_threshold: None,
            prob_detection: None,
            prob_gating: None,
            birth_threshold: None,
            death_threshold: None,
            search_prior: None,
            search_seed_existence: None,
            joint_association: true,
            ukf: None,
        }
    }

    /// Sets the χ² gate threshold.
    pub fn gate_threshold(mut self, value: T) -> Self {
        self.gate_threshold = Some(value);
        self
    }

    /// Sets the probability of detection.
    pub fn prob_detection(mut self, value: T) -> Self {
        self.prob_detection = Some(value);
        self
    }

    /// Sets the probability of gating.
    pub fn prob_gating(mut self, value: T) -> Self {
        self.prob_gating = Some(value);
        self
    }

    /// Sets the promotion threshold for the search hypothesis.
    pub fn birth_threshold(mut self, value: T) -> Self {
        self.birth_threshold = Some(value);
        self
    }

    /// Sets the retirement threshold for confirmed tracks.
    pub fn death_threshold(mut self, value: T) -> Self {
        self.death_threshold = Some(value);
        self
    }

    /// Sets the reseed prior of the search hypothesis.
    pub fn search_prior(mut self, value: Estimate<T, N>) -> Self {
        self.search_prior = Some(value);
        self
    }

    /// Sets the existence probability of a freshly seeded search hypothesis.
    pub fn search_seed_existence(mut self, value: T) -> Self {
        self.search_seed_existence = Some(value);
        self
    }

    /// Selects joint or per-track (PDAF) association.
    pub fn joint_association(mut self, value: bool) -> Self {
        self.joint_association = value;
        self
    }

    /// Sets the unscented scaling parameters.
    pub fn ukf_params(mut self, value: UkfParams<T>) -> Self {
        self.ukf = Some(value);
        self
    }

    /// Validates and produces the configuration.
    ///
    /// # Errors
    /// [`JipdaError::InvalidConfiguration`] naming the first missing or
    /// out-of-range field.
    pub fn build(self) -> Result<JipdaConfig<T, N>> {
        let zero = T::zero();
        let one = T::one();

        let gate_threshold = self
            .gate_threshold
            .ok_or(JipdaError::InvalidConfiguration("gate_threshold"))?;
        if gate_threshold <= zero {
            return Err(JipdaError::InvalidConfiguration("gate_threshold"));
        }

        let prob_detection = self
            .prob_detection
            .ok_or(JipdaError::InvalidConfiguration("prob_detection"))?;
        if prob_detection <= zero || prob_detection > one {
            return Err(JipdaError::InvalidConfiguration("prob_detection"));
        }

        let prob_gating = self
            .prob_gating
            .ok_or(JipdaError::InvalidConfiguration("prob_gating"))?;
        if prob_gating <= zero || prob_gating > one {
            return Err(JipdaError::InvalidConfiguration("prob_gating"));
        }

        let birth_threshold = self
            .birth_threshold
            .ok_or(JipdaError::InvalidConfiguration("birth_threshold"))?;
        if birth_threshold <= zero || birth_threshold >= one {
            return Err(JipdaError::InvalidConfiguration("birth_threshold"));
        }

        let death_threshold = self
            .death_threshold
            .ok_or(JipdaError::InvalidConfiguration("death_threshold"))?;
        if death_threshold < zero || death_threshold >= birth_threshold {
            return Err(JipdaError::InvalidConfiguration("death_threshold"));
        }

        let search_prior = self
            .search_prior
            .ok_or(JipdaError::InvalidConfiguration("search_prior"))?;

        let search_seed_existence = self
            .search_seed_existence
            .unwrap_or_else(|| T::from_f64(0.05).unwrap());
        if search_seed_existence <= zero || search_seed_existence >= birth_threshold {
            return Err(JipdaError::InvalidConfiguration("search_seed_existence"));
        }

        let ukf = self.ukf.unwrap_or_else(|| {
            log::info!("unscented scaling parameters not supplied; using defaults");
            UkfParams::default()
        });

        Ok(JipdaConfig {
            gate_threshold,
            prob_detection,
            prob_gating,
            birth_threshold,
            death_threshold,
            search_prior,
            search_seed_existence,
            joint_association: self.joint_association,
            ukf,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
