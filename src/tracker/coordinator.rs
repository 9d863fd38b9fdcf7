//! Multi-track coordinator
//!
//! Orchestrates one discrete cycle: retire dead tracks, predict everything,
//! gate, cluster, resolve association weights, apply the weighted updates,
//! and run the search-track lifecycle. Each phase completes before the next
//! reads its artifacts, so per-track work never observes a half-built
//! validation matrix or weight set.

use nalgebra::RealField;
use num_traits::Float;

use alloc::vec::Vec;

use crate::association::{
    form_clusters, gate_measurements, resolve_cluster, AssociationWeights, HypothesisResolver,
    ValidationMatrix,
};
use crate::filters::{Estimate, EstimatorKind, Prediction, SmoothedEstimate};
use crate::models::{DynamicModel, SensorModel};
use crate::types::labels::{Label, LabelGenerator};
use crate::types::spaces::Measurement;
use crate::{JipdaError, Result};

use super::config::JipdaConfig;
use super::lifecycle::{
    association_likelihood_ratio, existence_posterior, SearchHypothesis,
};
use super::track::{Track, TrackSummary};

// ============================================================================
// Cycle Report
// ============================================================================

/// Diagnostics surface of one cycle.
///
/// Everything a visualization or logging collaborator needs: the surviving
/// tracks with their posteriors, the validation matrix and association
/// weights that produced them, and the lifecycle events of the cycle.
#[derive(Debug, Clone)]
pub struct CycleReport<T: RealField, const N: usize> {
    /// Cycle counter
    pub time_step: u32,
    /// The cycle's validation matrix
    pub validation: ValidationMatrix,
    /// The cycle's association weights (rows follow the pre-update track
    /// order)
    pub weights: AssociationWeights<T>,
    /// Estimated false-alarm/new-target intensity
    pub clutter_intensity: T,
    /// Post-update snapshots of the active tracks
    pub tracks: Vec<TrackSummary<T, N>>,
    /// Existence probability of the search hypothesis after the cycle
    pub search_existence: T,
    /// Labels promoted from the search hypothesis this cycle
    pub promoted: Vec<Label>,
    /// Labels retired at the start of this cycle
    pub retired: Vec<Label>,
    /// Indices of clusters whose resolution was skipped as inconsistent
    pub skipped_clusters: Vec<usize>,
}

// ============================================================================
// Tracker
// ============================================================================

/// The JPDA multi-target tracker.
///
/// Owns the active track set, the search hypothesis, and the configuration;
/// generic over the model providers, the hypothesis resolver, and the state
/// and measurement dimensions.
#[derive(Debug, Clone)]
pub struct JipdaTracker<T, Dyn, Sen, R, const N: usize, const M: usize>
where
    T: RealField,
{
    config: JipdaConfig<T, N>,
    estimator: EstimatorKind<T>,
    dynamics: Dyn,
    sensor: Sen,
    resolver: R,
    tracks: Vec<Track<T, Dyn, Sen, N, M>>,
    search: SearchHypothesis<T, Dyn, Sen, N, M>,
    labels: LabelGenerator,
}

impl<T, Dyn, Sen, R, const N: usize, const M: usize> JipdaTracker<T, Dyn, Sen, R, N, M>
where
    T: RealField + Float + Copy,
    Dyn: DynamicModel<T, N> + Clone,
    Sen: SensorModel<T, N, M> + Clone,
    R: HypothesisResolver<T>,
{
    /// Creates a tracker with no confirmed tracks.
    ///
    /// The model providers serve as prototypes: the search hypothesis and
    /// every promoted track get their own clones.
    pub fn new(
        config: JipdaConfig<T, N>,
        estimator: EstimatorKind<T>,
        dynamics: Dyn,
        sensor: Sen,
        resolver: R,
    ) -> Self {
        let search = SearchHypothesis::new(
            config.search_prior.clone(),
            config.search_seed_existence,
            dynamics.clone(),
            sensor.clone(),
        );
        Self {
            config,
            estimator,
            dynamics,
            sensor,
            resolver,
            tracks: Vec::new(),
            search,
            labels: LabelGenerator::new(),
        }
    }

    /// Seeds a confirmed track directly, bypassing the search lifecycle.
    pub fn spawn_track(&mut self, estimate: Estimate<T, N>, existence: T) -> Label {
        let label = self.labels.next_label();
        self.tracks.push(Track::new(
            label,
            existence,
            estimate,
            self.dynamics.clone(),
            self.sensor.clone(),
        ));
        label
    }

    /// Returns the active track set.
    #[inline]
    pub fn tracks(&self) -> &[Track<T, Dyn, Sen, N, M>] {
        &self.tracks
    }

    /// Returns the track carrying `label`, if it is still active.
    pub fn track(&self, label: Label) -> Option<&Track<T, Dyn, Sen, N, M>> {
        self.tracks.iter().find(|t| t.label == label)
    }

    /// Returns the search hypothesis' current existence probability.
    #[inline]
    pub fn search_existence(&self) -> T {
        self.search.existence
    }

    /// Smooths the full filtered history of one track.
    ///
    /// # Errors
    /// [`JipdaError::UnknownTrack`] if no active track carries `label`.
    pub fn smoothed_trajectory(&self, label: Label) -> Result<Vec<SmoothedEstimate<T, N>>> {
        let track = self.track(label).ok_or(JipdaError::UnknownTrack)?;
        self.estimator.smooth(track.history(), &track.dynamics)
    }

    /// Processes one measurement scan.
    ///
    /// The cycle runs to completion before returning: predict all tracks →
    /// gate → cluster → associate → weighted update → lifecycle. A cluster
    /// that references an unknown measurement is logged and skipped (its
    /// tracks fall back to the miss update); everything else proceeds.
    pub fn step(&mut self, dt: T, measurements: &[Measurement<T, M>]) -> Result<CycleReport<T, N>> {
        self.labels.advance_time();

        // Tracks flagged below the death threshold leave at the start of the
        // next cycle
        let death = self.config.death_threshold;
        let retired: Vec<Label> = self
            .tracks
            .iter()
            .filter(|t| t.existence < death)
            .map(|t| t.label)
            .collect();
        for label in &retired {
            log::info!("retiring track {} below existence threshold", label);
        }
        self.tracks.retain(|t| t.existence >= death);

        if self.tracks.is_empty() {
            log::debug!("no active tracks this cycle");
        }
        if measurements.is_empty() {
            log::debug!("no measurements this cycle");
        }

        // Predict phase
        for track in &mut self.tracks {
            track.predict(&self.estimator, dt)?;
        }
        self.search.predict(&self.estimator, dt)?;

        let mut predictions: Vec<Prediction<T, N, M>> = Vec::with_capacity(self.tracks.len());
        for track in &self.tracks {
            predictions.push(
                track
                    .prediction()
                    .ok_or(JipdaError::MissingMeasurement)?
                    .clone(),
            );
        }

        // Gate, cluster, associate
        let gating = gate_measurements(&predictions, measurements, self.config.gate_threshold)?;
        let clusters = form_clusters(&gating.validation, self.config.joint_association);

        let mut weights = AssociationWeights::all_miss(self.tracks.len(), measurements.len());
        let mut skipped_clusters = Vec::new();
        for (idx, cluster) in clusters.iter().enumerate() {
            match resolve_cluster(
                cluster,
                &gating,
                measurements.len(),
                self.config.prob_detection,
                self.config.prob_gating,
                &self.resolver,
            ) {
                Ok(rows) => {
                    for (track_idx, row) in rows {
                        weights.set_track(track_idx, row);
                    }
                }
                Err(JipdaError::AssociationInconsistency { measurement }) => {
                    log::error!(
                        "skipping association for cluster {}: unknown measurement index {}",
                        idx,
                        measurement
                    );
                    skipped_clusters.push(idx);
                }
                Err(e) => return Err(e),
            }
        }

        // Weighted update and existence posterior per track
        let pd_pg = self.config.prob_detection * self.config.prob_gating;
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.apply_weighted_update(&self.estimator, measurements, weights.track(i), dt)?;

            let gated_sum = gating.likelihoods[i]
                .iter()
                .fold(T::zero(), |acc, &g| acc + g);
            let ratio =
                association_likelihood_ratio(pd_pg, gated_sum, gating.clutter_intensity);
            track.existence = existence_posterior(track.existence, ratio);
        }

        // Search lifecycle over the unclaimed measurements
        let unassociated = SearchHypothesis::<T, Dyn, Sen, N, M>::unassociated_measurements(
            &gating.validation,
            measurements,
        );
        self.search.observe(
            &self.estimator,
            &unassociated,
            self.config.gate_threshold,
            pd_pg,
            gating.clutter_intensity,
        )?;

        let mut promoted = Vec::new();
        if let Some(track) = self
            .search
            .try_promote(self.config.birth_threshold, &mut self.labels)
        {
            log::info!("promoting search hypothesis to track {}", track.label);
            promoted.push(track.label);
            self.tracks.push(track);
        }

        Ok(CycleReport {
            time_step: self.labels.current_time(),
            validation: gating.validation,
            weights,
            clutter_intensity: gating.clutter_intensity,
            tracks: self.tracks.iter().map(|t| t.summary()).collect(),
            search_existence: self.search.existence,
            promoted,
            retired,
            skipped_clusters,
        })
    }
}
