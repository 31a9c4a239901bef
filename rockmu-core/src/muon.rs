//! Muon reconstruction from a single event's active-volume hits.

use crate::error::ExtractionError;
use crate::event::Event;
use crate::geometry::{Face, FaceClassifier, FrameTransform, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default name of the active-volume detector region.
pub const ACTIVE_REGION: &str = "ArgonCube";

/// PDG code of the muon (the antimuon is its negative).
pub const MUON_PDG: i32 = 13;

/// A muon crossing the active volume, in local-frame coordinates (cm).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Muon {
    /// Start of the first muon deposit.
    pub entry: Point3,
    /// End of the last muon deposit seen so far.
    pub exit: Point3,
    /// Face the muon entered through; `None` when the policy leaves it unclassified.
    pub entry_face: Option<Face>,
}

impl Muon {
    /// Track length between entry and exit (cm).
    #[must_use]
    pub fn length(&self) -> f64 {
        let d = self.exit - self.entry;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }
}

/// Per-event reconstruction state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MuonTrack {
    /// No muon deposit seen yet.
    #[default]
    NoMuon,
    /// At least one muon deposit seen.
    Found(Muon),
}

impl MuonTrack {
    /// Advances the state with one muon deposit spanning `start..stop`.
    ///
    /// The first deposit fixes the entry point and face; later deposits only
    /// move the exit point.
    #[must_use]
    pub fn advance(self, start: Point3, stop: Point3, classifier: &FaceClassifier) -> Self {
        match self {
            MuonTrack::NoMuon => MuonTrack::Found(Muon {
                entry: start,
                exit: stop,
                entry_face: classifier.classify(start),
            }),
            MuonTrack::Found(muon) => MuonTrack::Found(Muon { exit: stop, ..muon }),
        }
    }

    /// Terminal value at end of event.
    #[must_use]
    pub fn finish(self) -> Option<Muon> {
        match self {
            MuonTrack::NoMuon => None,
            MuonTrack::Found(muon) => Some(muon),
        }
    }
}

/// Configuration for muon extraction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractionConfig {
    /// Detector region whose hits are eligible.
    pub active_region: String,
    /// Treat an event without the active region as malformed.
    pub require_region: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            active_region: ACTIVE_REGION.to_string(),
            require_region: true,
        }
    }
}

impl ExtractionConfig {
    /// Sets the active region name.
    #[must_use]
    pub fn with_active_region(mut self, region: impl Into<String>) -> Self {
        self.active_region = region.into();
        self
    }

    /// Sets whether a missing active region is an error.
    #[must_use]
    pub fn with_require_region(mut self, require: bool) -> Self {
        self.require_region = require;
        self
    }
}

/// Finds the muon, if any, that deposited energy in the active volume.
#[derive(Debug, Clone, Default)]
pub struct MuonExtractor {
    config: ExtractionConfig,
    transform: FrameTransform,
    classifier: FaceClassifier,
}

impl MuonExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(config: ExtractionConfig, transform: FrameTransform, classifier: FaceClassifier) -> Self {
        Self {
            config,
            transform,
            classifier,
        }
    }

    /// Returns the extraction configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Returns the face classifier.
    #[must_use]
    pub fn classifier(&self) -> &FaceClassifier {
        &self.classifier
    }

    /// Reconstructs at most one muon from `event`.
    ///
    /// # Errors
    /// Returns an [`ExtractionError`] if the event is malformed: the active
    /// region is missing (when required), a hit has no contributors, or a
    /// contributor index is outside the trajectory table.
    pub fn extract(&self, event: &Event) -> Result<Option<Muon>, ExtractionError> {
        let region = &self.config.active_region;
        let hits = match event.hits(region) {
            Some(hits) => hits,
            None if self.config.require_region => {
                return Err(ExtractionError::MissingRegion {
                    event: event.id,
                    region: region.clone(),
                });
            }
            None => return Ok(None),
        };

        let mut track = MuonTrack::NoMuon;
        for (hit_index, hit) in hits.iter().enumerate() {
            let index = hit
                .primary_contributor()
                .ok_or(ExtractionError::MissingContributor {
                    event: event.id,
                    hit: hit_index,
                })?;
            let trajectory =
                event
                    .trajectories
                    .get(index)
                    .ok_or(ExtractionError::TrajectoryOutOfRange {
                        event: event.id,
                        index,
                        len: event.trajectories.len(),
                    })?;

            if trajectory.pdg_code.unsigned_abs() == MUON_PDG.unsigned_abs() {
                track = track.advance(
                    self.transform.to_local(hit.start),
                    self.transform.to_local(hit.stop),
                    &self.classifier,
                );
            }
        }

        Ok(track.finish())
    }
}
