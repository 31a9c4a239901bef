//! rockmu-core: Core types for rock-muon spill reconstruction.
//!
//! This crate provides the event model, the active-volume geometry and
//! entry-face classification, per-event muon extraction, binned accumulators
//! and run configuration.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod histogram;
pub mod muon;

pub use config::{validate_mean, BeamConfig, HistogramConfig, RunConfig};
pub use error::{Error, ExtractionError, Result};
pub use event::{Event, EventSource, Hit, Trajectory};
pub use geometry::{
    ClassificationPolicy, DetectorBoundary, Face, FaceClassifier, FrameTransform, Point3,
};
pub use histogram::{Axis, Histogram1D, Histogram2D};
pub use muon::{ExtractionConfig, Muon, MuonExtractor, MuonTrack, ACTIVE_REGION, MUON_PDG};
