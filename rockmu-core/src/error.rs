//! Error types for rockmu-core.

use thiserror::Error;

/// Result type alias for rockmu operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for rockmu operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, raised before any event is processed.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Event violated the event-source contract.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Histogram axis cannot be built from the requested binning.
    #[error("invalid histogram axis: {0}")]
    InvalidHistogram(String),

    /// Requested event index is past the end of the source.
    #[error("event index {index} out of range ({len} events)")]
    EventOutOfRange { index: usize, len: usize },

    /// Event source failed to produce an event.
    #[error("event source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Malformed-event errors from muon extraction.
///
/// These indicate upstream corruption; extraction stops instead of skipping
/// the event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The active detector region is absent from the event.
    #[error("event {event} has no hits for region '{region}'")]
    MissingRegion { event: usize, region: String },

    /// A hit has an empty contributor list.
    #[error("event {event}: hit {hit} has no contributors")]
    MissingContributor { event: usize, hit: usize },

    /// A contributor index points past the trajectory table.
    #[error("event {event}: trajectory index {index} out of range ({len} trajectories)")]
    TrajectoryOutOfRange {
        event: usize,
        index: usize,
        len: usize,
    },
}
