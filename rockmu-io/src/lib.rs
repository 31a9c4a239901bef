//! rockmu-io: Event file input and histogram output for rockmu.
//!
//! This crate provides memory-mapped reading of newline-delimited JSON event
//! files via memmap2, histogram writers, and synthetic sample generation.
//!

mod error;
mod reader;
pub mod synth;
mod writer;

pub use error::{Error, Result};
pub use reader::{EventFile, EventFileSet};
pub use synth::SyntheticSample;
pub use writer::HistogramWriter;
