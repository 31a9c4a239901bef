//! rockmu-algorithms: Spill assembly and statistics for rock-muon studies.
//!
//! This crate provides:
//! - **Sampling** - seeded Poisson spill sizes behind an injectable trait
//! - **Partitioning** - lazy spill assembly that never emits a partial spill
//! - **Aggregation** - multiplicity and entry-position accumulators
//! - **Processing** - sequential and rayon-parallel run drivers
//!
#![warn(missing_docs)]

pub mod aggregate;
pub mod partition;
mod processing;
pub mod sampler;

pub use aggregate::MuonHistograms;
pub use partition::{Spill, SpillBoundaries, SpillPartitioner};
pub use processing::{
    run, run_parallel, run_parallel_prefix_with_mean, run_parallel_with_mean, run_with_mean,
    spill_extent, RunOutput, RunSummary,
};
pub use sampler::{PoissonSampler, SpillSizeSampler};
