//! End-to-end drivers: partition, extract, aggregate.

use rayon::prelude::*;

use crate::aggregate::MuonHistograms;
use crate::partition::{Spill, SpillBoundaries, SpillPartitioner};
use crate::sampler::PoissonSampler;
use rockmu_core::{Error, Event, EventSource, Result, RunConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counts describing a completed run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Events available in the input.
    pub total_events: usize,
    /// Mean events per spill used for the Poisson draws.
    pub mean_events_per_spill: f64,
    /// Complete spills produced.
    pub spills: usize,
    /// Events consumed by those spills.
    pub events_consumed: usize,
    /// Trailing events that could not fill a spill.
    pub events_discarded: usize,
    /// Muons reconstructed in the complete spills.
    pub muons: u64,
    /// Seed of the spill-size generator.
    pub seed: u64,
}

/// Histograms plus summary of one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOutput {
    /// Filled accumulators.
    pub histograms: MuonHistograms,
    /// Run counts.
    pub summary: RunSummary,
}

/// Runs the sequential pipeline with the mean derived from the beam POT.
///
/// # Errors
/// Returns a configuration error before any event is read if the
/// configuration or event count is degenerate, and propagates event read and
/// extraction failures.
pub fn run<S: EventSource>(source: S, config: &RunConfig) -> Result<RunOutput> {
    config.validate()?;
    let mean = config.beam.mean_events_per_spill(source.len())?;
    run_with_mean(source, config, mean)
}

/// Runs the sequential pipeline with an explicit mean spill size.
///
/// # Errors
/// See [`run`].
pub fn run_with_mean<S: EventSource>(source: S, config: &RunConfig, mean: f64) -> Result<RunOutput> {
    config.validate()?;
    let extractor = config.extractor();
    let mut histograms = MuonHistograms::new(&config.histograms)?;
    let total = source.len();

    log::info!(
        "partitioning {total} events into spills of mean {mean:.3} (seed {}, {:?} policy)",
        config.seed,
        config.policy
    );

    let mut partitioner = SpillPartitioner::new(source, &extractor, PoissonSampler::seeded(config.seed), mean)?;
    for spill in partitioner.by_ref() {
        let spill = spill?;
        log_spill(&spill, total);
        histograms.record(&spill);
    }

    let summary = RunSummary {
        total_events: total,
        mean_events_per_spill: mean,
        spills: partitioner.spills(),
        events_consumed: partitioner.consumed(),
        events_discarded: partitioner.discarded(),
        muons: histograms.muons,
        seed: config.seed,
    };
    log_summary(&summary);
    Ok(RunOutput {
        histograms,
        summary,
    })
}

/// Runs the pipeline over an in-memory event slice, extracting muons in
/// parallel once all spill boundaries are fixed.
///
/// Produces the same output as [`run`] for the same configuration.
///
/// # Errors
/// See [`run`].
pub fn run_parallel(events: &[Event], config: &RunConfig) -> Result<RunOutput> {
    config.validate()?;
    let mean = config.beam.mean_events_per_spill(events.len())?;
    run_parallel_with_mean(events, config, mean)
}

/// Parallel variant of [`run_with_mean`].
///
/// # Errors
/// See [`run`].
pub fn run_parallel_with_mean(events: &[Event], config: &RunConfig, mean: f64) -> Result<RunOutput> {
    run_parallel_prefix_with_mean(events, events.len(), config, mean)
}

/// Number of leading events, out of `total`, that the spills of a run consume.
///
/// Draws the same boundaries as the run drivers, so a caller can decode just
/// this prefix before a parallel run.
///
/// # Errors
/// Returns a configuration error if `total` or `mean` is degenerate.
pub fn spill_extent(total: usize, config: &RunConfig, mean: f64) -> Result<usize> {
    let mut boundaries = SpillBoundaries::new(total, mean, PoissonSampler::seeded(config.seed))?;
    for _ in boundaries.by_ref() {}
    Ok(boundaries.consumed())
}

/// Parallel run over the decoded leading events of an input of `total` events.
///
/// `events` must hold at least the first [`spill_extent`] events; the trailing
/// events that fill no spill are never looked at.
///
/// # Errors
/// See [`run`]. Also returns a configuration error if `events` is longer than
/// `total` or shorter than the spills require.
pub fn run_parallel_prefix_with_mean(
    events: &[Event],
    total: usize,
    config: &RunConfig,
    mean: f64,
) -> Result<RunOutput> {
    config.validate()?;
    if events.len() > total {
        return Err(Error::ConfigError(format!(
            "{} decoded events exceed the input size {total}",
            events.len()
        )));
    }
    let extractor = config.extractor();
    let mut histograms = MuonHistograms::new(&config.histograms)?;

    // Draws stay serial; only extraction fans out.
    let mut boundaries = SpillBoundaries::new(total, mean, PoissonSampler::seeded(config.seed))?;
    let ranges: Vec<_> = boundaries.by_ref().collect();
    let consumed = boundaries.consumed();
    if events.len() < consumed {
        return Err(Error::ConfigError(format!(
            "spills need {consumed} events but only {} were decoded",
            events.len()
        )));
    }

    let extracted = events[..consumed]
        .par_iter()
        .map(|event| extractor.extract(event))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (index, range) in ranges.into_iter().enumerate() {
        let spill = Spill {
            index,
            muons: extracted[range.clone()].iter().flatten().copied().collect(),
            events: range,
        };
        log_spill(&spill, total);
        histograms.record(&spill);
    }

    let summary = RunSummary {
        total_events: total,
        mean_events_per_spill: mean,
        spills: usize::try_from(histograms.spills).unwrap_or(usize::MAX),
        events_consumed: consumed,
        events_discarded: total - consumed,
        muons: histograms.muons,
        seed: config.seed,
    };
    log_summary(&summary);
    Ok(RunOutput {
        histograms,
        summary,
    })
}

fn log_spill(spill: &Spill, total: usize) {
    log::debug!(
        "spill {} with {} events ({} muons); {} remaining",
        spill.index,
        spill.event_count(),
        spill.muon_count(),
        total - spill.events.end
    );
}

fn log_summary(summary: &RunSummary) {
    log::info!(
        "{} spills produced from {} available events ({} used, {} dropped, {} muons)",
        summary.spills,
        summary.total_events,
        summary.events_consumed,
        summary.events_discarded,
        summary.muons
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rockmu_core::{BeamConfig, ClassificationPolicy, Face, Hit, Point3, Trajectory, ACTIVE_REGION};

    fn events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|id| {
                let mut event = Event::new(id);
                event.touch_region(ACTIVE_REGION);
                if id % 4 != 1 {
                    let t = event.push_trajectory(Trajectory::new(if id % 2 == 0 { 13 } else { -13 }));
                    // Spread entries over the faces.
                    #[allow(clippy::cast_precision_loss)]
                    let x = (id % 9) as f64 * 800.0 - 3600.0;
                    event.push_hit(
                        ACTIVE_REGION,
                        Hit::new(Point3::new(x, 1500.0, 4300.0), Point3::new(x, 0.0, 5000.0), t),
                    );
                }
                event
            })
            .collect()
    }

    #[test]
    fn test_run_derives_mean_from_pot() {
        let config = RunConfig::new().with_beam(BeamConfig {
            spill_pot: 1.0,
            total_pot: 100.0,
        });
        let output = run(events(400), &config).unwrap();
        assert!((output.summary.mean_events_per_spill - 4.0).abs() < 1e-12);
        assert_eq!(output.summary.spills as u64, output.histograms.spills);
        assert_eq!(
            output.summary.events_consumed + output.summary.events_discarded,
            output.summary.total_events
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        for policy in [ClassificationPolicy::NearestFace, ClassificationPolicy::Threshold] {
            let config = RunConfig::new().with_seed(2024).with_policy(policy);
            let input = events(600);
            let sequential = run_with_mean(input.clone(), &config, 7.5).unwrap();
            let parallel = run_parallel_with_mean(&input, &config, 7.5).unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn test_prefix_run_matches_full_run() {
        let config = RunConfig::new().with_seed(99);
        let input = events(500);
        let full = run_with_mean(input.clone(), &config, 6.0).unwrap();

        let extent = spill_extent(input.len(), &config, 6.0).unwrap();
        assert_eq!(extent, full.summary.events_consumed);
        assert!(extent < input.len());

        let prefix = run_parallel_prefix_with_mean(&input[..extent], input.len(), &config, 6.0).unwrap();
        assert_eq!(prefix, full);

        let short = run_parallel_prefix_with_mean(&input[..extent - 1], input.len(), &config, 6.0);
        assert!(matches!(short, Err(Error::ConfigError(_))));
        let long = run_parallel_prefix_with_mean(&input, input.len() - 1, &config, 6.0);
        assert!(matches!(long, Err(Error::ConfigError(_))));
    }

    /// One muon per event; odd events enter low in z, which the threshold
    /// policy leaves unclassified.
    fn mixed_face_events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|id| {
                let mut event = Event::new(id);
                let t = event.push_trajectory(Trajectory::new(13));
                #[allow(clippy::cast_precision_loss)]
                let x = (id % 9) as f64 * 800.0 - 3600.0;
                let z = if id % 2 == 0 { 4300.0 } else { 4150.0 };
                event.push_hit(
                    ACTIVE_REGION,
                    Hit::new(Point3::new(x, 1500.0, z), Point3::new(x, 0.0, 5000.0), t),
                );
                event
            })
            .collect()
    }

    #[test]
    fn test_face_accounting_mixed_faces() {
        for policy in [ClassificationPolicy::NearestFace, ClassificationPolicy::Threshold] {
            let config = RunConfig::new().with_seed(2024).with_policy(policy);
            let output = run_with_mean(mixed_face_events(600), &config, 7.5).unwrap();
            let h = &output.histograms;

            assert!(h.muons > 0);
            assert_eq!(h.face_totals.iter().sum::<u64>() + h.unclassified, h.muons);
            assert_eq!(h.entry_xy.entries(), h.muons);
            match policy {
                ClassificationPolicy::NearestFace => {
                    assert_eq!(h.unclassified, 0);
                    assert!(h.face_totals.iter().filter(|&&n| n > 0).count() >= 2);
                }
                ClassificationPolicy::Threshold => {
                    assert!(h.unclassified > 0);
                    assert!(h.face_totals[Face::Top.index()] > 0);
                    assert_eq!(h.face_totals[Face::Front.index()], 0);
                }
            }
        }
    }

    #[test]
    fn test_empty_input_is_config_error() {
        let result = run(Vec::<Event>::new(), &RunConfig::default());
        assert!(matches!(result, Err(Error::ConfigError(_))));
        let result = run_parallel(&[], &RunConfig::default());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_non_positive_mean_is_config_error() {
        let result = run_with_mean(events(10), &RunConfig::default(), 0.0);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
