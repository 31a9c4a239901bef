//! Spill partitioning of a finite, ordered event sequence.
//!
//! Spill sizes are drawn one at a time; a draw that would reach or pass the
//! end of the input ends the run, and the remaining events are never read.

use std::ops::Range;

use crate::sampler::SpillSizeSampler;
use rockmu_core::config::validate_mean;
use rockmu_core::{Error, EventSource, Face, Muon, MuonExtractor, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Muons reconstructed from one spill's worth of events.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spill {
    /// Position of the spill in the run.
    pub index: usize,
    /// Events consumed by this spill.
    pub events: Range<usize>,
    /// Muons in event order.
    pub muons: Vec<Muon>,
}

impl Spill {
    /// Number of events the spill consumed.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of muons in the spill.
    #[must_use]
    pub fn muon_count(&self) -> usize {
        self.muons.len()
    }

    /// Muons per entry face, indexed like [`Face::ALL`]. Unclassified muons
    /// are not counted.
    #[must_use]
    pub fn face_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for face in self.muons.iter().filter_map(|m| m.entry_face) {
            counts[face.index()] += 1;
        }
        counts
    }

    /// Number of muons entering through `face`.
    #[must_use]
    pub fn count_for(&self, face: Face) -> usize {
        self.face_counts()[face.index()]
    }
}

/// Iterator over spill event ranges.
///
/// Only draws sizes; no events are read. Used directly to fix boundaries
/// before parallel extraction and wrapped by [`SpillPartitioner`].
#[derive(Debug, Clone)]
pub struct SpillBoundaries<P> {
    sampler: P,
    mean: f64,
    total: usize,
    cursor: usize,
    exhausted: bool,
}

impl<P: SpillSizeSampler> SpillBoundaries<P> {
    /// Creates the boundary iterator for `total` events.
    ///
    /// # Errors
    /// Returns a configuration error if `total` is zero or `mean` is not a
    /// positive finite number.
    pub fn new(total: usize, mean: f64, sampler: P) -> Result<Self> {
        if total == 0 {
            return Err(Error::ConfigError("no events available".to_string()));
        }
        validate_mean(mean)?;
        Ok(Self {
            sampler,
            mean,
            total,
            cursor: 0,
            exhausted: false,
        })
    }

    /// Events covered by the spills yielded so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Total number of events in the input.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Mean spill size.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// True once the final draw has overrun the input.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.cursor >= self.total
    }
}

impl<P: SpillSizeSampler> Iterator for SpillBoundaries<P> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.is_exhausted() {
            return None;
        }
        let size = self.sampler.sample(self.mean);
        let end = self.cursor.saturating_add(size);
        if end >= self.total {
            log::debug!(
                "drew {size} events with {} remaining; dropping the partial spill",
                self.total - self.cursor
            );
            self.exhausted = true;
            return None;
        }
        let range = self.cursor..end;
        self.cursor = end;
        Some(range)
    }
}

/// Lazily assembles spills from an event source.
///
/// Each event index is read at most once, in increasing order. The iterator
/// yields `Err` once and then stops if an event cannot be read or is
/// malformed.
pub struct SpillPartitioner<'a, S, P> {
    source: S,
    extractor: &'a MuonExtractor,
    boundaries: SpillBoundaries<P>,
    next_index: usize,
    failed: bool,
}

impl<'a, S: EventSource, P: SpillSizeSampler> SpillPartitioner<'a, S, P> {
    /// Creates a partitioner over every event in `source`.
    ///
    /// # Errors
    /// Returns a configuration error if the source is empty or `mean` is not
    /// a positive finite number.
    pub fn new(source: S, extractor: &'a MuonExtractor, sampler: P, mean: f64) -> Result<Self> {
        let boundaries = SpillBoundaries::new(source.len(), mean, sampler)?;
        Ok(Self {
            source,
            extractor,
            boundaries,
            next_index: 0,
            failed: false,
        })
    }

    /// Spills yielded so far.
    #[must_use]
    pub fn spills(&self) -> usize {
        self.next_index
    }

    /// Events consumed by the spills yielded so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.boundaries.consumed()
    }

    /// Events never processed because they could not fill a spill.
    /// Zero until the partitioner is exhausted.
    #[must_use]
    pub fn discarded(&self) -> usize {
        if self.boundaries.is_exhausted() {
            self.boundaries.total() - self.boundaries.consumed()
        } else {
            0
        }
    }

    /// Total number of events in the source.
    #[must_use]
    pub fn total(&self) -> usize {
        self.boundaries.total()
    }

    fn assemble(&mut self, events: Range<usize>) -> Result<Spill> {
        let mut muons = Vec::new();
        for i in events.clone() {
            let event = self.source.read_event(i)?;
            if let Some(muon) = self.extractor.extract(&event)? {
                muons.push(muon);
            }
        }
        Ok(Spill {
            index: self.next_index,
            events,
            muons,
        })
    }
}

impl<S: EventSource, P: SpillSizeSampler> Iterator for SpillPartitioner<'_, S, P> {
    type Item = Result<Spill>;

    fn next(&mut self) -> Option<Result<Spill>> {
        if self.failed {
            return None;
        }
        let events = self.boundaries.next()?;
        match self.assemble(events) {
            Ok(spill) => {
                self.next_index += 1;
                Some(Ok(spill))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::PoissonSampler;
    use rockmu_core::{Event, Hit, Point3, Trajectory, ACTIVE_REGION};

    /// Replays a fixed list of sizes, then returns `usize::MAX`.
    struct Replay(std::vec::IntoIter<usize>);

    impl Replay {
        fn new(sizes: &[usize]) -> Self {
            Self(sizes.to_vec().into_iter())
        }
    }

    impl SpillSizeSampler for Replay {
        fn sample(&mut self, _mean: f64) -> usize {
            self.0.next().unwrap_or(usize::MAX)
        }
    }

    /// Event source that records which indices were read.
    struct Recording {
        events: Vec<Event>,
        reads: Vec<usize>,
    }

    impl EventSource for Recording {
        fn len(&self) -> usize {
            self.events.len()
        }

        fn read_event(&mut self, index: usize) -> Result<Event> {
            self.reads.push(index);
            self.events.read_event(index)
        }
    }

    fn muon_every(n: usize, every: usize) -> Vec<Event> {
        (0..n)
            .map(|id| {
                let mut event = Event::new(id);
                event.touch_region(ACTIVE_REGION);
                if id % every == 0 {
                    let t = event.push_trajectory(Trajectory::new(13));
                    event.push_hit(
                        ACTIVE_REGION,
                        Hit::new(Point3::new(0.0, 50.0, 4100.0), Point3::new(0.0, 50.0, 4200.0), t),
                    );
                }
                event
            })
            .collect()
    }

    #[test]
    fn test_boundaries_stop_before_partial_spill() {
        let ranges: Vec<_> = SpillBoundaries::new(10, 3.0, Replay::new(&[3, 4, 3]))
            .unwrap()
            .collect();
        // 7 + 3 == 10 reaches the end, so the last draw is dropped.
        assert_eq!(ranges, vec![0..3, 3..7]);
    }

    #[test]
    fn test_boundaries_allow_empty_spills() {
        let ranges: Vec<_> = SpillBoundaries::new(5, 1.0, Replay::new(&[0, 2, 0, 9]))
            .unwrap()
            .collect();
        assert_eq!(ranges, vec![0..0, 0..2, 2..2]);
    }

    #[test]
    fn test_boundaries_reject_bad_config() {
        assert!(SpillBoundaries::new(0, 5.0, Replay::new(&[])).is_err());
        assert!(SpillBoundaries::new(10, 0.0, Replay::new(&[])).is_err());
        assert!(SpillBoundaries::new(10, -1.0, Replay::new(&[])).is_err());
        assert!(SpillBoundaries::new(10, f64::INFINITY, Replay::new(&[])).is_err());
    }

    #[test]
    fn test_partitioner_reads_each_event_once_in_order() {
        let extractor = MuonExtractor::default();
        let mut source = Recording {
            events: muon_every(20, 2),
            reads: Vec::new(),
        };
        let spills: Vec<_> = SpillPartitioner::new(&mut source, &extractor, Replay::new(&[4, 5, 6, 7]), 5.0)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(spills.len(), 3);
        assert_eq!(source.reads, (0..15).collect::<Vec<_>>());
        let counts: Vec<_> = spills.iter().map(Spill::muon_count).collect();
        // Even events carry muons: {0,2} {4,6,8} {10,12,14}
        assert_eq!(counts, vec![2, 3, 3]);
        assert_eq!(spills[2].index, 2);
        assert_eq!(spills[2].events, 9..15);
    }

    #[test]
    fn test_partitioner_accounting() {
        let extractor = MuonExtractor::default();
        let mut partitioner =
            SpillPartitioner::new(muon_every(100, 3), &extractor, PoissonSampler::seeded(99), 6.0).unwrap();
        let consumed: usize = partitioner.by_ref().map(|s| s.unwrap().event_count()).sum();

        assert_eq!(consumed, partitioner.consumed());
        assert!(consumed < 100);
        assert_eq!(partitioner.discarded(), 100 - consumed);
    }

    #[test]
    fn test_huge_mean_yields_nothing() {
        let extractor = MuonExtractor::default();
        let mut source = Recording {
            events: muon_every(50, 1),
            reads: Vec::new(),
        };
        let mut partitioner =
            SpillPartitioner::new(&mut source, &extractor, PoissonSampler::seeded(12345), 1.0e6).unwrap();
        assert!(partitioner.next().is_none());
        assert_eq!(partitioner.spills(), 0);
        assert_eq!(partitioner.discarded(), 50);
        drop(partitioner);
        assert!(source.reads.is_empty());
    }

    #[test]
    fn test_malformed_event_stops_iteration() {
        let extractor = MuonExtractor::default();
        let mut events = muon_every(10, 2);
        events[3].regions.clear();
        let mut partitioner = SpillPartitioner::new(events, &extractor, Replay::new(&[2, 2, 2]), 2.0).unwrap();

        assert!(partitioner.next().unwrap().is_ok());
        assert!(matches!(
            partitioner.next(),
            Some(Err(Error::Extraction(rockmu_core::ExtractionError::MissingRegion { event: 3, .. })))
        ));
        assert!(partitioner.next().is_none());
    }
}
