//! Simulated event records and the event-source abstraction.

use std::collections::BTreeMap;

use crate::geometry::Point3;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An energy deposit in one detector region.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Start of the deposit, raw detector frame (mm).
    pub start: Point3,
    /// End of the deposit, raw detector frame (mm).
    pub stop: Point3,
    /// Trajectory indices of the particles that produced the deposit.
    /// The first entry is the primary contributor.
    pub contributors: Vec<usize>,
}

impl Hit {
    /// Creates a hit with a single contributing trajectory.
    #[must_use]
    pub fn new(start: Point3, stop: Point3, contributor: usize) -> Self {
        Self {
            start,
            stop,
            contributors: vec![contributor],
        }
    }

    /// Returns the primary contributor, if any.
    #[inline]
    #[must_use]
    pub fn primary_contributor(&self) -> Option<usize> {
        self.contributors.first().copied()
    }
}

/// A simulated particle trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    /// PDG species code (±13 for muons).
    pub pdg_code: i32,
}

impl Trajectory {
    /// Creates a trajectory with the given PDG code.
    #[inline]
    #[must_use]
    pub const fn new(pdg_code: i32) -> Self {
        Self { pdg_code }
    }
}

/// One simulated interaction: hits grouped by detector region plus the
/// trajectory table they refer to.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Event number within the input stream.
    pub id: usize,
    /// Hits keyed by detector region name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub regions: BTreeMap<String, Vec<Hit>>,
    /// Trajectory table indexed by contributor index.
    #[cfg_attr(feature = "serde", serde(default))]
    pub trajectories: Vec<Trajectory>,
}

impl Event {
    /// Creates an event with no regions and no trajectories.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Appends a trajectory and returns its index.
    pub fn push_trajectory(&mut self, trajectory: Trajectory) -> usize {
        self.trajectories.push(trajectory);
        self.trajectories.len() - 1
    }

    /// Appends a hit to `region`, creating the region if needed.
    pub fn push_hit(&mut self, region: &str, hit: Hit) {
        self.regions.entry(region.to_string()).or_default().push(hit);
    }

    /// Registers `region` with no hits.
    pub fn touch_region(&mut self, region: &str) {
        self.regions.entry(region.to_string()).or_default();
    }

    /// Returns the hits recorded in `region`, or `None` if the region is absent.
    #[must_use]
    pub fn hits(&self, region: &str) -> Option<&[Hit]> {
        self.regions.get(region).map(Vec::as_slice)
    }
}

/// Indexed, finite source of events.
///
/// The total count must be known before partitioning starts. Events are
/// requested in strictly increasing index order.
pub trait EventSource {
    /// Total number of events available.
    fn len(&self) -> usize;

    /// Returns true if the source has no events.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the event at `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the event cannot be read.
    fn read_event(&mut self, index: usize) -> Result<Event>;
}

impl EventSource for Vec<Event> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn read_event(&mut self, index: usize) -> Result<Event> {
        let len = self.as_slice().len();
        self.get(index)
            .cloned()
            .ok_or(Error::EventOutOfRange { index, len })
    }
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read_event(&mut self, index: usize) -> Result<Event> {
        (**self).read_event(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_building() {
        let mut event = Event::new(7);
        let mu = event.push_trajectory(Trajectory::new(-13));
        let e = event.push_trajectory(Trajectory::new(11));
        assert_eq!((mu, e), (0, 1));

        event.push_hit("ArgonCube", Hit::new(Point3::default(), Point3::new(1.0, 0.0, 0.0), mu));
        event.push_hit("ArgonCube", Hit::new(Point3::default(), Point3::default(), e));
        event.touch_region("Muon");

        assert_eq!(event.hits("ArgonCube").map(<[Hit]>::len), Some(2));
        assert_eq!(event.hits("Muon").map(<[Hit]>::len), Some(0));
        assert!(event.hits("TMS").is_none());
    }

    #[test]
    fn test_primary_contributor() {
        let mut hit = Hit::new(Point3::default(), Point3::default(), 4);
        hit.contributors.push(9);
        assert_eq!(hit.primary_contributor(), Some(4));
        hit.contributors.clear();
        assert_eq!(hit.primary_contributor(), None);
    }

    #[test]
    fn test_vec_source() {
        let mut source = vec![Event::new(0), Event::new(1)];
        assert_eq!(EventSource::len(&source), 2);
        assert_eq!(source.read_event(1).unwrap().id, 1);
        assert!(matches!(
            source.read_event(2),
            Err(Error::EventOutOfRange { index: 2, len: 2 })
        ));
    }
}
