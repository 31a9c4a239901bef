//! Synthetic event samples for demos and validation runs.

use crate::Result;
use rockmu_core::{Event, Hit, Point3, Trajectory, ACTIVE_REGION};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Description of a synthetic sample.
///
/// Every `muon_every`-th event (starting with event 0) has one muon deposit
/// from `start` to `stop`; the others carry one pion deposit on the same
/// segment, which extraction must ignore.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSample {
    /// Number of events.
    pub events: usize,
    /// Period of muon-carrying events.
    pub muon_every: usize,
    /// Deposit start, raw frame (mm).
    pub start: Point3,
    /// Deposit stop, raw frame (mm).
    pub stop: Point3,
    /// Region the deposits are recorded in.
    pub region: String,
}

impl Default for SyntheticSample {
    fn default() -> Self {
        Self {
            events: 1000,
            muon_every: 3,
            start: Point3::new(0.0, 50.0, 4100.0),
            stop: Point3::new(0.0, 50.0, 4200.0),
            region: ACTIVE_REGION.to_string(),
        }
    }
}

impl SyntheticSample {
    /// Builds event `id` of the sample.
    #[must_use]
    pub fn event(&self, id: usize) -> Event {
        let mut event = Event::new(id);
        let is_muon = self.muon_every > 0 && id % self.muon_every == 0;
        let pdg = match (is_muon, id % 2 == 0) {
            (true, true) => 13,
            (true, false) => -13,
            (false, _) => 211,
        };
        let t = event.push_trajectory(Trajectory::new(pdg));
        event.push_hit(&self.region, Hit::new(self.start, self.stop, t));
        event
    }

    /// Builds the whole sample in memory.
    #[must_use]
    pub fn build(&self) -> Vec<Event> {
        (0..self.events).map(|id| self.event(id)).collect()
    }

    /// Writes the sample as newline-delimited JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for id in 0..self.events {
            serde_json::to_writer(&mut writer, &self.event(id))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
