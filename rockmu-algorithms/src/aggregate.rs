//! Accumulation of per-spill and per-muon statistics.

use crate::partition::Spill;
use rockmu_core::{Face, Histogram1D, Histogram2D, HistogramConfig, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named accumulator set filled once per completed spill.
///
/// Written only through [`MuonHistograms::record`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuonHistograms {
    /// Muons per spill.
    pub multiplicity: Histogram1D,
    /// Muons per spill for each entry face, indexed like [`Face::ALL`].
    pub face_multiplicity: Vec<Histogram1D>,
    /// Entry position in the x/y plane.
    pub entry_xy: Histogram2D,
    /// Entry z of top-entering muons.
    pub entry_z_top: Histogram1D,
    /// Entry z of side-entering muons.
    pub entry_z_side: Histogram1D,
    /// Muons per entry face over the whole run.
    pub face_totals: [u64; 4],
    /// Muons left unclassified by the policy.
    pub unclassified: u64,
    /// Spills recorded.
    pub spills: u64,
    /// Muons recorded.
    pub muons: u64,
}

impl MuonHistograms {
    /// Creates empty accumulators with the given binning.
    ///
    /// # Errors
    /// Returns an error if any axis in `config` is invalid.
    pub fn new(config: &HistogramConfig) -> Result<Self> {
        let mult_axis = config.multiplicity_axis()?;
        let (x_axis, y_axis) = config.position_axes()?;
        let z_axis = config.z_axis()?;

        Ok(Self {
            multiplicity: Histogram1D::new("muon_multiplicity", "Number of muons", mult_axis),
            face_multiplicity: Face::ALL
                .iter()
                .map(|face| Histogram1D::new(format!("mult_{face}"), "Muons per spill", mult_axis))
                .collect(),
            entry_xy: Histogram2D::new("entry_xy", "Entry x (cm);Entry y (cm)", x_axis, y_axis),
            entry_z_top: Histogram1D::new("entry_ztop", "Entry z (cm)", z_axis),
            entry_z_side: Histogram1D::new("entry_zside", "Entry z (cm)", z_axis),
            face_totals: [0; 4],
            unclassified: 0,
            spills: 0,
            muons: 0,
        })
    }

    /// Adds one completed spill.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, spill: &Spill) {
        self.multiplicity.fill(spill.muon_count() as f64);

        let mut per_face = [0usize; 4];
        for muon in &spill.muons {
            self.entry_xy.fill(muon.entry.x, muon.entry.y);
            match muon.entry_face {
                Some(face) => {
                    per_face[face.index()] += 1;
                    self.face_totals[face.index()] += 1;
                    match face {
                        Face::Top => self.entry_z_top.fill(muon.entry.z),
                        Face::Side => self.entry_z_side.fill(muon.entry.z),
                        Face::Front | Face::Bottom => {}
                    }
                }
                None => self.unclassified += 1,
            }
        }

        for (hist, &count) in self.face_multiplicity.iter_mut().zip(&per_face) {
            hist.fill(count as f64);
        }

        self.spills += 1;
        self.muons += spill.muon_count() as u64;
    }

    /// Per-face multiplicity accumulator.
    #[must_use]
    pub fn face(&self, face: Face) -> &Histogram1D {
        &self.face_multiplicity[face.index()]
    }

    /// All 1D accumulators, overall multiplicity first.
    pub fn histograms_1d(&self) -> impl Iterator<Item = &Histogram1D> {
        std::iter::once(&self.multiplicity)
            .chain(self.face_multiplicity.iter())
            .chain([&self.entry_z_top, &self.entry_z_side])
    }

    /// Looks up a 1D accumulator by name.
    #[must_use]
    pub fn get_1d(&self, name: &str) -> Option<&Histogram1D> {
        self.histograms_1d().find(|h| h.name == name)
    }

    /// Mean muons per spill, or `None` before any spill is recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_multiplicity(&self) -> Option<f64> {
        (self.spills > 0).then(|| self.muons as f64 / self.spills as f64)
    }
}
