//! Run configuration: binning, beam normalisation, geometry and seeding.

use crate::geometry::{ClassificationPolicy, DetectorBoundary, FaceClassifier, FrameTransform};
use crate::histogram::Axis;
use crate::muon::{ExtractionConfig, MuonExtractor};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Binning of the output accumulators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistogramConfig {
    /// Bins of the muons-per-spill accumulators.
    pub multiplicity_bins: usize,
    /// Range of the muons-per-spill accumulators.
    pub multiplicity_range: (f64, f64),
    /// Bins of the entry-position accumulator, `(x, y)`.
    pub position_bins: (usize, usize),
    /// Range of the entry-position accumulator, `((x_min, x_max), (y_min, y_max))`.
    pub position_range: ((f64, f64), (f64, f64)),
    /// Bins of the entry-z accumulators.
    pub z_bins: usize,
    /// Range of the entry-z accumulators.
    pub z_range: (f64, f64),
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            multiplicity_bins: 30,
            multiplicity_range: (0.0, 30.0),
            position_bins: (72, 32),
            position_range: ((-360.0, 360.0), (-160.0, 160.0)),
            z_bins: 25,
            z_range: (0.0, 500.0),
        }
    }
}

impl HistogramConfig {
    /// Sets the multiplicity binning.
    #[must_use]
    pub fn with_multiplicity(mut self, bins: usize, range: (f64, f64)) -> Self {
        self.multiplicity_bins = bins;
        self.multiplicity_range = range;
        self
    }

    /// Sets the entry-position binning.
    #[must_use]
    pub fn with_position(mut self, bins: (usize, usize), range: ((f64, f64), (f64, f64))) -> Self {
        self.position_bins = bins;
        self.position_range = range;
        self
    }

    /// Sets the entry-z binning.
    #[must_use]
    pub fn with_z(mut self, bins: usize, range: (f64, f64)) -> Self {
        self.z_bins = bins;
        self.z_range = range;
        self
    }

    /// Multiplicity axis.
    ///
    /// # Errors
    /// Returns an error if the binning is invalid.
    pub fn multiplicity_axis(&self) -> Result<Axis> {
        let (min, max) = self.multiplicity_range;
        Axis::new(self.multiplicity_bins, min, max)
    }

    /// Entry-position axes, `(x, y)`.
    ///
    /// # Errors
    /// Returns an error if the binning is invalid.
    pub fn position_axes(&self) -> Result<(Axis, Axis)> {
        let ((x_min, x_max), (y_min, y_max)) = self.position_range;
        Ok((
            Axis::new(self.position_bins.0, x_min, x_max)?,
            Axis::new(self.position_bins.1, y_min, y_max)?,
        ))
    }

    /// Entry-z axis.
    ///
    /// # Errors
    /// Returns an error if the binning is invalid.
    pub fn z_axis(&self) -> Result<Axis> {
        let (min, max) = self.z_range;
        Axis::new(self.z_bins, min, max)
    }

    /// Checks every axis.
    ///
    /// # Errors
    /// Returns the first invalid axis as a configuration error.
    pub fn validate(&self) -> Result<()> {
        let check = || -> Result<()> {
            self.multiplicity_axis()?;
            self.position_axes()?;
            self.z_axis()?;
            Ok(())
        };
        check().map_err(|e| Error::ConfigError(e.to_string()))
    }
}

/// Beam normalisation used to derive the mean number of events per spill.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BeamConfig {
    /// Protons on target delivered in one spill.
    pub spill_pot: f64,
    /// Protons on target represented by the whole input sample.
    pub total_pot: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            // 1.2 MW beam
            spill_pot: 7.5e13,
            // Rock sample, roughly 100 spills
            total_pot: 8.89006e15,
        }
    }
}

impl BeamConfig {
    /// Mean number of events per spill for a sample of `total_events`.
    ///
    /// # Errors
    /// Returns an error if the sample is empty, either POT value is not a
    /// positive finite number, or the resulting mean is not positive.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_events_per_spill(&self, total_events: usize) -> Result<f64> {
        if total_events == 0 {
            return Err(Error::ConfigError("no events available".to_string()));
        }
        for (label, value) in [("spill_pot", self.spill_pot), ("total_pot", self.total_pot)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!(
                    "{label} must be positive and finite, got {value}"
                )));
            }
        }
        let mean = total_events as f64 * self.spill_pot / self.total_pot;
        validate_mean(mean)?;
        Ok(mean)
    }
}

/// Checks that a mean spill size is usable.
///
/// # Errors
/// Returns an error if `mean` is not a positive finite number.
pub fn validate_mean(mean: f64) -> Result<()> {
    if mean.is_finite() && mean > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!(
            "mean events per spill must be positive and finite, got {mean}"
        )))
    }
}

/// Complete configuration of a reconstruction run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// Raw-to-local coordinate transform.
    pub transform: FrameTransform,
    /// Active-volume boundary planes.
    pub boundary: DetectorBoundary,
    /// Entry-face classification rule.
    pub policy: ClassificationPolicy,
    /// Event selection.
    pub extraction: ExtractionConfig,
    /// Beam normalisation.
    pub beam: BeamConfig,
    /// Output binning.
    pub histograms: HistogramConfig,
    /// Seed of the spill-size generator.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            transform: FrameTransform::default(),
            boundary: DetectorBoundary::default(),
            policy: ClassificationPolicy::default(),
            extraction: ExtractionConfig::default(),
            beam: BeamConfig::default(),
            histograms: HistogramConfig::default(),
            seed: 12345,
        }
    }
}

impl RunConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the classification policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ClassificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the beam normalisation.
    #[must_use]
    pub fn with_beam(mut self, beam: BeamConfig) -> Self {
        self.beam = beam;
        self
    }

    /// Sets the local-frame offset.
    #[must_use]
    pub fn with_transform(mut self, transform: FrameTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the output binning.
    #[must_use]
    pub fn with_histograms(mut self, histograms: HistogramConfig) -> Self {
        self.histograms = histograms;
        self
    }

    /// Checks the parts of the configuration that do not depend on the input.
    ///
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.histograms.validate()?;
        if !(self.transform.units_per_cm.is_finite() && self.transform.units_per_cm > 0.0) {
            return Err(Error::ConfigError(format!(
                "units_per_cm must be positive, got {}",
                self.transform.units_per_cm
            )));
        }
        if self.extraction.active_region.is_empty() {
            return Err(Error::ConfigError("active region name is empty".to_string()));
        }
        Ok(())
    }

    /// Face classifier for this configuration.
    #[must_use]
    pub fn classifier(&self) -> FaceClassifier {
        FaceClassifier::new(self.boundary, self.policy)
    }

    /// Muon extractor for this configuration.
    #[must_use]
    pub fn extractor(&self) -> MuonExtractor {
        MuonExtractor::new(self.extraction.clone(), self.transform, self.classifier())
    }
}
