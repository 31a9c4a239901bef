//! Fixed-range binned count tables.
//!
//! Both histogram types keep one underflow and one overflow slot per axis, so
//! every fill is counted somewhere and `entries()` always equals the number of
//! fills.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A uniformly binned axis over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axis {
    /// Number of in-range bins.
    pub bins: usize,
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
}

impl Axis {
    /// Creates an axis.
    ///
    /// # Errors
    /// Returns an error if `bins` is zero or the range is empty or not finite.
    pub fn new(bins: usize, min: f64, max: f64) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidHistogram("axis needs at least one bin".to_string()));
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(Error::InvalidHistogram(format!(
                "axis range [{min}, {max}) is empty or not finite"
            )));
        }
        Ok(Self { bins, min, max })
    }

    /// Width of one bin.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Lower edge of in-range bin `bin`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn low_edge(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.bin_width()
    }

    /// Center of in-range bin `bin`.
    #[inline]
    #[must_use]
    pub fn center(&self, bin: usize) -> f64 {
        self.low_edge(bin) + 0.5 * self.bin_width()
    }

    /// Slot for `value`: 0 is underflow, `bins + 1` is overflow, in-range bin
    /// `i` is slot `i + 1`. NaN goes to overflow.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn slot(&self, value: f64) -> usize {
        if value < self.min {
            return 0;
        }
        if value.is_nan() || value >= self.max {
            return self.bins + 1;
        }
        let bin = ((value - self.min) / self.bin_width()) as usize;
        // Rounding can land a value just below max on `bins`.
        bin.min(self.bins - 1) + 1
    }
}

/// One-dimensional count histogram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram1D {
    /// Accumulator name.
    pub name: String,
    /// Axis title.
    pub title: String,
    /// Binning.
    pub axis: Axis,
    /// Slot counts, underflow first and overflow last.
    counts: Vec<u64>,
}

impl Histogram1D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>, axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            axis,
            counts: vec![0; axis.bins + 2],
        }
    }

    /// Adds one count at `value`.
    #[inline]
    pub fn fill(&mut self, value: f64) {
        let slot = self.axis.slot(value);
        self.counts[slot] += 1;
    }

    /// Count in in-range bin `bin`, or `None` if `bin` is out of range.
    #[must_use]
    pub fn bin_content(&self, bin: usize) -> Option<u64> {
        (bin < self.axis.bins).then(|| self.counts[bin + 1])
    }

    /// In-range bin counts.
    #[must_use]
    pub fn contents(&self) -> &[u64] {
        &self.counts[1..=self.axis.bins]
    }

    /// Fills below the axis range.
    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.counts[0]
    }

    /// Fills at or above the axis range.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.counts[self.axis.bins + 1]
    }

    /// Total number of fills, flows included.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum of in-range bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        self.contents().iter().sum()
    }

    /// Mean of the in-range bin centers weighted by count, or `None` if empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        let total = self.integral();
        if total == 0 {
            return None;
        }
        let sum: f64 = self
            .contents()
            .iter()
            .enumerate()
            .map(|(bin, &count)| self.axis.center(bin) * count as f64)
            .sum();
        Some(sum / total as f64)
    }

    /// In-range bin contents divided by the in-range integral.
    ///
    /// All zeros when the histogram is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fractions(&self) -> Vec<f64> {
        let total = self.integral();
        if total == 0 {
            return vec![0.0; self.axis.bins];
        }
        self.contents()
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect()
    }
}

/// Two-dimensional count histogram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Histogram2D {
    /// Accumulator name.
    pub name: String,
    /// Axis titles, `"x;y"`.
    pub title: String,
    /// X binning.
    pub x_axis: Axis,
    /// Y binning.
    pub y_axis: Axis,
    /// Slot counts in row-major order: `counts[y_slot * (nx + 2) + x_slot]`.
    counts: Vec<u64>,
}

impl Histogram2D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>, x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_axis,
            y_axis,
            counts: vec![0; (x_axis.bins + 2) * (y_axis.bins + 2)],
        }
    }

    #[inline]
    fn stride(&self) -> usize {
        self.x_axis.bins + 2
    }

    /// Adds one count at `(x, y)`.
    #[inline]
    pub fn fill(&mut self, x: f64, y: f64) {
        let idx = self.y_axis.slot(y) * self.stride() + self.x_axis.slot(x);
        self.counts[idx] += 1;
    }

    /// Count in in-range bin `(bx, by)`, or `None` if out of range.
    #[must_use]
    pub fn bin_content(&self, bx: usize, by: usize) -> Option<u64> {
        if bx < self.x_axis.bins && by < self.y_axis.bins {
            Some(self.counts[(by + 1) * self.stride() + bx + 1])
        } else {
            None
        }
    }

    /// Total number of fills, flows included.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum of in-range bins.
    #[must_use]
    pub fn integral(&self) -> u64 {
        let stride = self.stride();
        (1..=self.y_axis.bins)
            .map(|ys| self.counts[ys * stride + 1..=ys * stride + self.x_axis.bins].iter().sum::<u64>())
            .sum()
    }

    /// Projection onto the x axis over in-range y bins.
    #[must_use]
    pub fn project_x(&self) -> Vec<u64> {
        let mut out = vec![0u64; self.x_axis.bins];
        for by in 0..self.y_axis.bins {
            for (bx, slot) in out.iter_mut().enumerate() {
                *slot += self.counts[(by + 1) * self.stride() + bx + 1];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_validation() {
        assert!(Axis::new(0, 0.0, 1.0).is_err());
        assert!(Axis::new(10, 1.0, 1.0).is_err());
        assert!(Axis::new(10, 2.0, 1.0).is_err());
        assert!(Axis::new(10, 0.0, f64::INFINITY).is_err());
        assert!(Axis::new(30, 0.0, 30.0).is_ok());
    }

    #[test]
    fn test_axis_slots() {
        let axis = Axis::new(30, 0.0, 30.0).unwrap();
        assert_eq!(axis.slot(-0.5), 0);
        assert_eq!(axis.slot(0.0), 1);
        assert_eq!(axis.slot(2.0), 3);
        assert_eq!(axis.slot(29.999), 30);
        assert_eq!(axis.slot(30.0), 31);
        assert_eq!(axis.slot(f64::NAN), 31);
        assert_relative_eq!(axis.bin_width(), 1.0);
        assert_relative_eq!(axis.center(4), 4.5);
    }

    #[test]
    fn test_fill_1d_with_flows() {
        let mut h = Histogram1D::new("mult", "Muons per spill", Axis::new(5, 0.0, 5.0).unwrap());
        for v in [0.0, 1.0, 1.0, 4.0, 7.0, -1.0] {
            h.fill(v);
        }
        assert_eq!(h.contents(), &[1, 2, 0, 0, 1]);
        assert_eq!(h.bin_content(1), Some(2));
        assert_eq!(h.bin_content(5), None);
        assert_eq!(h.underflow(), 1);
        assert_eq!(h.overflow(), 1);
        assert_eq!(h.entries(), 6);
        assert_eq!(h.integral(), 4);
    }

    #[test]
    fn test_mean_and_fractions() {
        let mut h = Histogram1D::new("mult", "", Axis::new(4, 0.0, 4.0).unwrap());
        assert_eq!(h.mean(), None);
        assert_eq!(h.fractions(), vec![0.0; 4]);

        h.fill(1.0);
        h.fill(3.0);
        h.fill(3.0);
        h.fill(3.0);
        assert_relative_eq!(h.mean().unwrap(), 3.0);
        let f = h.fractions();
        assert_relative_eq!(f[1], 0.25);
        assert_relative_eq!(f[3], 0.75);
        assert_relative_eq!(f.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_fill_2d() {
        let mut h = Histogram2D::new(
            "entry_xy",
            "Entry x (cm);Entry y (cm)",
            Axis::new(72, -360.0, 360.0).unwrap(),
            Axis::new(32, -160.0, 160.0).unwrap(),
        );
        h.fill(0.0, 0.0);
        h.fill(5.0, 5.0);
        h.fill(-357.0, 149.0);
        h.fill(400.0, 0.0);

        assert_eq!(h.bin_content(36, 16), Some(2));
        assert_eq!(h.bin_content(0, 30), Some(1));
        assert_eq!(h.bin_content(72, 0), None);
        assert_eq!(h.entries(), 4);
        assert_eq!(h.integral(), 3);
        assert_eq!(h.project_x().iter().sum::<u64>(), 3);
    }
}
