//! Output writers for run histograms.

use crate::Result;
use rockmu_algorithms::{MuonHistograms, RunOutput};
use rockmu_core::{Axis, Histogram1D, Histogram2D};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for run output.
///
/// Only aggregate histograms and run counts are written; individual muons
/// are not persisted.
pub struct HistogramWriter {
    writer: BufWriter<File>,
}

impl HistogramWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the whole run output (histograms and summary) as one JSON document.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_json(&mut self, output: &RunOutput) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, output)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes every in-range bin of every accumulator as CSV.
    ///
    /// Columns: `name,x_bin,x_low,x_high,y_bin,y_low,y_high,count`; the y
    /// columns are empty for 1D accumulators.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_csv(&mut self, histograms: &MuonHistograms) -> Result<()> {
        writeln!(self.writer, "name,x_bin,x_low,x_high,y_bin,y_low,y_high,count")?;
        for hist in histograms.histograms_1d() {
            self.write_1d_rows(hist)?;
        }
        self.write_2d_rows(&histograms.entry_xy)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_1d_rows(&mut self, hist: &Histogram1D) -> Result<()> {
        for (bin, count) in hist.contents().iter().enumerate() {
            let (low, high) = edges(&hist.axis, bin);
            writeln!(self.writer, "{},{bin},{low},{high},,,,{count}", hist.name)?;
        }
        Ok(())
    }

    fn write_2d_rows(&mut self, hist: &Histogram2D) -> Result<()> {
        for by in 0..hist.y_axis.bins {
            let (y_low, y_high) = edges(&hist.y_axis, by);
            for bx in 0..hist.x_axis.bins {
                let (x_low, x_high) = edges(&hist.x_axis, bx);
                let count = hist.bin_content(bx, by).unwrap_or(0);
                writeln!(
                    self.writer,
                    "{},{bx},{x_low},{x_high},{by},{y_low},{y_high},{count}",
                    hist.name
                )?;
            }
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn edges(axis: &Axis, bin: usize) -> (f64, f64) {
    (axis.low_edge(bin), axis.low_edge(bin + 1))
}
