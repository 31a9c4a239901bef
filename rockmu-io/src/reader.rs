//! Memory-mapped JSON-lines event files.
//!

use crate::{Error, Result};
use memmap2::Mmap;
use rockmu_core::{Event, EventSource};
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A memory-mapped file of newline-delimited JSON events.
///
/// Line boundaries are indexed on open; events are decoded on demand.
pub struct EventFile {
    mmap: Option<Mmap>,
    path: PathBuf,
    lines: Vec<Range<usize>>,
    recovered: bool,
}

impl EventFile {
    /// Opens and indexes a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
            #[allow(unsafe_code)]
            let mmap = unsafe { Mmap::map(&file)? };
            Some(mmap)
        };

        let bytes = mmap.as_deref().unwrap_or(&[]);
        let (lines, recovered) = index_lines(bytes);

        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
            lines,
            recovered,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.as_bytes().len()
    }

    /// Number of complete event records.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lines.len()
    }

    /// True if the last record was cut short (no trailing newline).
    ///
    /// The partial record is not indexed.
    #[must_use]
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Decodes the event at `index` within this file.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the record is not a
    /// valid event.
    pub fn read_event(&self, index: usize) -> Result<Event> {
        let range = self.lines.get(index).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "{}: record {index} out of range ({} records)",
                self.path.display(),
                self.lines.len()
            ))
        })?;
        let event = serde_json::from_slice(&self.as_bytes()[range.clone()])?;
        Ok(event)
    }

    /// Decodes every event in the file.
    ///
    /// # Errors
    /// Returns the first decoding error.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        (0..self.event_count()).map(|i| self.read_event(i)).collect()
    }
}

/// Splits `bytes` into non-blank lines. The second value is true when the
/// final line has no terminating newline; that line is left out.
fn index_lines(bytes: &[u8]) -> (Vec<Range<usize>>, bool) {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            if !bytes[start..i].trim_ascii().is_empty() {
                lines.push(start..i);
            }
            start = i + 1;
        }
    }
    let recovered = !bytes[start..].trim_ascii().is_empty();
    (lines, recovered)
}

/// Several event files chained into one indexed source, in the given order.
///
/// Recovered (truncated) files are skipped when the set is opened.
pub struct EventFileSet {
    files: Vec<EventFile>,
    /// Global index of the first event of each file.
    starts: Vec<usize>,
    total: usize,
    skipped: Vec<PathBuf>,
}

impl EventFileSet {
    /// Opens every path, skipping recovered files.
    ///
    /// # Errors
    /// Returns an error if any file cannot be opened.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        let mut starts = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        let mut total = 0usize;

        for path in paths {
            let file = EventFile::open(path)?;
            if file.is_recovered() {
                log::warn!("skipping recovered file {}", file.path().display());
                skipped.push(file.path().to_path_buf());
                continue;
            }
            log::debug!("{}: {} events", file.path().display(), file.event_count());
            starts.push(total);
            total += file.event_count();
            files.push(file);
        }

        Ok(Self {
            files,
            starts,
            total,
            skipped,
        })
    }

    /// Files that contribute events.
    #[must_use]
    pub fn files(&self) -> &[EventFile] {
        &self.files
    }

    /// Files left out because they were recovered.
    #[must_use]
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Total number of events across all files.
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.total
    }

    /// Decodes the event at global `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the record is invalid.
    pub fn get(&self, index: usize) -> Result<Event> {
        if index >= self.total {
            return Err(rockmu_core::Error::EventOutOfRange {
                index,
                len: self.total,
            }
            .into());
        }
        // Last file whose first event is <= index; empty files share a start
        // with their successor and are never selected.
        let file = self.starts.partition_point(|&start| start <= index) - 1;
        self.files[file].read_event(index - self.starts[file])
    }

    /// Decodes the events at global indices `range`, in order.
    ///
    /// # Errors
    /// Returns the first out-of-range or decoding error.
    pub fn read_range(&self, range: Range<usize>) -> Result<Vec<Event>> {
        range.map(|index| self.get(index)).collect()
    }
}

impl EventSource for EventFileSet {
    fn len(&self) -> usize {
        self.total
    }

    fn read_event(&mut self, index: usize) -> rockmu_core::Result<Event> {
        Ok(self.get(index)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_index_lines() {
        let (lines, recovered) = index_lines(b"a\n\nbb\n  \nccc\n");
        assert_eq!(lines, vec![0..1, 3..5, 9..12]);
        assert!(!recovered);

        let (lines, recovered) = index_lines(b"a\nbb");
        assert_eq!(lines, vec![0..1]);
        assert!(recovered);

        let (lines, recovered) = index_lines(b"");
        assert!(lines.is_empty());
        assert!(!recovered);
    }

    #[test]
    fn test_read_events() {
        let file = write_lines(concat!(
            r#"{"id":0,"regions":{"ArgonCube":[]},"trajectories":[]}"#,
            "\n",
            r#"{"id":1,"regions":{"ArgonCube":[{"start":{"x":1.0,"y":2.0,"z":3.0},"stop":{"x":4.0,"y":5.0,"z":6.0},"contributors":[0]}]},"trajectories":[{"pdg_code":-13}]}"#,
            "\n",
        ));
        let reader = EventFile::open(file.path()).unwrap();
        assert_eq!(reader.event_count(), 2);
        assert!(!reader.is_recovered());

        let event = reader.read_event(1).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.trajectories[0].pdg_code, -13);
        assert_eq!(event.hits("ArgonCube").unwrap()[0].contributors, vec![0]);
        assert!(reader.read_event(2).is_err());
    }

    #[test]
    fn test_empty_file() {
        let file = write_lines("");
        let reader = EventFile::open(file.path()).unwrap();
        assert_eq!(reader.event_count(), 0);
        assert_eq!(reader.file_size(), 0);
        assert!(!reader.is_recovered());
    }

    #[test]
    fn test_invalid_record() {
        let file = write_lines("{\"id\": \n");
        let reader = EventFile::open(file.path()).unwrap();
        assert!(matches!(reader.read_event(0), Err(Error::Json(_))));
    }

    #[test]
    fn test_file_set_chains_and_skips_recovered() {
        let a = write_lines("{\"id\":0}\n{\"id\":1}\n");
        let empty = write_lines("");
        let broken = write_lines("{\"id\":7}\n{\"id\":");
        let b = write_lines("{\"id\":2}\n{\"id\":3}\n{\"id\":4}\n");

        let mut set = EventFileSet::open(&[a.path(), empty.path(), broken.path(), b.path()]).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.files().len(), 3);
        assert_eq!(set.skipped(), &[broken.path().to_path_buf()]);

        let ids: Vec<_> = (0..5).map(|i| set.read_event(i).unwrap().id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert!(matches!(
            set.read_event(5),
            Err(rockmu_core::Error::EventOutOfRange { index: 5, len: 5 })
        ));
    }
}
