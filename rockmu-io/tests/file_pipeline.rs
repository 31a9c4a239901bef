use rockmu_algorithms::{run, run_parallel_prefix_with_mean, run_with_mean, spill_extent};
use rockmu_core::{BeamConfig, EventSource, RunConfig};
use rockmu_io::{EventFileSet, HistogramWriter, SyntheticSample};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_file_source_matches_memory() {
    let dir = tempdir().unwrap();
    let sample = SyntheticSample::default();
    let events = sample.build();

    // Split the sample over two files.
    let paths = [dir.path().join("rock.0.jsonl"), dir.path().join("rock.1.jsonl")];
    for (path, chunk) in paths.iter().zip(events.chunks(600)) {
        let mut file = std::fs::File::create(path).unwrap();
        for event in chunk {
            serde_json::to_writer(&mut file, event).unwrap();
            file.write_all(b"\n").unwrap();
        }
    }

    let set = EventFileSet::open(&paths).unwrap();
    assert_eq!(set.len(), 1000);

    let config = RunConfig::default();
    let from_files = run_with_mean(set, &config, 5.0).unwrap();
    let from_memory = run_with_mean(events, &config, 5.0).unwrap();
    assert_eq!(from_files, from_memory);
    assert_eq!(from_files.summary.spills, 198);
}

#[test]
fn test_corrupt_tail_is_never_decoded() {
    let file = NamedTempFile::new().unwrap();
    SyntheticSample {
        events: 999,
        ..SyntheticSample::default()
    }
    .write_jsonl(file.path())
    .unwrap();
    // Event 999 is past the last complete spill for this seed and mean.
    std::fs::OpenOptions::new()
        .append(true)
        .open(file.path())
        .unwrap()
        .write_all(b"{\"id\": \"not an event\"}\n")
        .unwrap();

    let set = EventFileSet::open(&[file.path()]).unwrap();
    assert_eq!(set.total_events(), 1000);
    assert!(set.get(999).is_err());

    let config = RunConfig::default();
    let extent = spill_extent(set.total_events(), &config, 5.0).unwrap();
    assert_eq!(extent, 999);
    let events = set.read_range(0..extent).unwrap();
    let parallel = run_parallel_prefix_with_mean(&events, set.total_events(), &config, 5.0).unwrap();

    let sequential = run_with_mean(set, &config, 5.0).unwrap();
    assert_eq!(parallel, sequential);
    assert_eq!(sequential.summary.events_discarded, 1);
}

#[test]
fn test_recovered_file_is_skipped_in_run() {
    let good = NamedTempFile::new().unwrap();
    SyntheticSample {
        events: 300,
        ..SyntheticSample::default()
    }
    .write_jsonl(good.path())
    .unwrap();

    let mut broken = NamedTempFile::new().unwrap();
    broken.write_all(b"{\"id\":0,\"regions\":").unwrap();
    broken.flush().unwrap();

    let set = EventFileSet::open(&[good.path(), broken.path()]).unwrap();
    assert_eq!(set.skipped().len(), 1);

    let config = RunConfig::new().with_beam(BeamConfig {
        spill_pot: 1.0,
        total_pot: 50.0,
    });
    let output = run(set, &config).unwrap();
    assert_eq!(output.summary.total_events, 300);
    assert!((output.summary.mean_events_per_spill - 6.0).abs() < 1e-12);
    assert!(output.summary.spills > 0);
}

#[test]
fn test_write_outputs() {
    let dir = tempdir().unwrap();
    let output = run_with_mean(SyntheticSample::default().build(), &RunConfig::default(), 5.0).unwrap();

    let json = dir.path().join("rockmu.json");
    HistogramWriter::create(&json).unwrap().write_json(&output).unwrap();
    let csv = dir.path().join("rockmu.csv");
    HistogramWriter::create(&csv).unwrap().write_csv(&output.histograms).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["summary"]["spills"], 198);
    assert!(std::fs::read_to_string(&csv).unwrap().starts_with("name,"));
}
