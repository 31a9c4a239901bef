//! Command-line driver for rock-muon spill reconstruction.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};

use rockmu_algorithms::{run, run_parallel_prefix_with_mean, run_with_mean, spill_extent, RunOutput};
use rockmu_core::{ClassificationPolicy, Face, RunConfig};
use rockmu_io::{EventFile, EventFileSet, HistogramWriter, SyntheticSample};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    RockmuIo(#[from] rockmu_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] rockmu_core::Error),

    #[error("Config file error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("no events left after skipping recovered files")]
    NoEvents,
}

/// Entry-face classification rule.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Nearest boundary plane (front, side, top, bottom)
    Nearest,
    /// Ordered z/y cuts (top, side, or unclassified)
    Threshold,
}

impl From<Policy> for ClassificationPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Nearest => ClassificationPolicy::NearestFace,
            Policy::Threshold => ClassificationPolicy::Threshold,
        }
    }
}

/// Rock-muon spill reconstruction.
#[derive(Parser)]
#[command(name = "rockmu")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build spills from event files and fill the muon histograms
    Process {
        /// Input event files (newline-delimited JSON), chained in order
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path (.json or .csv)
        #[arg(short, long, default_value = "rockmu.json")]
        output: PathBuf,

        /// Run configuration (JSON); flags below override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed of the spill-size generator
        #[arg(long)]
        seed: Option<u64>,

        /// Protons on target per spill
        #[arg(long)]
        spill_pot: Option<f64>,

        /// Protons on target represented by the input sample
        #[arg(long)]
        total_pot: Option<f64>,

        /// Mean events per spill (skips the POT scaling)
        #[arg(long)]
        mean: Option<f64>,

        /// Entry-face classification rule
        #[arg(short, long, value_enum)]
        policy: Option<Policy>,

        /// Active detector region name
        #[arg(long)]
        region: Option<String>,

        /// Decode the events the spills use, then extract muons in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show event counts of event files
    Info {
        /// Input event files
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },

    /// Write a synthetic event sample
    Generate {
        /// Output file path
        output: PathBuf,

        /// Number of events
        #[arg(short = 'n', long, default_value = "1000")]
        events: usize,

        /// Every N-th event carries a muon
        #[arg(long, default_value = "3")]
        muon_every: usize,
    },
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => Ok(RunConfig::default()),
    }
}

fn write_output(path: &Path, output: &RunOutput) -> Result<()> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| "json".to_string(), str::to_lowercase);
    let mut writer = HistogramWriter::create(path)?;
    match format.as_str() {
        "csv" => writer.write_csv(&output.histograms)?,
        "json" => writer.write_json(output)?,
        other => {
            log::warn!("Unknown extension '{}', defaulting to JSON", other);
            writer.write_json(output)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            seed,
            spill_pot,
            total_pot,
            mean,
            policy,
            region,
            parallel,
        } => {
            let mut run_config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                run_config.seed = seed;
            }
            if let Some(pot) = spill_pot {
                run_config.beam.spill_pot = pot;
            }
            if let Some(pot) = total_pot {
                run_config.beam.total_pot = pot;
            }
            if let Some(policy) = policy {
                run_config.policy = policy.into();
            }
            if let Some(region) = region {
                run_config.extraction.active_region = region;
            }

            log::info!("Processing {} file(s)...", input.len());
            let start = Instant::now();

            let set = EventFileSet::open(&input)?;
            if set.total_events() == 0 {
                return Err(CliError::NoEvents);
            }
            log::info!(
                "{} events in {} file(s), {} skipped",
                set.total_events(),
                set.files().len(),
                set.skipped().len()
            );

            let result = if parallel {
                run_config.validate()?;
                let total = set.total_events();
                let mean = match mean {
                    Some(mean) => mean,
                    None => run_config.beam.mean_events_per_spill(total)?,
                };
                // Trailing events that fill no spill are never decoded.
                let extent = spill_extent(total, &run_config, mean)?;
                let events = set.read_range(0..extent)?;
                run_parallel_prefix_with_mean(&events, total, &run_config, mean)?
            } else {
                match mean {
                    Some(mean) => run_with_mean(set, &run_config, mean)?,
                    None => run(set, &run_config)?,
                }
            };

            write_output(&output, &result)?;
            log::info!("Wrote {}", output.display());

            let summary = &result.summary;
            println!(
                "Processed {} events in {:.2}s",
                summary.total_events,
                start.elapsed().as_secs_f64()
            );
            println!(
                "{} spills produced from {} available events ({} dropped)",
                summary.spills, summary.total_events, summary.events_discarded
            );
            println!("Mean events per spill: {:.3}", summary.mean_events_per_spill);
            println!("Total muons: {}", summary.muons);
            if let Some(mean) = result.histograms.mean_multiplicity() {
                println!("Mean muons per spill: {:.3}", mean);
            }
            for face in Face::ALL {
                println!(
                    "  {:<7} {}",
                    face.name(),
                    result.histograms.face_totals[face.index()]
                );
            }
            if result.histograms.unclassified > 0 {
                println!("  {:<7} {}", "none", result.histograms.unclassified);
            }
        }

        Commands::Info { input } => {
            for path in &input {
                let file = EventFile::open(path)?;
                println!("File: {}", path.display());
                println!(
                    "Size: {} bytes ({:.2} MB)",
                    file.file_size(),
                    file.file_size() as f64 / 1_000_000.0
                );
                println!("Events: {}", file.event_count());
                if file.is_recovered() {
                    println!("Recovered: yes (truncated last record, skipped by process)");
                }
            }
        }

        Commands::Generate {
            output,
            events,
            muon_every,
        } => {
            let sample = SyntheticSample {
                events,
                muon_every,
                ..SyntheticSample::default()
            };
            sample.write_jsonl(&output)?;
            println!("Wrote {} events to {}", events, output.display());
        }
    }

    Ok(())
}
