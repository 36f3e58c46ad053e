//! CLI interface for stormjoin.
//!
//! Each subcommand is non-interactive: files in, rows or a report out.
//!
//! - `stormjoin merge` joins storm events onto outage observations.
//! - `stormjoin verify` checks whether a file is already grouped and
//!   time-ordered the way the forward join needs.
//!
//! Column names, tolerance and output naming come from the config file
//! (see [`Config`]); the flags below override the join settings.

mod format;

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use jiff::SignedDuration;

use crate::config::Config;
use crate::join::{self, EngineChoice, SortedStream};
use crate::model::Record;
use crate::{assemble, table};

use format::{format_merge_summary, format_verify_report};

/// stormjoin: match storm events to the outages that followed them.
#[derive(Debug, Parser)]
#[command(name = "stormjoin", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file. Defaults to `~/.stormjoin/config.toml` if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. stormjoin verify storms.jsonl --side events
  2. stormjoin merge --events storms.jsonl --observations outages.jsonl.zst \
       --tolerance 2h --out merged.jsonl

Inputs are JSON Lines, one object per row; `.zst` files are decompressed.
Every event produces exactly one output row."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join each event to the earliest same-key observation in its window.
    ///
    /// The merged rows are written to `--out` (if given) or stdout.
    /// A one-line summary is printed to stderr.
    Merge {
        /// Event (left side) file.
        #[arg(long)]
        events: PathBuf,

        /// Observation (right side) file.
        #[arg(long)]
        observations: PathBuf,

        /// Write merged rows to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum gap after an event, e.g. `2h`, `90m` or `PT2H`.
        #[arg(long)]
        tolerance: Option<SignedDuration>,

        /// Join engine to use.
        #[arg(long, value_enum)]
        engine: Option<EngineArg>,

        /// Sweep key groups in parallel.
        #[arg(long, overrides_with = "no_parallel")]
        parallel: bool,

        /// Sweep key groups one at a time, even if the config says parallel.
        #[arg(long, overrides_with = "parallel")]
        no_parallel: bool,
    },

    /// Check that a file is grouped by key and time-ordered within each key.
    ///
    /// Reports the first violation, if any. The file is checked as it is
    /// on disk, without sorting.
    Verify {
        /// File to check.
        path: PathBuf,

        /// Which side's key and time columns to use.
        #[arg(long, value_enum, default_value = "events")]
        side: SideArg,
    },
}

/// CLI-facing engine choice, mapped to the domain `EngineChoice`.
#[derive(Debug, Clone, ValueEnum)]
pub enum EngineArg {
    /// Sorted forward sweep, with brute force as a fallback.
    Forward,
    /// Brute-force scan only.
    BruteForce,
}

impl EngineArg {
    fn to_domain(&self) -> EngineChoice {
        match self {
            Self::Forward => EngineChoice::Forward,
            Self::BruteForce => EngineChoice::BruteForce,
        }
    }
}

/// CLI-facing input side.
#[derive(Debug, Clone, ValueEnum)]
pub enum SideArg {
    Events,
    Observations,
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Merge {
            events,
            observations,
            out,
            tolerance,
            engine,
            parallel,
            no_parallel,
        } => {
            let mut config = config;
            if let Some(tolerance) = tolerance {
                config.tolerance = tolerance;
            }
            if let Some(engine) = engine {
                config.engine = engine.to_domain();
            }
            if parallel || no_parallel {
                config.parallel = parallel;
            }
            cmd_merge(&config, &events, &observations, out.as_deref())
        }
        Command::Verify { path, side } => cmd_verify(&config, &path, &side),
    }
}

fn cmd_merge(
    config: &Config,
    events_path: &Path,
    observations_path: &Path,
    out: Option<&Path>,
) -> Result<(), String> {
    let events = table::load(events_path, &config.events, config.key_width)
        .map_err(|e| format!("failed to load events: {e}"))?;
    let observations = table::load(observations_path, &config.observations, config.key_width)
        .map_err(|e| format!("failed to load observations: {e}"))?;

    let outcome = join::run(
        &events,
        &observations,
        Record::key,
        Record::key,
        Record::time,
        Record::time,
        &config.join_options(),
    )
    .map_err(|e| e.to_string())?;

    let results = outcome.results(&events, &observations, Record::time);
    let rows = assemble::assemble(&results, &config.layout());

    match out {
        Some(path) => {
            table::write(path, &rows).map_err(|e| format!("failed to write output: {e}"))?;
        }
        None => {
            table::write_to(io::stdout().lock(), &rows)
                .map_err(|e| format!("failed to write output: {e}"))?;
        }
    }

    eprintln!("{}", format_merge_summary(&outcome));
    Ok(())
}

fn cmd_verify(config: &Config, path: &Path, side: &SideArg) -> Result<(), String> {
    let columns = match side {
        SideArg::Events => &config.events,
        SideArg::Observations => &config.observations,
    };
    let records = table::load(path, columns, config.key_width)
        .map_err(|e| format!("failed to load {}: {e}", path.display()))?;

    let stream = SortedStream::as_given(&records, Record::key, Record::time);
    let order = join::validate_order(&stream);
    let regression = stream.first_key_regression();

    let report = format_verify_report(&stream, order.as_ref().err(), regression);
    if order.is_err() || regression.is_some() {
        return Err(report);
    }
    println!("{report}");
    Ok(())
}
