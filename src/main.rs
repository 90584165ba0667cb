//! hwhouse - Hardware inventory and quick benchmarks
//!
//! Collects a snapshot of the machine's hardware (system, CPU, GPU, memory,
//! storage, network, firmware, sound, battery, displays, identity), shows it in
//! a fullscreen terminal UI, runs small CPU/memory/disk benchmarks and exports
//! the report as JSON or CSV.

mod benchmark_runner;
mod config;
mod controller;
mod export;
mod hardware;
mod snapshot;
mod tui;

use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use crate::benchmark_runner::BenchmarkKind;
use crate::config::Config;
use crate::controller::{AppContext, Display, DisplayController, Notice, NoticeKind};
use crate::export::ExportFormat;
use crate::hardware::{FieldValue, SysinfoSource};
use crate::snapshot::Snapshot;

/// Environment variable with the highest-priority log filter.
const LOG_ENV: &str = "HWHOUSE_LOG";
const LOG_FILE_NAME: &str = "hwhouse.log";

/// hwhouse - Inspect, benchmark and export your hardware
#[derive(Parser)]
#[command(name = "hwhouse")]
#[command(version)]
#[command(about = "Inspect your hardware, run quick benchmarks and export a report")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the fullscreen terminal UI (default)
    Ui,

    /// Detect and print the hardware report
    Detect,

    /// Write the hardware report to a file
    Export {
        /// Report format: json or csv
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Destination file (defaults to <export dir>/<file stem>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run benchmarks and print their results
    Bench {
        /// Benchmark to run
        #[arg(short, long, value_enum, default_value_t = BenchKindArg::All)]
        kind: BenchKindArg,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum BenchKindArg {
    Cpu,
    #[value(alias = "mem", alias = "ram")]
    Memory,
    Disk,
    All,
}

impl BenchKindArg {
    fn kinds(self) -> Vec<BenchmarkKind> {
        match self {
            BenchKindArg::Cpu => vec![BenchmarkKind::Cpu],
            BenchKindArg::Memory => vec![BenchmarkKind::Memory],
            BenchKindArg::Disk => vec![BenchmarkKind::Disk],
            BenchKindArg::All => BenchmarkKind::ALL.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref());

    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
    let command = match cli.command {
        Some(Commands::Ui) | None if !interactive => {
            println!(
                "{}",
                "Not running in a terminal, printing the report instead.".bright_yellow()
            );
            Commands::Detect
        }
        Some(command) => command,
        None => Commands::Ui,
    };
    // The TUI owns the terminal, so it logs to a file instead of stderr.
    init_tracing(&config, matches!(command, Commands::Ui));

    let ctx = AppContext::new(config, Arc::new(SysinfoSource));

    match command {
        Commands::Ui => tui::run_tui(ctx)?,
        Commands::Detect => {
            let mut controller = DisplayController::new(ctx, ConsoleDisplay);
            controller.on_open()?;
            if let Some(snapshot) = controller.snapshot() {
                print_snapshot(snapshot);
            }
        }
        Commands::Export { format, output } => {
            let mut controller = DisplayController::new(ctx, ConsoleDisplay);
            controller.on_open()?;
            controller.on_export(format, output)?;
        }
        Commands::Bench { kind } => {
            let mut controller = DisplayController::new(ctx, ConsoleDisplay);
            for kind in kind.kinds() {
                println!(
                    "{} {}",
                    "Running".bright_cyan(),
                    format!("{kind} benchmark...").bright_white()
                );
                controller.on_run_benchmark(kind)?;
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    match loaded {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{} {:#}",
                "Could not load config, using defaults:".bright_yellow(),
                err
            );
            Config::default()
        }
    }
}

/// Filter priority: `HWHOUSE_LOG`, then `RUST_LOG`, then the config file.
fn init_tracing(config: &Config, to_file: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    if to_file {
        match open_log_file() {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            // Nowhere to log without corrupting the screen.
            Err(_) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(io::sink)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}

fn open_log_file() -> Result<File> {
    let dir = config::data_dir()?;
    fs::create_dir_all(&dir)?;
    let file = File::options()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    Ok(file)
}

/// Line-oriented `Display` for the non-interactive commands.
///
/// Reports are printed by the command once the controller is done, so
/// `render` has nothing to do.
struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    fn render(&mut self, _snapshot: &Snapshot) {}

    fn set_controls_enabled(&mut self, _enabled: bool) {}

    fn show_message(&mut self, notice: Notice) {
        let title = match notice.kind {
            NoticeKind::Info => format!("✓ {}", notice.title).bright_green().bold(),
            NoticeKind::Busy => format!("… {}", notice.title).bright_yellow().bold(),
            NoticeKind::Error => format!("✗ {}", notice.title).bright_red().bold(),
        };
        println!("{title}: {}", notice.message);
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    for (category, fields) in snapshot.iter() {
        println!("\n{}", category.label().to_uppercase().bright_cyan().bold());
        let width = fields.names().map(str::len).max().unwrap_or(0);
        for (name, value) in fields.iter() {
            let value = match value {
                FieldValue::Unavailable => value.to_string().dimmed(),
                _ => value.to_string().bright_white(),
            };
            println!("  {}  {}", format!("{name:<width$}").bright_black(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bench_kind_is_validated_by_clap() {
        let err = Cli::try_parse_from(["hwhouse", "bench", "--kind", "gpu"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);

        let cli = Cli::try_parse_from(["hwhouse", "bench", "-k", "ram"]).unwrap();
        match cli.command {
            Some(Commands::Bench { kind }) => {
                assert_eq!(kind, BenchKindArg::Memory);
                assert_eq!(kind.kinds(), vec![BenchmarkKind::Memory]);
            }
            _ => panic!("expected the bench command"),
        }
    }

    #[test]
    fn bench_runs_everything_by_default() {
        let cli = Cli::try_parse_from(["hwhouse", "bench"]).unwrap();
        match cli.command {
            Some(Commands::Bench { kind }) => {
                assert_eq!(kind, BenchKindArg::All);
                assert_eq!(kind.kinds(), BenchmarkKind::ALL.to_vec());
            }
            _ => panic!("expected the bench command"),
        }
    }
}
