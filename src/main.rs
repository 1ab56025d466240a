//! Hexcouncil CLI - command-line interface for running and replaying sessions.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use hexcouncil::SeatAssignment;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Hexcouncil - a deterministic hex-grid conquest and council engine
#[derive(Parser, Debug)]
#[command(name = "hexcouncil")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log more (-v info, -vv debug); `RUST_LOG` overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a session from an action log or by autoplay
    Run {
        /// Players as `name[:faction]` (1-8 players)
        #[arg(required = true, num_args = 1..=8, value_parser = cli::parse_seat)]
        players: Vec<SeatAssignment>,

        /// Rules JSON file (default: stock rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Days to play (default: 20)
        #[arg(short, long, default_value = "20")]
        days: u32,

        /// Action log: a JSON array with one array of actions per day
        #[arg(short, long)]
        actions: Option<PathBuf>,

        /// Let every seat play automatically on days the log does not cover
        #[arg(long)]
        autoplay: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save recording to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Save a session snapshot to file
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Suppress day-by-day output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Replay a recorded session
    Replay {
        /// Recording file
        #[arg(required = true)]
        recording: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Stop at a specific day (default: last recorded day)
        #[arg(short, long)]
        day: Option<u32>,

        /// Print the map after every day
        #[arg(long)]
        every_day: bool,
    },

    /// Check that recordings replay identically, in parallel
    Verify {
        /// Recording files
        recordings: Vec<PathBuf>,

        /// Also generate and check this many autoplay sessions
        #[arg(short, long, default_value = "0")]
        generate: u64,

        /// Players of generated sessions
        #[arg(long, value_parser = cli::parse_seat, default_values = ["red:0", "blue:1", "green:4"])]
        players: Vec<SeatAssignment>,

        /// Days per generated session
        #[arg(short, long, default_value = "20")]
        days: u32,

        /// Starting seed of generated sessions (increments for each)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Print a rule set as JSON
    Rules {
        /// Rules file to normalize (default: stock rules)
        path: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            players,
            rules,
            seed,
            days,
            actions,
            autoplay,
            format,
            save,
            snapshot,
            quiet,
        } => cli::run::execute(
            players, rules, seed, days, actions, autoplay, format, save, snapshot, quiet,
        ),

        Commands::Replay {
            recording,
            format,
            day,
            every_day,
        } => cli::replay::execute(recording, format, day, every_day),

        Commands::Verify {
            recordings,
            generate,
            players,
            days,
            seed,
            threads,
            progress,
        } => cli::verify::execute(recordings, generate, players, days, seed, threads, progress),

        Commands::Rules { path } => cli::rules::execute(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
