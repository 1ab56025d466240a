//! Verify command implementation.

use super::run::autoplay_day;
use super::{clock_seed, CliError};
use hexcouncil::replay::{verify_determinism, Recording};
use hexcouncil::{NullDiagnostics, ReplayError, Rules, SeatAssignment, Session, TracingDiagnostics};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Aggregated verification results.
#[derive(Debug, Default)]
struct VerifyStats {
    /// Recordings checked.
    checked: u64,
    /// Recordings whose replays agreed.
    passed: u64,
    /// Label and error of every failed recording.
    failures: Vec<(String, String)>,
}

impl VerifyStats {
    fn add(&mut self, label: String, result: Result<(), ReplayError>) {
        self.checked += 1;
        match result {
            Ok(()) => self.passed += 1,
            Err(e) => self.failures.push((label, e.to_string())),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.checked += other.checked;
        self.passed += other.passed;
        self.failures.extend(other.failures);
        self
    }
}

/// A recording to check: loaded from disk or generated by autoplay.
enum Source {
    File(PathBuf),
    Generated(u64),
}

/// Execute the verify command.
///
/// # Errors
///
/// Returns an error if any recording fails verification.
pub(crate) fn execute(
    recordings: Vec<PathBuf>,
    generate: u64,
    players: Vec<SeatAssignment>,
    days: u32,
    seed: Option<u64>,
    threads: Option<usize>,
    progress: bool,
) -> Result<(), CliError> {
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = seed.unwrap_or_else(clock_seed);
    let mut sources: Vec<Source> = recordings.into_iter().map(Source::File).collect();
    sources.extend((0..generate).map(|i| Source::Generated(base_seed.wrapping_add(i))));

    let pb = if progress {
        let pb = ProgressBar::new(u64::try_from(sources.len()).unwrap_or(u64::MAX));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} recordings ({per_sec})")
                .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let rules = Arc::new(Rules::default());

    let stats = sources
        .par_iter()
        .fold(VerifyStats::default, |mut local, source| {
            let (label, result) = match source {
                Source::File(path) => (
                    path.display().to_string(),
                    Recording::load(path).and_then(|r| verify_determinism(&r, &mut TracingDiagnostics)),
                ),
                Source::Generated(seed) => (
                    format!("seed {seed}"),
                    generated_recording(&players, &rules, *seed, days)
                        .and_then(|r| verify_determinism(&r, &mut NullDiagnostics)),
                ),
            };
            local.add(label, result);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            local
        })
        .reduce(VerifyStats::default, VerifyStats::merge);

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();
    println!(
        "Verified {} recordings in {:.2}s: {} deterministic, {} failed",
        stats.checked,
        duration.as_secs_f64(),
        stats.passed,
        stats.failures.len()
    );
    for (label, error) in &stats.failures {
        println!("  {label}: {error}");
    }

    if stats.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::new(format!(
            "{} recordings failed verification",
            stats.failures.len()
        )))
    }
}

/// Play an autoplay session and record it.
fn generated_recording(
    players: &[SeatAssignment],
    rules: &Arc<Rules>,
    seed: u64,
    days: u32,
) -> Result<Recording, ReplayError> {
    let mut session = Session::new(players.to_vec(), Arc::clone(rules), seed)?;
    let mut diag = NullDiagnostics;
    for _ in 0..days {
        if session.is_over() {
            break;
        }
        autoplay_day(&mut session, &mut diag);
        session.advance(&mut diag)?;
    }
    Ok(Recording::from_session(&session))
}
