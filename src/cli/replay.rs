//! Replay command implementation.

use super::output::{format_day, format_text, JsonSessionResult};
use super::{CliError, OutputFormat};
use hexcouncil::replay::{render_text, Recording, ReplayEngine};
use hexcouncil::TracingDiagnostics;
use std::path::PathBuf;

/// Execute the replay command.
///
/// # Errors
///
/// Returns an error if the recording cannot be loaded or replayed.
pub(crate) fn execute(
    recording_path: PathBuf,
    format: OutputFormat,
    day: Option<u32>,
    every_day: bool,
) -> Result<(), CliError> {
    let recording = Recording::load(&recording_path).map_err(|e| {
        CliError::new(format!("Failed to load recording {}: {e}", recording_path.display()))
    })?;
    let target = day.unwrap_or_else(|| recording.day_count());
    if target > recording.day_count() {
        return Err(CliError::new(format!(
            "Day {target} out of bounds (recording holds {} days)",
            recording.day_count()
        )));
    }

    let mut diag = TracingDiagnostics;
    let mut engine = ReplayEngine::new(recording)?;
    let text = format == OutputFormat::Text;

    if text {
        println!("Replay of session (seed: {})", engine.recording().seed);
        println!("Recorded days: {}", engine.recording().day_count());
        println!();
        if every_day {
            println!("=== Day 0 ===");
            println!("{}", render_text(engine.state()));
        }
    }

    let mut reports = Vec::new();
    while engine.day() < target {
        let report = engine.step_forward(&mut diag)?;
        if text && every_day {
            print!("{}", format_day(engine.session(), &report, true));
            println!("{}", render_text(engine.state()));
        }
        reports.push(report);
    }

    match format {
        OutputFormat::Text => {
            print!("{}", format_text(engine.session()));
        }
        OutputFormat::Json => {
            let json_result = JsonSessionResult::from_session(engine.session(), &reports);
            let json = serde_json::to_string_pretty(&json_result)?;
            println!("{json}");
        }
    }

    Ok(())
}
