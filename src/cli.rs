//! CLI command implementations for hexcouncil.

pub(crate) mod replay;
pub(crate) mod rules;
pub(crate) mod run;
pub(crate) mod verify;

mod output;

use clap::ValueEnum;
use hexcouncil::SeatAssignment;
use std::error::Error;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Output format for the `run` and `replay` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<hexcouncil::SessionError> for CliError {
    fn from(e: hexcouncil::SessionError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<hexcouncil::ReplayError> for CliError {
    fn from(e: hexcouncil::ReplayError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<hexcouncil::RulesError> for CliError {
    fn from(e: hexcouncil::RulesError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<hexcouncil::CodecError> for CliError {
    fn from(e: hexcouncil::CodecError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {e}"))
    }
}

/// Parse a `name[:faction]` player argument.
pub(crate) fn parse_seat(arg: &str) -> Result<SeatAssignment, String> {
    let (name, faction) = match arg.split_once(':') {
        Some((name, faction)) => {
            let faction = faction
                .parse::<u8>()
                .map_err(|e| format!("invalid faction index in {arg:?}: {e}"))?;
            (name, faction)
        }
        None => (arg, 0),
    };
    if name.is_empty() {
        return Err(format!("missing player name in {arg:?}"));
    }
    if name.len() > usize::from(u8::MAX) {
        return Err(format!("player name longer than {} bytes", u8::MAX));
    }
    Ok(SeatAssignment::new(name, faction))
}

/// Seed from the clock, for runs without `--seed`.
pub(crate) fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(42)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seat() {
        assert_eq!(parse_seat("ada:3"), Ok(SeatAssignment::new("ada", 3)));
        assert_eq!(parse_seat("brn"), Ok(SeatAssignment::new("brn", 0)));
        assert!(parse_seat(":1").is_err());
        assert!(parse_seat("ada:x").is_err());
    }
}
