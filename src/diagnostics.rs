//! Leveled diagnostics passed into the engine.
//!
//! The engine never writes to a global logger. Intake, resolution, voting
//! and day advance take a `&mut dyn Diagnostics` and report through it; the
//! caller decides where the records go.

use std::fmt;

pub use tracing::Level;

/// Sink for engine diagnostics.
pub trait Diagnostics {
    /// Record one message at `level`.
    fn record(&mut self, level: Level, message: fmt::Arguments<'_>);

    /// Record a trace-level message.
    fn trace(&mut self, message: fmt::Arguments<'_>) {
        self.record(Level::TRACE, message);
    }

    /// Record a debug-level message.
    fn debug(&mut self, message: fmt::Arguments<'_>) {
        self.record(Level::DEBUG, message);
    }

    /// Record an info-level message.
    fn info(&mut self, message: fmt::Arguments<'_>) {
        self.record(Level::INFO, message);
    }

    /// Record a warning.
    fn warn(&mut self, message: fmt::Arguments<'_>) {
        self.record(Level::WARN, message);
    }

    /// Record an error.
    fn error(&mut self, message: fmt::Arguments<'_>) {
        self.record(Level::ERROR, message);
    }
}

/// Forwards every record to `tracing` under the `hexcouncil` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&mut self, level: Level, message: fmt::Arguments<'_>) {
        match level {
            Level::TRACE => tracing::trace!(target: "hexcouncil", "{message}"),
            Level::DEBUG => tracing::debug!(target: "hexcouncil", "{message}"),
            Level::INFO => tracing::info!(target: "hexcouncil", "{message}"),
            Level::WARN => tracing::warn!(target: "hexcouncil", "{message}"),
            _ => tracing::error!(target: "hexcouncil", "{message}"),
        }
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&mut self, _level: Level, _message: fmt::Arguments<'_>) {}
}

/// Keeps records in memory, oldest first.
#[derive(Debug, Default, Clone)]
pub struct CollectingDiagnostics {
    records: Vec<(Level, String)>,
}

impl CollectingDiagnostics {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// All records collected so far.
    #[must_use]
    pub fn records(&self) -> &[(Level, String)] {
        &self.records
    }

    /// Records at exactly `level`.
    pub fn at(&self, level: Level) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(move |(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn record(&mut self, level: Level, message: fmt::Arguments<'_>) {
        self.records.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_keeps_order_and_level() {
        let mut diag = CollectingDiagnostics::new();
        diag.info(format_args!("accepted {}", 1));
        diag.warn(format_args!("rejected {}", 2));
        diag.info(format_args!("accepted {}", 3));

        assert_eq!(diag.records().len(), 3);
        let infos: Vec<_> = diag.at(Level::INFO).collect();
        assert_eq!(infos, vec!["accepted 1", "accepted 3"]);
        assert_eq!(diag.at(Level::WARN).count(), 1);
    }

    #[test]
    fn test_null_and_tracing_accept_records() {
        let mut null = NullDiagnostics;
        null.error(format_args!("dropped"));
        let mut forward = TracingDiagnostics;
        forward.debug(format_args!("forwarded without a subscriber"));
    }
}
