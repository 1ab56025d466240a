//! Session recording and replay.
//!
//! Because sessions are fully deterministic, a recording only needs:
//! - `seed: u64` - the random seed
//! - `rules` - the rule set the session played under
//! - `party` - the players and their factions
//! - `days` - the transforms accepted on each day
//!
//! No state deltas are stored. To view day N, re-run the session from day 0
//! to N, feeding each day's transforms back through intake.
//!
//! # Time Travel
//!
//! - **Forward**: Continue advancing the session
//! - **Backward**: Re-run from day 0 to (`current_day` - 1)
//! - **Jump to day N**: Re-run from day 0 to N, or step forward when N is ahead

mod render;

pub use render::render_text;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, ReplayError};
use crate::game::{GameState, Rules, Transform};
use crate::session::{DayReport, SeatAssignment, Session};

/// Minimal recording - seed, rules, party and accepted transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Random seed of the session.
    pub seed: u64,
    /// Rule set of the session.
    pub rules: Arc<Rules>,
    /// Players, in seat order.
    pub party: Vec<SeatAssignment>,
    /// Transforms accepted on each day.
    pub days: Vec<Vec<Transform>>,
}

impl Recording {
    const MAGIC: &'static [u8; 4] = b"HXRC";
    const VERSION: u8 = 1;

    /// Create an empty recording.
    #[must_use]
    pub const fn new(seed: u64, rules: Arc<Rules>, party: Vec<SeatAssignment>) -> Self {
        Self {
            seed,
            rules,
            party,
            days: Vec::new(),
        }
    }

    /// Record every day `session` has played so far.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            seed: session.seed(),
            rules: session.state().world.shared_rules(),
            party: session.party().to_vec(),
            days: session.journal().to_vec(),
        }
    }

    /// Number of recorded days.
    #[must_use]
    pub fn day_count(&self) -> u32 {
        u32::try_from(self.days.len()).unwrap_or(u32::MAX)
    }

    /// Save recording to a file.
    ///
    /// Format: a 4-byte magic header and a version byte, then the seed,
    /// rules, party and per-day transform lists in the session codec.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or file operations fail.
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Load recording from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file operations fail or the format is invalid.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

impl Encode for Recording {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_raw(Self::MAGIC);
        enc.put_u8(Self::VERSION);
        enc.put_u64(self.seed);
        self.rules.encode(enc)?;
        enc.put_seq(&self.party)?;
        enc.put_count(self.days.len())?;
        for day in &self.days {
            enc.put_seq(day)?;
        }
        Ok(())
    }
}

impl Decode for Recording {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        if dec.get_raw(Self::MAGIC.len())? != Self::MAGIC {
            return Err(CodecError::BadMagic);
        }
        dec.get_version("recording", Self::VERSION)?;
        let seed = dec.get_u64()?;
        let rules = Arc::new(Rules::decode(dec)?);
        let party = dec.get_seq()?;
        let count = usize::from(dec.get_u16()?);
        let mut days = Vec::with_capacity(count.min(dec.remaining()));
        for _ in 0..count {
            days.push(dec.get_seq()?);
        }
        Ok(Self {
            seed,
            rules,
            party,
            days,
        })
    }
}

/// Replay engine - steps through a recording deterministically.
///
/// Since sessions are deterministic, this engine can:
/// - Step forward by replaying one recorded day
/// - Step backward by replaying from day 0
/// - Jump to any day by replaying from day 0
pub struct ReplayEngine {
    recording: Recording,
    session: Session,
    current_day: u32,
}

impl fmt::Debug for ReplayEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("current_day", &self.current_day)
            .field("days", &self.recording.days.len())
            .field("is_over", &self.session.is_over())
            .finish_non_exhaustive()
    }
}

impl ReplayEngine {
    /// Create a replay engine at day 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be set up.
    pub fn new(recording: Recording) -> Result<Self, ReplayError> {
        let session = Session::new(
            recording.party.clone(),
            Arc::clone(&recording.rules),
            recording.seed,
        )?;
        Ok(Self {
            recording,
            session,
            current_day: 0,
        })
    }

    /// Create a replay engine at `target_day`.
    ///
    /// # Errors
    ///
    /// Returns an error if the day is out of bounds or the replay diverges.
    pub fn new_at_day(
        recording: Recording,
        target_day: u32,
        diag: &mut dyn Diagnostics,
    ) -> Result<Self, ReplayError> {
        let mut engine = Self::new(recording)?;
        engine.goto_day(target_day, diag)?;
        Ok(engine)
    }

    /// The recording being replayed.
    #[must_use]
    pub const fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Days replayed so far.
    #[must_use]
    pub const fn day(&self) -> u32 {
        self.current_day
    }

    /// Session at the current day.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// State at the current day.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        self.session.state()
    }

    /// Encoded session at the current day.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>, CodecError> {
        self.session.to_bytes()
    }

    /// Replay the next recorded day.
    ///
    /// # Errors
    ///
    /// Returns an error past the end of the recording, when a recorded
    /// transform is refused, or when the session fails.
    pub fn step_forward(&mut self, diag: &mut dyn Diagnostics) -> Result<DayReport, ReplayError> {
        let day = self.current_day;
        let Some(transforms) = usize::try_from(day)
            .ok()
            .and_then(|index| self.recording.days.get(index))
        else {
            return Err(ReplayError::DayOutOfBounds {
                requested: day.saturating_add(1),
                max_day: self.recording.day_count(),
            });
        };

        for &transform in transforms {
            if !self.session.add_transform(transform, diag).is_accepted() {
                return Err(ReplayError::Diverged { day });
            }
        }
        let report = self.session.advance(diag)?;
        self.current_day += 1;
        Ok(report)
    }

    /// Step back one day by replaying from day 0.
    ///
    /// # Errors
    ///
    /// Returns an error if already at day 0.
    pub fn step_backward(&mut self, diag: &mut dyn Diagnostics) -> Result<(), ReplayError> {
        if self.current_day == 0 {
            return Err(ReplayError::DayOutOfBounds {
                requested: 0,
                max_day: self.recording.day_count(),
            });
        }
        self.goto_day(self.current_day - 1, diag)
    }

    /// Jump to `target_day`.
    ///
    /// # Errors
    ///
    /// Returns an error if the day is out of bounds or the replay diverges.
    pub fn goto_day(&mut self, target_day: u32, diag: &mut dyn Diagnostics) -> Result<(), ReplayError> {
        let max_day = self.recording.day_count();
        if target_day > max_day {
            return Err(ReplayError::DayOutOfBounds {
                requested: target_day,
                max_day,
            });
        }

        if target_day < self.current_day {
            self.session = Session::new(
                self.recording.party.clone(),
                Arc::clone(&self.recording.rules),
                self.recording.seed,
            )?;
            self.current_day = 0;
        }
        while self.current_day < target_day {
            self.step_forward(diag)?;
        }
        Ok(())
    }

    /// Render the current state as text.
    #[must_use]
    pub fn render(&self) -> String {
        render_text(self.session.state())
    }
}

/// Replay `recording` twice from scratch and compare snapshots day by day.
///
/// # Errors
///
/// Returns [`ReplayError::Diverged`] at the first day whose snapshots
/// differ, or any error either replay hits.
pub fn verify_determinism(
    recording: &Recording,
    diag: &mut dyn Diagnostics,
) -> Result<(), ReplayError> {
    let mut first = ReplayEngine::new(recording.clone())?;
    let mut second = ReplayEngine::new(recording.clone())?;
    if first.snapshot()? != second.snapshot()? {
        return Err(ReplayError::Diverged { day: 0 });
    }

    for day in 0..recording.day_count() {
        let a = first.step_forward(diag)?;
        let b = second.step_forward(diag)?;
        if a != b || first.snapshot()? != second.snapshot()? {
            diag.error(format_args!("replays diverged at day {day}"));
            return Err(ReplayError::Diverged { day });
        }
    }
    diag.debug(format_args!(
        "{} days replayed identically",
        recording.day_count()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingDiagnostics, NullDiagnostics};
    use crate::game::RegionId;
    use tempfile::NamedTempFile;

    fn party() -> Vec<SeatAssignment> {
        vec![SeatAssignment::new("ada", 1), SeatAssignment::new("brn", 4)]
    }

    /// Play a few days where every seat attacks from its first frontier region.
    fn played_session(days: u32) -> Session {
        let mut session = Session::new(party(), Arc::new(Rules::default()), 99).unwrap();
        for _ in 0..days {
            if session.is_over() {
                break;
            }
            for index in 0..session.seats().len() {
                let planned = {
                    let seat = session.seat(index).unwrap();
                    let world = &session.state().world;
                    world
                        .territory_of(seat.realm(), false)
                        .into_iter()
                        .find_map(|from| {
                            let to = *seat.attack_targets(from).first()?;
                            seat.can_play_with_region(from).then_some((from, to))
                        })
                        .map(|(from, to)| (seat.realm(), from, to))
                };
                if let Some((realm, from, to)) = planned {
                    let id = session.next_transform_id();
                    let attack = Transform::attack(id, realm, from, to, false);
                    session.add_transform(attack, &mut NullDiagnostics);
                }
            }
            session.advance(&mut NullDiagnostics).unwrap();
        }
        session
    }

    #[test]
    fn test_recording_save_load_roundtrip() {
        let session = played_session(3);
        let recording = Recording::from_session(&session);
        assert_eq!(recording.day_count(), 3);

        let temp_file = NamedTempFile::new().expect("create temp file");
        recording.save(temp_file.path()).expect("save recording");
        let loaded = Recording::load(temp_file.path()).expect("load recording");
        assert_eq!(loaded, recording);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = Recording::new(1, Arc::new(Rules::default()), party())
            .to_bytes()
            .unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            Recording::from_bytes(&bytes),
            Err(CodecError::BadMagic)
        ));
    }

    #[test]
    fn test_replay_reaches_recorded_state() {
        let session = played_session(6);
        let recording = Recording::from_session(&session);

        let engine =
            ReplayEngine::new_at_day(recording.clone(), recording.day_count(), &mut NullDiagnostics)
                .unwrap();
        assert_eq!(engine.day(), recording.day_count());
        assert_eq!(engine.state(), session.state());
        assert_eq!(engine.snapshot().unwrap(), session.to_bytes().unwrap());
    }

    #[test]
    fn test_step_backward_matches_fresh_replay() {
        let recording = Recording::from_session(&played_session(4));
        let mut diag = NullDiagnostics;

        let mut engine = ReplayEngine::new_at_day(recording.clone(), 3, &mut diag).unwrap();
        engine.step_backward(&mut diag).unwrap();
        assert_eq!(engine.day(), 2);

        let fresh = ReplayEngine::new_at_day(recording, 2, &mut diag).unwrap();
        assert_eq!(engine.snapshot().unwrap(), fresh.snapshot().unwrap());
    }

    #[test]
    fn test_out_of_bounds_days() {
        let recording = Recording::from_session(&played_session(2));
        let mut diag = NullDiagnostics;
        let mut engine = ReplayEngine::new(recording.clone()).unwrap();

        assert!(matches!(
            engine.step_backward(&mut diag),
            Err(ReplayError::DayOutOfBounds { requested: 0, .. })
        ));
        assert!(matches!(
            engine.goto_day(5, &mut diag),
            Err(ReplayError::DayOutOfBounds {
                requested: 5,
                max_day: 2
            })
        ));
        engine.goto_day(2, &mut diag).unwrap();
        assert!(engine.step_forward(&mut diag).is_err());
    }

    #[test]
    fn test_verify_determinism() {
        let recording = Recording::from_session(&played_session(6));
        let mut diag = CollectingDiagnostics::new();
        verify_determinism(&recording, &mut diag).unwrap();
    }

    #[test]
    fn test_tampered_recording_diverges() {
        let mut recording = Recording::from_session(&played_session(2));
        let bogus = Transform::attack(
            crate::game::TransformId(900),
            crate::game::RealmId(0),
            RegionId(0),
            RegionId(u16::MAX),
            false,
        );
        recording.days[1].push(bogus);

        let result = verify_determinism(&recording, &mut NullDiagnostics);
        assert!(matches!(result, Err(ReplayError::Diverged { day: 1 })));
    }

    #[test]
    fn test_replay_error_display() {
        let err = ReplayError::DayOutOfBounds {
            requested: 15,
            max_day: 10,
        };
        assert!(format!("{err}").contains("15"));
        assert!(format!("{err}").contains("10"));
    }
}
