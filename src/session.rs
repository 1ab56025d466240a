//! Session orchestration: seats, transform intake and day advance.
//!
//! A session owns the only mutable game state. Players submit transforms
//! during a day; [`Session::advance`] resolves them all at once, builds the
//! next state from a duplicate, collects revenue and holds the council when
//! it is due.
//!
//! Resolution failures that only void the day (a transform naming a region
//! or realm outside the world) are logged and the day resolves to zero
//! effects. Fatal failures propagate.

mod seat;

pub use seat::Seat;

use std::fmt;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, SessionError};
use crate::game::{
    assert_invariants, check_invariants, validate_transform, Effect, GameState, PreRolledRng,
    RealmId, RegionId, Rules, Transform, TransformId, VotingResult,
};

/// One player of the party and the faction they play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    /// Player name, shown in reports.
    pub player: String,
    /// Index into the faction table of the rules.
    pub faction_index: u8,
}

impl SeatAssignment {
    /// Create an assignment.
    #[must_use]
    pub fn new(player: impl Into<String>, faction_index: u8) -> Self {
        Self {
            player: player.into(),
            faction_index,
        }
    }
}

impl Encode for SeatAssignment {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_str(&self.player)?;
        enc.put_u8(self.faction_index);
        Ok(())
    }
}

impl Decode for SeatAssignment {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            player: dec.get_str()?,
            faction_index: dec.get_u8()?,
        })
    }
}

/// Why a transform was refused at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The acting region already played today and cannot play again.
    RegionAlreadyPlayed(RegionId),
    /// The transform conflicts with one already pending.
    Incompatible,
    /// The transform names a region or realm outside the world.
    OutOfRange,
    /// The game is over.
    GameOver,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionAlreadyPlayed(region) => {
                write!(f, "region {} already played today", region.0)
            }
            Self::Incompatible => write!(f, "conflicts with a pending transform"),
            Self::OutOfRange => write!(f, "names a region or realm outside the world"),
            Self::GameOver => write!(f, "the game is over"),
        }
    }
}

/// Result of submitting a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Queued for the next advance.
    Accepted(TransformId),
    /// Dropped.
    Rejected(Rejection),
}

impl IntakeOutcome {
    /// Whether the transform was queued.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// What one advanced day produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    /// Days passed after this advance.
    pub day: u32,
    /// Effects applied, in order.
    pub effects: Vec<Effect>,
    /// Whether resolution failed and the day produced no effects.
    pub voided: bool,
    /// Council result, when a council was held at the end of the day.
    pub council: Option<VotingResult>,
    /// Realm that won the game at this council.
    pub winner: Option<RealmId>,
}

impl DayReport {
    /// Whether play goes on after this day.
    #[must_use]
    pub const fn game_continues(&self) -> bool {
        self.winner.is_none()
    }
}

/// A running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    rng: PreRolledRng,
    state: GameState,
    party: Vec<SeatAssignment>,
    seats: Vec<RealmId>,
    pending: Vec<Transform>,
    journal: Vec<Vec<Transform>>,
    next_id: u32,
    winner: Option<RealmId>,
}

impl Session {
    const VERSION: u8 = 1;

    /// Lay out a world for `party` and assign every player a realm.
    ///
    /// Voting realms are shuffled with the session's random source; seat `i`
    /// gets the `i`-th realm of the shuffle and plays its assigned faction.
    ///
    /// # Errors
    ///
    /// Returns an error if the world cannot be laid out for this party.
    pub fn new(
        party: Vec<SeatAssignment>,
        rules: Arc<Rules>,
        seed: u64,
    ) -> Result<Self, SessionError> {
        let mut rng = PreRolledRng::new(seed);
        let mut state = GameState::new(rules, party.len())?;

        let mut realms: Vec<RealmId> = state
            .world
            .realm_ids()
            .filter(|&realm| !state.world.is_excluded_from_voting(realm))
            .collect();
        // Sattolo's shuffle: one single cycle, so no realm keeps its place.
        let mut n = realms.len();
        while n > 1 {
            n -= 1;
            let k = rng.next_index(n);
            realms.swap(k, n);
        }

        let seats: Vec<RealmId> = realms.into_iter().take(party.len()).collect();
        for (assignment, &realm) in party.iter().zip(&seats) {
            state.world.realm_mut(realm).faction_index = assignment.faction_index;
        }

        let delay = i32::from(state.rules().initial_vote_turns_delay);
        state.days_remaining_before_next_council += delay;

        Ok(Self {
            rng,
            state,
            party,
            seats,
            pending: Vec::new(),
            journal: Vec::new(),
            next_id: 0,
            winner: None,
        })
    }

    /// Seed of the random source.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Position of the random source.
    #[must_use]
    pub const fn rng_cursor(&self) -> u16 {
        self.rng.cursor()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Rule set of the session.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        self.state.rules()
    }

    /// Players, in seat order.
    #[must_use]
    pub fn party(&self) -> &[SeatAssignment] {
        &self.party
    }

    /// Realm of each seat.
    #[must_use]
    pub fn seats(&self) -> &[RealmId] {
        &self.seats
    }

    /// Affordance view of seat `index`.
    #[must_use]
    pub fn seat(&self, index: usize) -> Option<Seat<'_>> {
        self.seats.get(index).map(|&realm| Seat::new(self, realm))
    }

    /// Seat index playing `realm`.
    #[must_use]
    pub fn seat_of(&self, realm: RealmId) -> Option<usize> {
        self.seats.iter().position(|&seated| seated == realm)
    }

    /// Transforms accepted today.
    #[must_use]
    pub fn pending(&self) -> &[Transform] {
        &self.pending
    }

    /// Transforms accepted on every past day, one list per day.
    #[must_use]
    pub fn journal(&self) -> &[Vec<Transform>] {
        &self.journal
    }

    /// Realm that won the game, once a council produced a majority.
    #[must_use]
    pub const fn winner(&self) -> Option<RealmId> {
        self.winner
    }

    /// Whether a council already produced a winner.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Reserve a fresh transform identifier.
    pub const fn next_transform_id(&mut self) -> TransformId {
        let id = TransformId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Whether every seated realm has spent all its decisions today.
    #[must_use]
    pub fn everybody_has_played(&self) -> bool {
        self.seats
            .iter()
            .all(|&realm| Seat::new(self, realm).remaining_decisions() <= 0)
    }

    /// Submit a transform for today.
    ///
    /// A region acts once per day unless it may replay; an extended attack
    /// is exempt because it follows a direct attack from the same region.
    /// A transform that conflicts with a pending one is dropped. Rejections
    /// are reported to `diag` and in the returned outcome.
    pub fn add_transform(
        &mut self,
        transform: Transform,
        diag: &mut dyn Diagnostics,
    ) -> IntakeOutcome {
        let rejection = self.intake_rejection(&transform);
        if let Some(rejection) = rejection {
            diag.warn(format_args!("rejected transform {transform}: {rejection}"));
            return IntakeOutcome::Rejected(rejection);
        }

        diag.info(format_args!("accepted transform {transform}"));
        self.next_id = self.next_id.max(transform.id.0.saturating_add(1));
        self.pending.push(transform);
        IntakeOutcome::Accepted(transform.id)
    }

    fn intake_rejection(&self, transform: &Transform) -> Option<Rejection> {
        if self.is_over() {
            return Some(Rejection::GameOver);
        }
        let world = &self.state.world;
        if validate_transform(world, transform).is_err() {
            return Some(Rejection::OutOfRange);
        }
        if let Some(region) = transform.acting_region() {
            let played = self
                .pending
                .iter()
                .any(|other| other.acting_region() == Some(region));
            if played
                && !world.region(region).can_replay(world.rules())
                && !transform.is_extended_attack()
            {
                return Some(Rejection::RegionAlreadyPlayed(region));
            }
        }
        if !transform.compatible_with(&self.pending) {
            return Some(Rejection::Incompatible);
        }
        None
    }

    /// Resolve today's transforms and move to the next day.
    ///
    /// # Errors
    ///
    /// Returns an error if the game is over, or on a fatal resolution or
    /// rules failure. A non-fatal resolution failure voids the day instead.
    pub fn advance(&mut self, diag: &mut dyn Diagnostics) -> Result<DayReport, SessionError> {
        if let Some(winner) = self.winner {
            return Err(SessionError::GameOver(winner));
        }

        let transforms = mem::take(&mut self.pending);
        let day = self.state.days_passed;
        let resolved = self.state.compute_effects(&mut self.rng, &transforms, diag);
        let (effects, voided) = match resolved {
            Ok(effects) => (effects, false),
            Err(err) if !err.is_fatal() => {
                diag.error(format_args!("day {day} resolved to no effects: {err}"));
                (Vec::new(), true)
            }
            Err(err) => return Err(err.into()),
        };

        let mut next = self.state.duplicate();
        self.state.apply_effects(&effects, &mut next);
        next.collect_revenue()?;
        next.advance_day();
        self.state = next;
        self.journal.push(transforms);
        diag.info(format_args!(
            "day {day} done: {} effects, council in {} days",
            effects.len(),
            self.state.days_remaining_before_next_council
        ));

        let mut council = None;
        if self.state.is_council_due() {
            let state = &mut self.state;
            let result = state
                .voting
                .compute(&state.world, state.councils_passed, &mut self.rng, diag)?
                .clone();
            state.finish_council();
            if let Some(winner) = result.majority_winner() {
                diag.info(format_args!("realm {} wins the council", winner.0));
                self.winner = Some(winner);
            }
            council = Some(result);
        }
        assert_invariants(&self.state);

        Ok(DayReport {
            day: self.state.days_passed,
            effects,
            voided,
            council,
            winner: self.winner,
        })
    }

    /// Write a snapshot of the session to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Resume a session from a snapshot written by [`Session::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

impl Encode for Session {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(Self::VERSION);
        enc.put_u64(self.rng.seed());
        enc.put_u16(self.rng.cursor());
        self.state.encode(enc)?;
        enc.put_seq(&self.party)?;
        enc.put_seq(&self.seats)?;
        enc.put_seq(&self.pending)?;
        enc.put_count(self.journal.len())?;
        for day in &self.journal {
            enc.put_seq(day)?;
        }
        enc.put_u32(self.next_id);
        enc.put_bool(self.winner.is_some());
        enc.put_u8(self.winner.map_or(0, |realm| realm.0));
        Ok(())
    }
}

impl Decode for Session {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.get_version("session", Self::VERSION)?;
        let seed = dec.get_u64()?;
        let cursor = dec.get_u16()?;
        let state = GameState::decode(dec)?;
        let party = dec.get_seq()?;
        let seats: Vec<RealmId> = dec.get_seq()?;
        let pending = dec.get_seq()?;
        let days = usize::from(dec.get_u16()?);
        let mut journal = Vec::with_capacity(days.min(dec.remaining()));
        for _ in 0..days {
            journal.push(dec.get_seq()?);
        }
        let next_id = dec.get_u32()?;
        let has_winner = dec.get_bool()?;
        let winner = RealmId(dec.get_u8()?);

        let in_range = |record: &'static str, realm: RealmId| {
            if state.world.contains_realm(realm) {
                Ok(())
            } else {
                Err(CodecError::HandleOutOfRange {
                    record,
                    handle: realm.index(),
                    len: state.world.realm_count(),
                })
            }
        };
        for &realm in &seats {
            in_range("seat", realm)?;
        }
        if has_winner {
            in_range("winner", winner)?;
        }
        if let Some(violation) = check_invariants(&state).into_iter().next() {
            return Err(CodecError::Inconsistent(violation.message));
        }

        Ok(Self {
            rng: PreRolledRng::restore(seed, cursor),
            state,
            party,
            seats,
            pending,
            journal,
            next_id,
            winner: has_winner.then_some(winner),
        })
    }
}
