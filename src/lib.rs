// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Hexcouncil: a deterministic hex-grid territorial conquest engine.
//!
//! Realms hold regions on a square grid of hexes. Every day each seat plans
//! attacks, constructions and purchases; the day then resolves all of them at
//! once, with border gore cutting off regions that lost their link to a
//! capital. Every few days a council votes, and a realm that wins a majority
//! wins the game.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │    Replay / CLI tooling             │
//! ├─────────────────────────────────────┤
//! │    Session (seats, intake, days)    │
//! ├─────────────────────────────────────┤
//! │    Game (world, resolution, vote)   │
//! ├─────────────────────────────────────┤
//! │    Codec, diagnostics, errors       │
//! └─────────────────────────────────────┘
//! ```
//!
//! Given the same rules, party and seed, and the same transforms in the same
//! order, two sessions produce byte-identical snapshots.

pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod game;
pub mod replay;
pub mod session;

pub use diagnostics::{CollectingDiagnostics, Diagnostics, NullDiagnostics, TracingDiagnostics};
pub use error::{CodecError, ReplayError, ResolveError, RulesError, SessionError, WorldError};

// Re-export key game types at crate root for convenience
pub use game::{
    Buildings, Effect, GameState, RealmId, RegionId, Rules, Transform, TransformId, World,
};
pub use session::{DayReport, IntakeOutcome, Rejection, Seat, SeatAssignment, Session};
