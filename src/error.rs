//! Error types for the game engine.
//!
//! Errors are split by layer. Rules and border-gore bookkeeping failures are
//! fatal; a handle that points outside the world during resolution is not,
//! and the session swallows it by resolving the day to zero effects.

use std::io;

use thiserror::Error;

use crate::game::{Buildings, Criterion, RealmId, RegionId};

/// Failure while decoding a binary snapshot.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input ended before the record was complete.
    #[error("unexpected end of input: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Byte offset of the read.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
    },
    /// A versioned aggregate carried a version this build does not know.
    #[error("unsupported {record} version {found} (max {supported})")]
    UnsupportedVersion {
        /// Name of the aggregate.
        record: &'static str,
        /// Version read from the input.
        found: u8,
        /// Newest version understood.
        supported: u8,
    },
    /// An enum tag did not match any known variant.
    #[error("invalid {record} tag {tag}")]
    InvalidTag {
        /// Name of the tagged record.
        record: &'static str,
        /// Tag read from the input.
        tag: u8,
    },
    /// A collection is too long for its count prefix.
    #[error("{len} items do not fit a {width}-bit count prefix")]
    CountOverflow {
        /// Number of items.
        len: usize,
        /// Width of the prefix in bits.
        width: u8,
    },
    /// A length prefix was negative.
    #[error("negative length prefix {0}")]
    NegativeLength(i32),
    /// Bytes remained after the outermost record.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
    /// A string field was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    /// A magic header did not match.
    #[error("bad magic header")]
    BadMagic,
    /// A decoded handle points past the collection it addresses.
    #[error("{record} handle {handle} out of range for {len} entries")]
    HandleOutOfRange {
        /// Name of the field holding the handle.
        record: &'static str,
        /// Handle read from the input.
        handle: usize,
        /// Entries the handle may address.
        len: usize,
    },
    /// A decoded grid does not hold exactly one region per cell.
    #[error("grid of side {side} holds {regions} regions")]
    GridMismatch {
        /// Side length read from the input.
        side: u8,
        /// Regions read from the input.
        regions: usize,
    },
    /// A decoded snapshot describes an impossible game.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// Failure looking up or loading rule configuration.
#[derive(Debug, Error)]
pub enum RulesError {
    /// No building settings exist for the given flags.
    #[error("no settings for building {0:?}")]
    UnknownBuilding(Buildings),
    /// No voting settings exist for the given criterion.
    #[error("no settings for voting criterion {0:?}")]
    UnknownCriterion(Criterion),
    /// Rules JSON could not be parsed.
    #[error("invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Rules file could not be read.
    #[error("cannot read rules: {0}")]
    Io(#[from] io::Error),
}

/// Failure building the initial world layout.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    /// The party contained no players.
    #[error("a session needs at least one player")]
    EmptyParty,
    /// More realms were requested than the grid can place.
    #[error("map is too small: {positions} starting positions for {realms} realms")]
    MapTooSmall {
        /// Starting positions the layout produced.
        positions: usize,
        /// Realms requiring a position.
        realms: usize,
    },
    /// The realm count does not fit a realm handle.
    #[error("{0} realms exceed the supported maximum")]
    TooManyRealms(usize),
    /// The grid side length does not fit the region handle range.
    #[error("side length {0} exceeds the supported maximum")]
    GridTooLarge(i32),
}

/// Failure while turning a day's transforms into effects.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A transform named a region outside the world.
    #[error("region {0:?} is outside the world")]
    RegionOutOfRange(RegionId),
    /// A transform named a realm outside the world.
    #[error("realm {0:?} is outside the world")]
    RealmOutOfRange(RealmId),
    /// A rules lookup failed.
    #[error(transparent)]
    Rules(#[from] RulesError),
    /// Connectivity bookkeeping found more connected regions than the realm owns.
    #[error("realm {realm:?} has {connected} connected regions but owns only {owned}")]
    BorderGoreOverflow {
        /// Realm being checked.
        realm: RealmId,
        /// Regions reached from its anchors.
        connected: usize,
        /// Regions it owns.
        owned: usize,
    },
}

impl ResolveError {
    /// Whether this failure must abort the session instead of voiding the day.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Rules(_) | Self::BorderGoreOverflow { .. })
    }
}

/// Failure reported by a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The initial world could not be laid out.
    #[error(transparent)]
    World(#[from] WorldError),
    /// A fatal resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A rules lookup failed outside resolution.
    #[error(transparent)]
    Rules(#[from] RulesError),
    /// A snapshot could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A snapshot could not be read or written.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A council already named a winner; no more days can be played.
    #[error("the game is over, realm {} won the council", .0.0)]
    GameOver(RealmId),
}

/// Failure while replaying a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The requested day is past the end of the recording.
    #[error("day {requested} out of bounds (recording holds {max_day} days)")]
    DayOutOfBounds {
        /// Requested day.
        requested: u32,
        /// Days in the recording.
        max_day: u32,
    },
    /// Two runs of the same recording disagreed.
    #[error("replays diverged at day {day}")]
    Diverged {
        /// First day whose snapshots differ.
        day: u32,
    },
    /// The session failed while replaying.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A recording could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A recording could not be read or written.
    #[error("recording I/O failed: {0}")]
    Io(#[from] io::Error),
}
