//! Game layer for hexcouncil.
//!
//! Implements the rules of one session:
//! - Hex world with regions, realms and buildings
//! - Transforms (player intents) and effects (world mutations)
//! - Five-phase day resolution with border gore
//! - Council voting
//! - Pre-rolled deterministic randomness

mod effect;
mod invariants;
mod layout;
mod position;
mod random;
mod realm;
mod region;
mod resolution;
mod rules;
mod state;
mod transform;
mod voting;
mod world;

pub use effect::{Conquest, Effect};
pub use invariants::{assert_invariants, check_invariants, InvariantViolation};
pub use layout::grid_dimensions;
pub use position::{cosine_percent, sine_percent, Axial, Position};
pub use random::{PreRolledRng, PRE_ROLLS};
pub use realm::{Realm, RealmId};
pub(crate) use resolution::validate_transform;
pub use region::{Buildings, Region, RegionId};
pub use rules::{
    BuildingSettings, Criterion, FactionFlags, FactionSettings, Rules, VotingRules, VotingSettings,
};
pub use state::GameState;
pub use transform::{Action, Transform, TransformId, TransformKind};
pub use voting::{VoteScore, Voting, VotingResult};
pub use world::{NaturalOwner, Neighbors, World};
