//! Game state: the world, the council and the day counters.

use std::sync::Arc;

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::{CodecError, RulesError, WorldError};
use crate::game::{Effect, Rules, Voting, World};

/// Complete state of a session between two days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Days resolved so far.
    pub days_passed: u32,
    /// Councils held so far.
    pub councils_passed: u32,
    /// Days left until the next council; a council is due at zero.
    pub days_remaining_before_next_council: i32,
    /// The world arena.
    pub world: World,
    /// Result of the latest council.
    pub voting: Voting,
}

impl GameState {
    const VERSION: u8 = 1;

    /// Lay out a fresh game for `player_count` players.
    ///
    /// # Errors
    ///
    /// Returns an error if the world layout fails.
    pub fn new(rules: Arc<Rules>, player_count: usize) -> Result<Self, WorldError> {
        Ok(Self::with_world(World::generate(rules, player_count)?))
    }

    /// Start a game on an existing world.
    #[must_use]
    pub fn with_world(world: World) -> Self {
        let days = i32::from(world.rules().turns_between_votes);
        Self {
            days_passed: 0,
            councils_passed: 0,
            days_remaining_before_next_council: days,
            world,
            voting: Voting::default(),
        }
    }

    /// Rule set of this game.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        self.world.rules()
    }

    /// Copy this state so the copy can be written while this one is read.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Apply `effects` in order to `next`, reading from this state.
    pub fn apply_effects(&self, effects: &[Effect], next: &mut Self) {
        for effect in effects {
            effect.apply(&self.world, &mut next.world);
        }
    }

    /// Credit every owned region's revenue to its owner.
    ///
    /// # Errors
    ///
    /// Returns an error if a region carries an unknown building.
    pub fn collect_revenue(&mut self) -> Result<(), RulesError> {
        for region in self.world.region_ids() {
            if let Some(owner) = self.world.region(region).owner {
                let revenue = self.world.region_silver_worth(region)?;
                self.world.add_silver_treasury(owner, revenue);
            }
        }
        Ok(())
    }

    /// Count one more day.
    pub const fn advance_day(&mut self) {
        self.days_remaining_before_next_council -= 1;
        self.days_passed += 1;
    }

    /// Whether a council must be held now.
    #[must_use]
    pub const fn is_council_due(&self) -> bool {
        self.days_remaining_before_next_council <= 0
    }

    /// Close a council: restart the countdown and clear favours.
    pub fn finish_council(&mut self) {
        self.days_remaining_before_next_council = i32::from(self.rules().turns_between_votes);
        self.councils_passed += 1;
        self.reset_favours();
    }

    /// Clear every realm's favour.
    pub fn reset_favours(&mut self) {
        for realm in self.world.realm_ids() {
            self.world.realm_mut(realm).is_favoured = false;
        }
    }
}

impl Encode for GameState {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(Self::VERSION);
        enc.put_u32(self.days_passed);
        enc.put_u32(self.councils_passed);
        enc.put_i32(self.days_remaining_before_next_council);
        self.world.rules().encode(enc)?;
        self.world.encode(enc)?;
        self.voting.encode(enc)
    }
}

impl Decode for GameState {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.get_version("game state", Self::VERSION)?;
        let days_passed = dec.get_u32()?;
        let councils_passed = dec.get_u32()?;
        let days_remaining_before_next_council = dec.get_i32()?;
        let rules = Arc::new(Rules::decode(dec)?);
        let world = World::decode_with_rules(dec, rules)?;
        let voting = Voting::decode(dec)?;
        Ok(Self {
            days_passed,
            councils_passed,
            days_remaining_before_next_council,
            world,
            voting,
        })
    }
}
