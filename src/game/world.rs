//! The world arena: regions, realms and the queries over them.
//!
//! Regions live in a flat `side * side` array addressed by [`RegionId`];
//! realms in a small array addressed by [`RealmId`]. The world is fixed in
//! size for a whole session. Resolution never mutates a world it reads
//! from: it clones one, and only the clone is written to.

use std::sync::Arc;

use crate::codec::{Decoder, Encode, Encoder};
use crate::error::{CodecError, RulesError};
use crate::game::{
    Buildings, FactionFlags, Position, PreRolledRng, Realm, RealmId, Region, RegionId, Rules,
};

/// Up to six neighbouring regions, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    ids: [RegionId; 6],
    len: u8,
}

impl Neighbors {
    const fn empty() -> Self {
        Self {
            ids: [RegionId(0); 6],
            len: 0,
        }
    }

    fn push(&mut self, id: RegionId) {
        self.ids[usize::from(self.len)] = id;
        self.len += 1;
    }

    /// Neighbours as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[RegionId] {
        &self.ids[..usize::from(self.len)]
    }

    /// Iterate over the neighbours.
    pub fn iter(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.as_slice().iter().copied()
    }

    /// Number of neighbours.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the region has no usable neighbour.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `id` is among the neighbours.
    #[must_use]
    pub fn contains(&self, id: RegionId) -> bool {
        self.as_slice().contains(&id)
    }
}

/// Result of a neighbour-majority ownership query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOwner {
    /// Realm owning the most neighbouring edges.
    pub realm: RealmId,
    /// Whether a random draw broke a tie.
    pub was_coin_flip: bool,
}

/// The world arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    rules: Arc<Rules>,
    side_length: u8,
    square_side_length: u8,
    council_realm: Option<RealmId>,
    regions: Vec<Region>,
    realms: Vec<Realm>,
    starting_positions: Vec<Position>,
}

impl World {
    /// Create a world with unowned regions and default realms.
    pub(crate) fn blank(
        rules: Arc<Rules>,
        side_length: u8,
        square_side_length: u8,
        realm_count: u8,
    ) -> Self {
        let side = usize::from(side_length);
        Self {
            rules,
            side_length,
            square_side_length,
            council_realm: None,
            regions: vec![Region::default(); side * side],
            realms: vec![Realm::default(); usize::from(realm_count)],
            starting_positions: Vec::new(),
        }
    }

    pub(crate) const fn set_council_realm(&mut self, realm: Option<RealmId>) {
        self.council_realm = realm;
    }

    pub(crate) fn set_starting_positions(&mut self, positions: Vec<Position>) {
        self.starting_positions = positions;
    }

    /// Rule set this world plays under.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Shared handle to the rule set.
    #[must_use]
    pub fn shared_rules(&self) -> Arc<Rules> {
        Arc::clone(&self.rules)
    }

    /// Cells per grid side.
    #[must_use]
    pub fn side_length(&self) -> i32 {
        i32::from(self.side_length)
    }

    /// Realm slots per side of the layout square.
    #[must_use]
    pub fn square_side_length(&self) -> i32 {
        i32::from(self.square_side_length)
    }

    /// All regions, indexed by [`RegionId`].
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// All realms, indexed by [`RealmId`].
    #[must_use]
    pub fn realms(&self) -> &[Realm] {
        &self.realms
    }

    /// Starting capital positions chosen at construction.
    #[must_use]
    pub fn starting_positions(&self) -> &[Position] {
        &self.starting_positions
    }

    /// Number of regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of realms.
    #[must_use]
    pub fn realm_count(&self) -> usize {
        self.realms.len()
    }

    /// Iterate over every region handle.
    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> + use<> {
        let count = u16::try_from(self.regions.len()).unwrap_or(u16::MAX);
        (0..count).map(RegionId)
    }

    /// Iterate over every realm handle.
    pub fn realm_ids(&self) -> impl Iterator<Item = RealmId> + use<> {
        let count = u8::try_from(self.realms.len()).unwrap_or(u8::MAX);
        (0..count).map(RealmId)
    }

    /// Whether `id` addresses a region of this world.
    #[must_use]
    pub fn contains_region(&self, id: RegionId) -> bool {
        id.index() < self.regions.len()
    }

    /// Whether `id` addresses a realm of this world.
    #[must_use]
    pub fn contains_realm(&self, id: RealmId) -> bool {
        id.index() < self.realms.len()
    }

    /// Region behind a handle; panics on a foreign handle.
    #[must_use]
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    /// Mutable region behind a handle; panics on a foreign handle.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.index()]
    }

    /// Realm behind a handle; panics on a foreign handle.
    #[must_use]
    pub fn realm(&self, id: RealmId) -> &Realm {
        &self.realms[id.index()]
    }

    /// Mutable realm behind a handle; panics on a foreign handle.
    pub fn realm_mut(&mut self, id: RealmId) -> &mut Realm {
        &mut self.realms[id.index()]
    }

    /// Grid position of a region.
    #[must_use]
    pub fn position_of(&self, id: RegionId) -> Position {
        let side = self.side_length();
        let index = i32::from(id.0);
        Position::new(index % side, index / side)
    }

    /// Region at a grid position, if the position is on the grid.
    #[must_use]
    pub fn region_at(&self, position: Position) -> Option<RegionId> {
        let side = self.side_length();
        if position.x < 0 || position.y < 0 || position.x >= side || position.y >= side {
            return None;
        }
        u16::try_from(position.x + position.y * side)
            .ok()
            .map(RegionId)
    }

    /// Usable neighbours of a region.
    ///
    /// Order is fixed: left, upper-left, upper-right, right, lower-right,
    /// lower-left. Off-grid and inert cells are skipped.
    #[must_use]
    pub fn neighbors(&self, id: RegionId) -> Neighbors {
        let side = self.side_length();
        let index = i32::from(id.0);
        let Position { x, y } = self.position_of(id);
        let offset = 1 - y % 2;

        let mut candidates = [0i32; 6];
        let mut count = 0;
        let mut consider = |candidate: i32| {
            candidates[count] = candidate;
            count += 1;
        };

        if x > 0 {
            consider(index - 1);
        }
        if y > 0 {
            if x >= offset {
                consider(index - side - offset);
            }
            if x < side - 1 + offset {
                consider(index - side + 1 - offset);
            }
        }
        if x < side - 1 {
            consider(index + 1);
        }
        if y < side - 1 {
            if x < side - 1 + offset {
                consider(index + side + 1 - offset);
            }
            if x >= offset {
                consider(index + side - offset);
            }
        }

        let max = side * side - 1;
        let mut neighbors = Neighbors::empty();
        for &candidate in &candidates[..count] {
            if !(0..=max).contains(&candidate) {
                continue;
            }
            let Ok(raw) = u16::try_from(candidate) else {
                continue;
            };
            let neighbor = RegionId(raw);
            if !self.region(neighbor).inert {
                neighbors.push(neighbor);
            }
        }
        neighbors
    }

    /// Every region reachable from `start` through regions with the same
    /// ownership (same owner, or unowned when `start` is unowned).
    ///
    /// Breadth-first; `start` comes first.
    #[must_use]
    pub fn connected_regions(&self, start: RegionId) -> Vec<RegionId> {
        let owner = self.region(start).owner;
        let mut visited = vec![false; self.regions.len()];
        let mut connected = vec![start];
        visited[start.index()] = true;

        let mut cursor = 0;
        while cursor < connected.len() {
            let current = connected[cursor];
            cursor += 1;
            for neighbor in self.neighbors(current).iter() {
                if !visited[neighbor.index()] && self.region(neighbor).owner == owner {
                    visited[neighbor.index()] = true;
                    connected.push(neighbor);
                }
            }
        }
        connected
    }

    /// First region holding `realm`'s capital.
    #[must_use]
    pub fn capital_of(&self, realm: RealmId) -> Option<RegionId> {
        self.region_ids().find(|&id| {
            let region = self.region(id);
            region.buildings.contains(Buildings::CAPITAL) && region.is_owned_by(realm)
        })
    }

    /// `realm` itself, its subjugator, and every realm subjugated by either.
    #[must_use]
    pub fn allied_or_subjugated_realms(&self, realm: RealmId) -> Vec<RealmId> {
        let ruler = self.realm(realm).subjugated_by;
        let mut pool = vec![realm];
        if let Some(ruler) = ruler {
            pool.push(ruler);
        }
        for other in self.realm_ids() {
            if pool.contains(&other) {
                continue;
            }
            let subjugator = self.realm(other).subjugated_by;
            if subjugator == Some(realm) || (ruler.is_some() && subjugator == ruler) {
                pool.push(other);
            }
        }
        pool
    }

    /// Regions connected to `realm`'s capital.
    ///
    /// With `include_subjugated` and subjugation enabled, the territories of
    /// the whole subjugation pool are concatenated.
    #[must_use]
    pub fn territory_of(&self, realm: RealmId, include_subjugated: bool) -> Vec<RegionId> {
        if include_subjugated && self.rules.subjugation_enabled {
            self.allied_or_subjugated_realms(realm)
                .into_iter()
                .filter_map(|member| self.capital_of(member))
                .flat_map(|capital| self.connected_regions(capital))
                .collect()
        } else {
            self.capital_of(realm)
                .map(|capital| self.connected_regions(capital))
                .unwrap_or_default()
        }
    }

    /// The council realm, if the rules created one.
    #[must_use]
    pub const fn council_realm(&self) -> Option<RealmId> {
        self.council_realm
    }

    /// Whether `realm` is the council.
    #[must_use]
    pub fn is_council_realm(&self, realm: RealmId) -> bool {
        self.council_realm == Some(realm)
    }

    /// Whether the council owns `region`.
    #[must_use]
    pub fn is_council_region(&self, region: RegionId) -> bool {
        self.council_realm
            .is_some_and(|council| self.region(region).is_owned_by(council))
    }

    /// Whether `realm` neither votes nor receives votes.
    #[must_use]
    pub fn is_excluded_from_voting(&self, realm: RealmId) -> bool {
        self.is_council_realm(realm) || self.realm(realm).is_subjugated()
    }

    /// Faction flags of a realm.
    #[must_use]
    pub fn realm_faction(&self, realm: RealmId) -> FactionFlags {
        self.rules.faction_flags(self.realm(realm).faction_index)
    }

    /// Faction flags of a region's owner; none when unowned.
    #[must_use]
    pub fn region_faction(&self, region: RegionId) -> FactionFlags {
        self.region(region)
            .owner
            .map_or(FactionFlags::NONE, |owner| self.realm_faction(owner))
    }

    /// Daily revenue of a region for its current owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the region carries an unknown building.
    pub fn region_silver_worth(&self, region: RegionId) -> Result<i32, RulesError> {
        self.region(region)
            .silver_worth(self.region_faction(region), &self.rules)
    }

    /// Silver `looter` takes from a failed attack on `region`, per attacking region.
    ///
    /// # Errors
    ///
    /// Returns an error if the region carries an unknown building.
    pub fn region_lootable_silver_worth(
        &self,
        region: RegionId,
        looter: RealmId,
    ) -> Result<i32, RulesError> {
        let rules = &self.rules;
        let mut silver = if self.region(region).buildings.contains(Buildings::CAPITAL)
            && !rules.subjugation_enabled
        {
            rules.silver_looted_on_capital
        } else {
            self.region_silver_worth(region)?
        };

        if self
            .realm_faction(looter)
            .contains(FactionFlags::LOOT_MORE_MONEY)
            && silver < rules.factions.looter_minimum_silver
        {
            silver = rules.factions.looter_minimum_silver;
            if self
                .region_faction(region)
                .contains(FactionFlags::RICHER_TERRITORIES)
            {
                silver *= rules.factions.looter_riches_multiplier;
            }
        }

        Ok(silver)
    }

    /// The realm that ultimately controls `realm`'s treasury.
    #[must_use]
    pub fn top_subjugator(&self, realm: RealmId) -> RealmId {
        let mut current = realm;
        // Bounded walk: a well-formed world has no chains, a corrupt one may cycle.
        for _ in 0..self.realms.len() {
            match self.realm(current).subjugated_by {
                Some(ruler) if ruler != current && self.contains_realm(ruler) => current = ruler,
                _ => break,
            }
        }
        current
    }

    /// Treasury seen by `realm`, read from its subjugator when subjugated.
    #[must_use]
    pub fn silver_treasury(&self, realm: RealmId) -> i32 {
        self.realm(self.top_subjugator(realm)).silver_treasury
    }

    /// Set the treasury seen by `realm`; decreases count as spending.
    pub fn set_silver_treasury(&mut self, realm: RealmId, amount: i32) {
        let target = self.top_subjugator(realm);
        let entry = self.realm_mut(target);
        if amount < entry.silver_treasury {
            entry.total_spent += entry.silver_treasury - amount;
        }
        entry.silver_treasury = amount;
    }

    /// Add `delta` (possibly negative) to the treasury seen by `realm`.
    pub fn add_silver_treasury(&mut self, realm: RealmId, delta: i32) {
        let current = self.silver_treasury(realm);
        self.set_silver_treasury(realm, current + delta);
    }

    /// Whether `realm` may attack `region` at all.
    #[must_use]
    pub fn can_realm_attack_region(&self, realm: RealmId, region: RegionId) -> bool {
        let target = self.region(region);
        if target.inert || target.is_owned_by(realm) || self.is_council_region(region) {
            return false;
        }
        if let Some(owner) = target.owner {
            if self.top_subjugator(owner) == self.top_subjugator(realm) {
                return false;
            }
        }
        true
    }

    /// Regions an attack launched from `from` may target.
    ///
    /// Reach is one cell, or two for a charging faction when `can_extend`.
    /// The second ring only expands through attackable cells.
    #[must_use]
    pub fn attack_targets(&self, from: RegionId, can_extend: bool) -> Vec<RegionId> {
        let source = self.region(from);
        let Some(attacker) = source.owner else {
            return Vec::new();
        };
        if source.inert {
            return Vec::new();
        }

        let range = if can_extend && self.region_faction(from).contains(FactionFlags::CHARGE) {
            2
        } else {
            1
        };

        let mut done = vec![from];
        let mut layer = vec![from];
        let mut targets = Vec::new();
        for depth in 0..range {
            let mut next_layer = Vec::new();
            for &origin in &layer {
                for neighbor in self.neighbors(origin).iter() {
                    if !self.can_realm_attack_region(attacker, neighbor) {
                        continue;
                    }
                    if !targets.contains(&neighbor) {
                        targets.push(neighbor);
                    }
                    if depth < range - 1 && !done.contains(&neighbor) {
                        done.push(neighbor);
                        next_layer.push(neighbor);
                    }
                }
            }
            layer = next_layer;
        }
        targets
    }

    /// Neighbour-majority owner of `region`, ignoring council neighbours.
    ///
    /// A tie is broken by a draw from `rng`; without one a tie has no owner.
    pub fn natural_owner(
        &self,
        region: RegionId,
        rng: Option<&mut PreRolledRng>,
    ) -> Option<NaturalOwner> {
        let mut counts: Vec<(RealmId, u32)> = Vec::with_capacity(6);
        for neighbor in self.neighbors(region).iter() {
            let Some(owner) = self.region(neighbor).owner else {
                continue;
            };
            if self.is_council_realm(owner) {
                continue;
            }
            match counts.iter_mut().find(|(realm, _)| *realm == owner) {
                Some((_, count)) => *count += 1,
                None => counts.push((owner, 1)),
            }
        }

        let max = counts.iter().map(|&(_, count)| count).max()?;
        let candidates: Vec<RealmId> = counts
            .iter()
            .filter(|&&(_, count)| count >= max)
            .map(|&(realm, _)| realm)
            .collect();

        match candidates.as_slice() {
            [] => None,
            [single] => Some(NaturalOwner {
                realm: *single,
                was_coin_flip: false,
            }),
            tied => rng.map(|rng| NaturalOwner {
                realm: tied[rng.next_index(tied.len())],
                was_coin_flip: true,
            }),
        }
    }

    /// Decode a world encoded with [`Encode`], attaching `rules`.
    ///
    /// # Errors
    ///
    /// Returns an error on truncated or malformed input, including a grid
    /// that does not match its side length and any realm handle pointing
    /// outside the decoded realms.
    pub fn decode_with_rules(dec: &mut Decoder<'_>, rules: Arc<Rules>) -> Result<Self, CodecError> {
        let side_length = dec.get_u8()?;
        let square_side_length = dec.get_u8()?;
        let has_council = dec.get_bool()?;
        let council = RealmId(dec.get_u8()?);
        let world = Self {
            rules,
            side_length,
            square_side_length,
            council_realm: has_council.then_some(council),
            regions: dec.get_seq()?,
            realms: dec.get_seq()?,
            starting_positions: dec.get_seq()?,
        };
        world.check_handles()?;
        Ok(world)
    }

    fn check_handles(&self) -> Result<(), CodecError> {
        let side = usize::from(self.side_length);
        if self.regions.len() != side * side {
            return Err(CodecError::GridMismatch {
                side: self.side_length,
                regions: self.regions.len(),
            });
        }

        let realm_in_range = |record: &'static str, realm: RealmId| {
            if self.contains_realm(realm) {
                Ok(())
            } else {
                Err(CodecError::HandleOutOfRange {
                    record,
                    handle: realm.index(),
                    len: self.realms.len(),
                })
            }
        };
        if let Some(council) = self.council_realm {
            realm_in_range("council realm", council)?;
        }
        for owner in self.regions.iter().filter_map(|region| region.owner) {
            realm_in_range("region owner", owner)?;
        }
        for ruler in self.realms.iter().filter_map(|realm| realm.subjugated_by) {
            realm_in_range("subjugator", ruler)?;
        }
        Ok(())
    }
}

impl Encode for World {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(self.side_length);
        enc.put_u8(self.square_side_length);
        enc.put_bool(self.council_realm.is_some());
        enc.put_u8(self.council_realm.map_or(0, |c| c.0));
        enc.put_seq(&self.regions)?;
        enc.put_seq(&self.realms)?;
        enc.put_seq(&self.starting_positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 6x6 world with two realms and no council.
    fn small_world() -> World {
        World::blank(Arc::new(Rules::default()), 6, 2, 2)
    }

    fn own(world: &mut World, ids: &[u16], realm: u8) {
        for &id in ids {
            world.region_mut(RegionId(id)).owner = Some(RealmId(realm));
        }
    }

    #[test]
    fn test_position_round_trip() {
        let world = small_world();
        for id in world.region_ids() {
            assert_eq!(world.region_at(world.position_of(id)), Some(id));
        }
        assert_eq!(world.region_at(Position::new(6, 0)), None);
        assert_eq!(world.region_at(Position::new(-1, 2)), None);
    }

    #[test]
    fn test_neighbors_even_row() {
        let world = small_world();
        // (2, 2) is index 14; even rows lean left.
        let n = world.neighbors(RegionId(14));
        assert_eq!(n.as_slice(), &[13, 7, 8, 15, 20, 19].map(RegionId));
    }

    #[test]
    fn test_neighbors_odd_row() {
        let world = small_world();
        // (2, 1) is index 8; odd rows lean right.
        let n = world.neighbors(RegionId(8));
        assert_eq!(n.as_slice(), &[7, 2, 3, 9, 15, 14].map(RegionId));
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let world = small_world();
        for id in world.region_ids() {
            for n in world.neighbors(id).iter() {
                assert!(world.neighbors(n).contains(id), "{id:?} <-> {n:?}");
            }
        }
    }

    #[test]
    fn test_corner_and_inert_neighbors() {
        let mut world = small_world();
        assert_eq!(world.neighbors(RegionId(0)).as_slice(), &[1, 6].map(RegionId));
        world.region_mut(RegionId(6)).inert = true;
        assert_eq!(world.neighbors(RegionId(0)).as_slice(), &[RegionId(1)]);
    }

    #[test]
    fn test_connected_regions_owned_and_unowned() {
        let mut world = small_world();
        own(&mut world, &[0, 1, 2], 0);
        own(&mut world, &[4], 0);
        let mut connected = world.connected_regions(RegionId(0));
        connected.sort();
        assert_eq!(connected, [0, 1, 2].map(RegionId).to_vec());

        let unowned = world.connected_regions(RegionId(35));
        assert_eq!(unowned.len(), 36 - 4);
        assert_eq!(unowned[0], RegionId(35));
    }

    #[test]
    fn test_territory_follows_capital() {
        let mut world = small_world();
        own(&mut world, &[0, 1, 2, 30], 0);
        world.region_mut(RegionId(1)).buildings = Buildings::CAPITAL;
        assert_eq!(world.capital_of(RealmId(0)), Some(RegionId(1)));
        assert_eq!(world.territory_of(RealmId(0), false).len(), 3);
        assert!(world.territory_of(RealmId(1), false).is_empty());
    }

    #[test]
    fn test_territory_with_subjugated_pool() {
        let mut world = small_world();
        own(&mut world, &[0, 1], 0);
        own(&mut world, &[34, 35], 1);
        world.region_mut(RegionId(0)).buildings = Buildings::CAPITAL;
        world.region_mut(RegionId(35)).buildings = Buildings::CAPITAL;
        world.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(0));

        assert_eq!(world.territory_of(RealmId(0), true).len(), 4);
        assert_eq!(world.territory_of(RealmId(1), true).len(), 4);
        assert_eq!(world.territory_of(RealmId(0), false).len(), 2);
    }

    #[test]
    fn test_treasury_redirects_to_subjugator() {
        let mut world = small_world();
        world.realm_mut(RealmId(0)).silver_treasury = 50;
        world.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(0));

        assert_eq!(world.silver_treasury(RealmId(1)), 50);
        world.add_silver_treasury(RealmId(1), -20);
        assert_eq!(world.realm(RealmId(0)).silver_treasury, 30);
        assert_eq!(world.realm(RealmId(0)).total_spent, 20);
        assert_eq!(world.realm(RealmId(1)).silver_treasury, 0);

        world.add_silver_treasury(RealmId(1), 5);
        assert_eq!(world.realm(RealmId(0)).total_spent, 20);
    }

    #[test]
    fn test_attack_eligibility() {
        let mut world = small_world();
        own(&mut world, &[0], 0);
        own(&mut world, &[1], 1);
        world.region_mut(RegionId(2)).inert = true;

        assert!(world.can_realm_attack_region(RealmId(0), RegionId(1)));
        assert!(!world.can_realm_attack_region(RealmId(0), RegionId(0)));
        assert!(!world.can_realm_attack_region(RealmId(0), RegionId(2)));
        assert!(world.can_realm_attack_region(RealmId(0), RegionId(3)));

        world.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(0));
        assert!(!world.can_realm_attack_region(RealmId(0), RegionId(1)));
        assert!(!world.can_realm_attack_region(RealmId(1), RegionId(0)));
    }

    #[test]
    fn test_council_regions_cannot_be_attacked() {
        let mut world = small_world();
        own(&mut world, &[0], 0);
        own(&mut world, &[1], 1);
        world.set_council_realm(Some(RealmId(1)));
        assert!(world.is_council_region(RegionId(1)));
        assert!(!world.can_realm_attack_region(RealmId(0), RegionId(1)));
        assert!(world.is_excluded_from_voting(RealmId(1)));
        assert!(!world.is_excluded_from_voting(RealmId(0)));
    }

    #[test]
    fn test_attack_targets_charge_reaches_two_rings() {
        let mut world = small_world();
        own(&mut world, &[14], 0);
        let direct = world.attack_targets(RegionId(14), true);
        assert_eq!(direct.len(), 6);

        world.realm_mut(RealmId(0)).faction_index = 1; // charge
        let extended = world.attack_targets(RegionId(14), true);
        assert!(extended.len() > 6);
        assert!(!extended.contains(&RegionId(14)));
        assert_eq!(world.attack_targets(RegionId(14), false).len(), 6);
    }

    #[test]
    fn test_natural_owner_majority_and_tie() {
        let mut world = small_world();
        // Neighbours of 14: 13, 7, 8, 15, 20, 19.
        own(&mut world, &[13, 7, 8], 0);
        own(&mut world, &[15], 1);
        let owner = world.natural_owner(RegionId(14), None).unwrap();
        assert_eq!(owner.realm, RealmId(0));
        assert!(!owner.was_coin_flip);

        own(&mut world, &[20, 19], 1);
        assert_eq!(world.natural_owner(RegionId(14), None), None);

        let mut rng = PreRolledRng::new(5);
        let flipped = world.natural_owner(RegionId(14), Some(&mut rng)).unwrap();
        assert!(flipped.was_coin_flip);
        assert_eq!(rng.cursor(), 1);
    }

    #[test]
    fn test_natural_owner_ignores_council() {
        let mut world = small_world();
        own(&mut world, &[13, 7, 8, 15], 1);
        own(&mut world, &[20], 0);
        world.set_council_realm(Some(RealmId(1)));
        let owner = world.natural_owner(RegionId(14), None).unwrap();
        assert_eq!(owner.realm, RealmId(0));
        assert_eq!(world.natural_owner(RegionId(0), None), None);
    }

    #[test]
    fn test_lootable_silver() {
        let mut world = small_world();
        own(&mut world, &[0], 1);
        world.region_mut(RegionId(0)).buildings = Buildings::CHURCH;
        assert_eq!(world.region_lootable_silver_worth(RegionId(0), RealmId(0)).unwrap(), 3);

        world.region_mut(RegionId(0)).buildings = Buildings::FORT;
        world.realm_mut(RealmId(0)).faction_index = 5; // loot more money
        assert_eq!(world.region_lootable_silver_worth(RegionId(0), RealmId(0)).unwrap(), 5);

        world.realm_mut(RealmId(1)).faction_index = 4; // richer territories
        // Fort yields the doubled flat rate, still under the minimum.
        assert_eq!(world.region_lootable_silver_worth(RegionId(0), RealmId(0)).unwrap(), 10);
    }

    #[test]
    fn test_world_round_trip() {
        let mut world = small_world();
        own(&mut world, &[3, 4], 1);
        world.region_mut(RegionId(5)).inert = true;
        world.set_council_realm(Some(RealmId(1)));
        world.set_starting_positions(vec![Position::new(1, 1), Position::new(4, 4)]);

        let bytes = world.to_bytes().unwrap();
        let mut dec = Decoder::new(&bytes);
        let decoded = World::decode_with_rules(&mut dec, world.shared_rules()).unwrap();
        assert!(dec.finish().is_ok());
        assert_eq!(decoded, world);
    }

    #[test]
    fn test_decode_rejects_foreign_realm_handles() {
        let decode = |world: &World| {
            let bytes = world.to_bytes().unwrap();
            World::decode_with_rules(&mut Decoder::new(&bytes), world.shared_rules())
        };

        let mut owned = small_world();
        owned.region_mut(RegionId(3)).owner = Some(RealmId(200));
        assert!(matches!(
            decode(&owned),
            Err(CodecError::HandleOutOfRange {
                record: "region owner",
                handle: 200,
                ..
            })
        ));

        let mut ruled = small_world();
        ruled.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(9));
        assert!(matches!(
            decode(&ruled),
            Err(CodecError::HandleOutOfRange { record: "subjugator", handle: 9, .. })
        ));

        let mut council = small_world();
        council.set_council_realm(Some(RealmId(50)));
        assert!(matches!(
            decode(&council),
            Err(CodecError::HandleOutOfRange { record: "council realm", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_short_grid() {
        let mut world = small_world();
        world.regions.pop();
        let bytes = world.to_bytes().unwrap();
        assert!(matches!(
            World::decode_with_rules(&mut Decoder::new(&bytes), world.shared_rules()),
            Err(CodecError::GridMismatch { side: 6, regions: 35 })
        ));
    }
}
