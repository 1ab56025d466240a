//! Initial world layout.
//!
//! Sizes the grid from the realm count, cuts inert columns and corner
//! triangles, picks well separated starting capitals and grows each realm's
//! starting territory. The council realm, when enabled, is always the last
//! realm and sits at the grid centre.

// Layout math runs on small non-negative integers bounded by the grid side.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::sync::Arc;

use crate::error::WorldError;
use crate::game::{
    Buildings, Position, RealmId, RegionId, Rules, World, cosine_percent, sine_percent,
};

/// Cells of growth a realm is laid out for.
const OPTIMAL_REALM_SIZE: i32 = 1;

/// Grid dimensions for a realm count: `(side_length, square_side_length)`.
#[must_use]
pub fn grid_dimensions(rules: &Rules, realms_without_council: usize) -> (i32, i32) {
    let mut count = realms_without_council;
    // Nine realms on a 3x3 square would leave no centre for the council.
    if count == 9 && rules.has_council_realm {
        count += 1;
    }

    let mut square = 0i32;
    while (square * square) < i32::try_from(count).unwrap_or(i32::MAX) {
        square += 1;
    }
    let square = square.max(2);

    let margin = i32::from(rules.initial_safety_margin_between_realms);
    let side = margin + (1 + margin + OPTIMAL_REALM_SIZE * 2) * square;
    (side, square)
}

impl World {
    /// Lay out a fresh world for `player_count` players.
    ///
    /// Realm indices `0..n` are the playable realms (players plus the
    /// rules' additional realms); the council, if any, is realm `n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the party is empty, the realm count exceeds the
    /// handle range, or the grid cannot place every realm.
    pub fn generate(rules: Arc<Rules>, player_count: usize) -> Result<Self, WorldError> {
        if player_count == 0 {
            return Err(WorldError::EmptyParty);
        }

        let playable = player_count + usize::from(rules.additional_realms_count);
        let realm_count = playable + usize::from(rules.has_council_realm);
        let realm_count_u8 =
            u8::try_from(realm_count).map_err(|_| WorldError::TooManyRealms(realm_count))?;

        let (side, square) = grid_dimensions(&rules, playable);
        let side_u8 = u8::try_from(side).map_err(|_| WorldError::GridTooLarge(side))?;
        let square_u8 = u8::try_from(square).map_err(|_| WorldError::GridTooLarge(side))?;

        let mut world = World::blank(Arc::clone(&rules), side_u8, square_u8, realm_count_u8);
        world.eat_columns();
        world.eat_corners();

        let mut positions = if playable.is_power_of_two() {
            world.grid_aligned_positions()
        } else {
            world.rotational_positions(playable)
        };

        if positions.len() < playable {
            return Err(WorldError::MapTooSmall {
                positions: positions.len(),
                realms: realm_count,
            });
        }

        if rules.has_council_realm {
            let middle = Position::new(side / 2, side / 2);
            match positions.iter().position(|&p| p == middle) {
                Some(index) => {
                    let last = positions.len() - 1;
                    positions.swap(index, last);
                }
                None => positions.push(middle),
            }
            // The council must not share a slot with a playable realm.
            if positions.len() < realm_count {
                return Err(WorldError::MapTooSmall {
                    positions: positions.len() - 1,
                    realms: realm_count,
                });
            }
        }

        world.set_starting_positions(positions.clone());

        for index in 0..realm_count_u8 {
            let realm = RealmId(index);
            let is_council = rules.has_council_realm && usize::from(index) == realm_count - 1;
            if is_council {
                world.set_council_realm(Some(realm));
                let size = (square - 3 + i32::from(rules.council_realm_region_size)).max(0);
                let at = positions[positions.len() - 1];
                world.initialize_realm(realm, at, size);
                world.dedicate_council_churches(realm);
            } else {
                let size = i32::from(rules.initial_realms_size);
                world.initialize_realm(realm, positions[usize::from(index)], size);
            }
        }

        Ok(world)
    }

    fn eat_columns(&mut self) {
        let side = self.side_length();
        let eaten = (i32::from(self.rules().eat_first_last_columns) - 3 + self.square_side_length())
            .max(0);
        for x in 0..side {
            if x < eaten || x >= side - eaten {
                for y in 0..side {
                    self.make_inert(Position::new(x, y));
                }
            }
        }
    }

    fn eat_corners(&mut self) {
        let side = self.side_length();
        let eaten = (i32::from(self.rules().eaten_corners) - 2 + self.square_side_length()).max(0);
        let left = (eaten - 1).max(0);
        for x in 0..side {
            for y in 0..side {
                let inv_x = side - x - 1;
                let inv_y = side - y - 1;
                if x + y <= left
                    || inv_x + y <= eaten
                    || inv_x + inv_y <= eaten
                    || x + inv_y <= left
                {
                    self.make_inert(Position::new(x, y));
                }
            }
        }
    }

    fn make_inert(&mut self, position: Position) {
        if let Some(id) = self.region_at(position) {
            self.region_mut(id).inert = true;
        }
    }

    fn grid_aligned_positions(&self) -> Vec<Position> {
        let safety = i32::from(self.rules().initial_safety_margin_between_realms);
        let margin = OPTIMAL_REALM_SIZE + safety;
        let spacing = OPTIMAL_REALM_SIZE * 2 + 1 + safety;
        let per_row = self.square_side_length();

        let mut positions = Vec::new();
        for x in 0..per_row {
            for y in 0..per_row {
                positions.push(Position::new(margin + x * spacing, margin + y * spacing));
            }
        }
        farthest_first(positions)
    }

    fn rotational_positions(&self, count: usize) -> Vec<Position> {
        let count_i32 = i32::try_from(count).unwrap_or(i32::MAX).max(1);
        let step = 360 / count_i32;
        let distance = (self.square_side_length() / 3) * OPTIMAL_REALM_SIZE
            + OPTIMAL_REALM_SIZE
            + 1
            + i32::from(self.rules().initial_safety_margin_between_realms);
        let side = self.side_length();
        let center = Position::new(side / 2, side / 2);

        let positions = (0..count_i32)
            .map(|i| {
                let angle = i * step;
                let offset = Position::new(
                    sine_percent(angle) * distance + 50,
                    cosine_percent(angle) * distance,
                );
                (center * 100 + offset) / 100
            })
            .collect();
        farthest_first(positions)
    }

    /// Capital at `at`, then `size` growth passes around the territory.
    ///
    /// A growth pass claims every neighbour of the territory that is
    /// unowned, and also steals already-owned neighbours next to every
    /// other territory cell. Capitals are never claimed.
    fn initialize_realm(&mut self, realm: RealmId, at: Position, size: i32) {
        let Some(capital) = self.region_at(at) else {
            return;
        };
        {
            let region = self.region_mut(capital);
            region.buildings = Buildings::CAPITAL;
            region.owner = Some(realm);
            region.inert = false;
        }

        for _ in 0..size {
            let territory = self.territory_of(realm, false);
            for (i, &cell) in territory.iter().enumerate() {
                for neighbor in self.neighbors(cell).iter() {
                    let region = self.region(neighbor);
                    if region.is_owned_by(realm) || region.buildings.contains(Buildings::CAPITAL) {
                        continue;
                    }
                    if !region.is_owned() || i % 2 == 0 {
                        self.region_mut(neighbor).owner = Some(realm);
                    }
                }
            }
        }

        let starting_silver = self.rules().starting_silver();
        let starting_decisions = i32::from(self.rules().starting_decision_count);
        let entry = self.realm_mut(realm);
        entry.silver_treasury = starting_silver;
        entry.available_decisions = starting_decisions;
    }

    fn dedicate_council_churches(&mut self, council: RealmId) {
        let council_regions: Vec<RegionId> = self
            .region_ids()
            .filter(|&id| self.region(id).is_owned_by(council))
            .collect();
        for id in council_regions {
            let region = self.region_mut(id);
            if region.buildings.is_empty() {
                region.buildings = Buildings::CHURCH;
            }
        }
    }
}

/// Reorder positions so each next one is farthest from the centroid of
/// those already taken. The first position stays first; ties keep their
/// input order.
fn farthest_first(mut remaining: Vec<Position>) -> Vec<Position> {
    let mut sorted = Vec::with_capacity(remaining.len());
    if remaining.is_empty() {
        return sorted;
    }
    sorted.push(remaining.remove(0));

    while !remaining.is_empty() {
        let sum = sorted
            .iter()
            .fold(Position::ORIGIN, |acc, &p| acc + p);
        let centroid = sum / i32::try_from(sorted.len()).unwrap_or(i32::MAX);
        remaining.sort_by_key(|p| std::cmp::Reverse(p.squared_distance(centroid)));
        sorted.push(remaining.remove(0));
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_world(players: usize) -> World {
        World::generate(Arc::new(Rules::default()), players).unwrap()
    }

    #[test]
    fn test_grid_dimensions() {
        let rules = Rules::default();
        assert_eq!(grid_dimensions(&rules, 1), (9, 2));
        assert_eq!(grid_dimensions(&rules, 4), (9, 2));
        assert_eq!(grid_dimensions(&rules, 5), (13, 3));
        // Nine realms with a council bump to a 4x4 square.
        assert_eq!(grid_dimensions(&rules, 9), (17, 4));

        let no_council = Rules {
            has_council_realm: false,
            ..Rules::default()
        };
        assert_eq!(grid_dimensions(&no_council, 9), (13, 3));
    }

    #[test]
    fn test_two_player_layout() {
        let world = stock_world(2);
        assert_eq!(world.side_length(), 9);
        assert_eq!(world.realm_count(), 4);
        assert_eq!(world.council_realm(), Some(RealmId(3)));
        assert_eq!(
            world.starting_positions(),
            &[
                Position::new(4, 7),
                Position::new(7, 2),
                Position::new(1, 2),
                Position::new(4, 4),
            ]
        );
    }

    #[test]
    fn test_every_realm_has_one_capital_at_its_position() {
        let world = stock_world(2);
        for realm in world.realm_ids() {
            let capitals: Vec<_> = world
                .region_ids()
                .filter(|&id| {
                    let r = world.region(id);
                    r.is_owned_by(realm) && r.buildings.contains(Buildings::CAPITAL)
                })
                .collect();
            assert_eq!(capitals.len(), 1, "{realm:?}");
            let at = world.position_of(capitals[0]);
            assert_eq!(at, world.starting_positions()[realm.index()]);
        }
    }

    #[test]
    fn test_starting_realms_and_treasury() {
        let world = stock_world(2);
        // (4, 7) keeps its full ring; the others lose cells to eaten corners.
        assert_eq!(world.territory_of(RealmId(0), false).len(), 7);
        for realm in world.realm_ids().take(3) {
            let size = world.territory_of(realm, false).len();
            assert!((5..=7).contains(&size), "{realm:?}: {size}");
            assert_eq!(world.realm(realm).silver_treasury, 20);
            assert_eq!(world.realm(realm).available_decisions, 3);
        }
        // A 2x2 square gives the council no growth.
        assert_eq!(world.territory_of(RealmId(3), false).len(), 1);
    }

    #[test]
    fn test_corners_are_inert_and_never_owned() {
        let world = stock_world(2);
        let corner = |x, y| world.region(world.region_at(Position::new(x, y)).unwrap());
        assert!(corner(0, 0).inert);
        assert!(corner(8, 0).inert);
        assert!(corner(0, 8).inert);
        assert!(corner(8, 8).inert);
        assert!(!corner(4, 4).inert);
        for region in world.regions() {
            assert!(!(region.inert && region.is_owned()));
        }
    }

    #[test]
    fn test_council_regions_get_churches() {
        let rules = Rules {
            council_realm_region_size: 2,
            ..Rules::default()
        };
        let world = World::generate(Arc::new(rules), 2).unwrap();
        let council = world.council_realm().unwrap();
        let territory = world.territory_of(council, false);
        assert!(territory.len() > 1);
        for id in territory {
            let b = world.region(id).buildings;
            assert!(b == Buildings::CAPITAL || b == Buildings::CHURCH);
        }
    }

    #[test]
    fn test_power_of_two_uses_grid() {
        // Three players plus one additional realm.
        let world = stock_world(3);
        assert_eq!(world.side_length(), 9);
        let mut positions = world.starting_positions()[..4].to_vec();
        positions.sort_by_key(|p| (p.x, p.y));
        assert_eq!(
            positions,
            vec![
                Position::new(2, 2),
                Position::new(2, 6),
                Position::new(6, 2),
                Position::new(6, 6),
            ]
        );
    }

    #[test]
    fn test_eight_realms_council_takes_grid_centre() {
        let world = stock_world(7);
        assert_eq!(world.side_length(), 13);
        assert_eq!(world.realm_count(), 9);
        assert_eq!(world.starting_positions()[8], Position::new(6, 6));
        let council = world.council_realm().unwrap();
        assert_eq!(
            world.position_of(world.capital_of(council).unwrap()),
            Position::new(6, 6)
        );
    }

    #[test]
    fn test_empty_party_is_rejected() {
        assert_eq!(
            World::generate(Arc::new(Rules::default()), 0),
            Err(WorldError::EmptyParty)
        );
    }

    #[test]
    fn test_farthest_first_keeps_first() {
        let sorted = farthest_first(vec![
            Position::new(0, 0),
            Position::new(1, 0),
            Position::new(10, 0),
            Position::new(5, 5),
        ]);
        assert_eq!(sorted[0], Position::new(0, 0));
        assert_eq!(sorted[1], Position::new(10, 0));
    }
}
