//! Effects: the atomic state mutations resolution produces.
//!
//! Effects are plain data. Each one is applied with the world the day
//! started from (`previous`, read-only) and the world being built (`next`).
//! Players never submit effects; only resolution creates them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{Buildings, FactionFlags, RealmId, RegionId, World};

/// Outcome of the attacks on one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conquest {
    /// Region under attack.
    pub region: RegionId,
    /// Realm credited with the attack.
    pub attacking_realm: RealmId,
    /// Regions the attack was launched from.
    pub attacking_regions: Vec<RegionId>,
    /// Owner before the attack.
    pub previous_owner: Option<RealmId>,
    /// Owner after the attack; equal to `previous_owner` on failure.
    pub new_owner: Option<RealmId>,
    /// Whether a draw picked the attacking realm among tied contenders.
    pub is_coin_flip: bool,
    /// Tied contenders that lost the draw.
    pub coin_flip_losers: Vec<RealmId>,
    /// Silver taken by the attacker.
    pub silver_looted: i32,
    /// Whether the region carried a building when attacked.
    pub had_building: bool,
    /// Faction abilities that showed in this attack.
    pub highlights: FactionFlags,
}

impl Conquest {
    /// Whether the region changed hands.
    #[must_use]
    pub fn success(&self) -> bool {
        self.new_owner != self.previous_owner
    }
}

/// A closed mutation of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Attack outcome on a region.
    Conquest(Conquest),
    /// A region cut off from its realm, or an enclosed neutral region,
    /// changes hands by neighbour majority.
    Starvation {
        /// Region changing hands.
        region: RegionId,
        /// New owner, or none when the region is abandoned.
        new_owner: Option<RealmId>,
        /// Fixpoint pass that produced the effect.
        wave: u8,
        /// Whether a draw broke a neighbour tie.
        was_coin_flip: bool,
    },
    /// A building is raised.
    Construction {
        /// Region receiving the building.
        region: RegionId,
        /// Building raised.
        building: Buildings,
        /// Realm that ordered it.
        for_owner: RealmId,
        /// Price charged.
        silver_price: i32,
        /// Whether the build showed a faction ability.
        highlight: bool,
    },
    /// A realm buys council favour.
    FavourPayment {
        /// Realm paying.
        realm: RealmId,
        /// Price charged.
        silver_price: i32,
    },
    /// A realm buys one more daily decision.
    AdministrationUpgrade {
        /// Realm paying.
        realm: RealmId,
        /// Price charged.
        silver_price: i32,
    },
    /// `attacker` (or its own subjugator) absorbs `target`.
    Subjugation {
        /// Realm that took the capital.
        attacker: RealmId,
        /// Realm that lost its capital.
        target: RealmId,
    },
}

impl Effect {
    /// Region this effect touches, if any.
    #[must_use]
    pub const fn region(&self) -> Option<RegionId> {
        match self {
            Self::Conquest(conquest) => Some(conquest.region),
            Self::Starvation { region, .. } | Self::Construction { region, .. } => Some(*region),
            Self::FavourPayment { .. }
            | Self::AdministrationUpgrade { .. }
            | Self::Subjugation { .. } => None,
        }
    }

    /// Whether a random draw decided this effect.
    #[must_use]
    pub const fn is_coin_flip(&self) -> bool {
        match self {
            Self::Conquest(conquest) => conquest.is_coin_flip,
            Self::Starvation { was_coin_flip, .. } => *was_coin_flip,
            _ => false,
        }
    }

    /// Apply this effect to `next`.
    ///
    /// `previous` is the world the day started from and is only read.
    pub fn apply(&self, previous: &World, next: &mut World) {
        match self {
            Self::Conquest(conquest) => apply_conquest(conquest, previous, next),
            Self::Starvation {
                region, new_owner, ..
            } => {
                // Capitals only change hands through subjugation.
                if next.region(*region).buildings.contains(Buildings::CAPITAL) {
                    return;
                }
                let keeps_building = new_owner.is_some_and(|owner| {
                    previous
                        .realm_faction(owner)
                        .contains(FactionFlags::CONQUEST_BUILDING)
                });
                let target = next.region_mut(*region);
                target.owner = *new_owner;
                if !keeps_building {
                    target.buildings = Buildings::NONE;
                }
            }
            Self::Construction {
                region,
                building,
                for_owner,
                silver_price,
                ..
            } => {
                let Some(owner) = next.region(*region).owner else {
                    return;
                };
                if next.top_subjugator(owner) != next.top_subjugator(*for_owner) {
                    return;
                }
                next.region_mut(*region).buildings |= *building;
                next.add_silver_treasury(owner, -*silver_price);
            }
            Self::FavourPayment {
                realm,
                silver_price,
            } => {
                let payer = next.top_subjugator(*realm);
                next.realm_mut(payer).is_favoured = true;
                next.add_silver_treasury(*realm, -*silver_price);
            }
            Self::AdministrationUpgrade {
                realm,
                silver_price,
            } => {
                next.realm_mut(*realm).available_decisions += 1;
                next.add_silver_treasury(*realm, -*silver_price);
            }
            Self::Subjugation { attacker, target } => apply_subjugation(*attacker, *target, next),
        }
    }
}

fn apply_conquest(conquest: &Conquest, previous: &World, next: &mut World) {
    if conquest.silver_looted > 0 {
        next.add_silver_treasury(conquest.attacking_realm, conquest.silver_looted);
    }

    if !conquest.success() {
        return;
    }
    let region = next.region(conquest.region);
    if region.buildings.contains(Buildings::CAPITAL) {
        return;
    }

    let keeps_building = conquest.new_owner.is_some_and(|owner| {
        previous
            .realm_faction(owner)
            .contains(FactionFlags::CONQUEST_BUILDING)
    });
    let target = next.region_mut(conquest.region);
    target.owner = conquest.new_owner;
    if !keeps_building {
        target.buildings = Buildings::NONE;
    }
}

/// Fold `target` into the realm that ultimately rules `attacker`.
///
/// Treasury and favour move to the ruler, and realms `target` ruled are
/// handed over so no chain of subjugation survives.
fn apply_subjugation(attacker: RealmId, target: RealmId, next: &mut World) {
    if attacker == target {
        return;
    }
    let ruler = next.top_subjugator(attacker);
    if ruler == target {
        return;
    }

    let absorbed = *next.realm(target);
    {
        let ruling = next.realm_mut(ruler);
        ruling.silver_treasury += absorbed.silver_treasury;
        ruling.is_favoured |= absorbed.is_favoured;
    }
    {
        let subject = next.realm_mut(target);
        subject.silver_treasury = 0;
        subject.is_favoured = false;
        subject.subjugated_by = Some(ruler);
    }

    for realm in next.realm_ids() {
        if realm != ruler && next.realm(realm).subjugated_by == Some(target) {
            next.realm_mut(realm).subjugated_by = Some(ruler);
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = |realm: Option<RealmId>| {
            realm.map_or_else(|| "nobody".to_string(), |r| r.0.to_string())
        };
        match self {
            Self::Conquest(c) => write!(
                f,
                "conquest of {} by realm {} from {:?}: {} -> {}{}{}",
                c.region.0,
                c.attacking_realm.0,
                c.attacking_regions.iter().map(|r| r.0).collect::<Vec<_>>(),
                owner(c.previous_owner),
                owner(c.new_owner),
                if c.is_coin_flip { " (coin flip)" } else { "" },
                if c.silver_looted > 0 {
                    format!(", {} silver looted", c.silver_looted)
                } else {
                    String::new()
                },
            ),
            Self::Starvation {
                region,
                new_owner,
                wave,
                was_coin_flip,
            } => write!(
                f,
                "starvation of {} to {} (wave {wave}{})",
                region.0,
                owner(*new_owner),
                if *was_coin_flip { ", coin flip" } else { "" }
            ),
            Self::Construction {
                region,
                building,
                for_owner,
                silver_price,
                ..
            } => write!(
                f,
                "construction of {building:?} on {} for realm {} ({silver_price} silver)",
                region.0, for_owner.0
            ),
            Self::FavourPayment {
                realm,
                silver_price,
            } => write!(f, "favour payment by realm {} ({silver_price} silver)", realm.0),
            Self::AdministrationUpgrade {
                realm,
                silver_price,
            } => write!(
                f,
                "administration upgrade of realm {} ({silver_price} silver)",
                realm.0
            ),
            Self::Subjugation { attacker, target } => {
                write!(f, "subjugation of realm {} by realm {}", target.0, attacker.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::game::Rules;

    fn world() -> World {
        let mut world = World::blank(Arc::new(Rules::default()), 6, 2, 3);
        for realm in world.realm_ids() {
            world.realm_mut(realm).silver_treasury = 100;
        }
        world
    }

    fn conquest(region: u16, from: Option<u8>, to: Option<u8>) -> Conquest {
        Conquest {
            region: RegionId(region),
            attacking_realm: RealmId(0),
            attacking_regions: vec![RegionId(0)],
            previous_owner: from.map(RealmId),
            new_owner: to.map(RealmId),
            is_coin_flip: false,
            coin_flip_losers: Vec::new(),
            silver_looted: 0,
            had_building: false,
            highlights: FactionFlags::NONE,
        }
    }

    #[test]
    fn test_conquest_takes_region_and_clears_building() {
        let previous = world();
        let mut next = previous.clone();
        next.region_mut(RegionId(5)).owner = Some(RealmId(1));
        next.region_mut(RegionId(5)).buildings = Buildings::CHURCH;

        Effect::Conquest(conquest(5, Some(1), Some(0))).apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(5)).owner, Some(RealmId(0)));
        assert_eq!(next.region(RegionId(5)).buildings, Buildings::NONE);
    }

    #[test]
    fn test_conquest_building_faction_keeps_building() {
        let mut previous = world();
        previous.realm_mut(RealmId(0)).faction_index = 2; // conquest building
        let mut next = previous.clone();
        next.region_mut(RegionId(5)).owner = Some(RealmId(1));
        next.region_mut(RegionId(5)).buildings = Buildings::FORT;

        Effect::Conquest(conquest(5, Some(1), Some(0))).apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(5)).buildings, Buildings::FORT);
    }

    #[test]
    fn test_capital_is_immune_to_conquest_and_starvation() {
        let previous = world();
        let mut next = previous.clone();
        next.region_mut(RegionId(5)).owner = Some(RealmId(1));
        next.region_mut(RegionId(5)).buildings = Buildings::CAPITAL;

        Effect::Conquest(conquest(5, Some(1), Some(0))).apply(&previous, &mut next);
        Effect::Starvation {
            region: RegionId(5),
            new_owner: None,
            wave: 0,
            was_coin_flip: false,
        }
        .apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(5)).owner, Some(RealmId(1)));
    }

    #[test]
    fn test_failed_conquest_still_credits_loot() {
        let previous = world();
        let mut next = previous.clone();
        let mut failed = conquest(5, Some(1), Some(1));
        failed.silver_looted = 6;
        Effect::Conquest(failed).apply(&previous, &mut next);
        assert_eq!(next.realm(RealmId(0)).silver_treasury, 106);
        assert_eq!(next.region(RegionId(5)).owner, None);
    }

    #[test]
    fn test_starvation_abandons_region() {
        let previous = world();
        let mut next = previous.clone();
        next.region_mut(RegionId(9)).owner = Some(RealmId(2));
        next.region_mut(RegionId(9)).buildings = Buildings::CHURCH;
        Effect::Starvation {
            region: RegionId(9),
            new_owner: None,
            wave: 1,
            was_coin_flip: false,
        }
        .apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(9)), &crate::game::Region::default());
    }

    #[test]
    fn test_construction_revalidates_owner() {
        let previous = world();
        let mut next = previous.clone();
        let build = Effect::Construction {
            region: RegionId(3),
            building: Buildings::FORT,
            for_owner: RealmId(0),
            silver_price: 40,
            highlight: false,
        };

        build.apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(3)).buildings, Buildings::NONE);

        next.region_mut(RegionId(3)).owner = Some(RealmId(1));
        build.apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(3)).buildings, Buildings::NONE);

        next.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(0));
        build.apply(&previous, &mut next);
        assert_eq!(next.region(RegionId(3)).buildings, Buildings::FORT);
        assert_eq!(next.realm(RealmId(0)).silver_treasury, 60);
    }

    #[test]
    fn test_purchases() {
        let previous = world();
        let mut next = previous.clone();
        Effect::FavourPayment {
            realm: RealmId(1),
            silver_price: 100,
        }
        .apply(&previous, &mut next);
        Effect::AdministrationUpgrade {
            realm: RealmId(2),
            silver_price: 20,
        }
        .apply(&previous, &mut next);

        assert!(next.realm(RealmId(1)).is_favoured);
        assert_eq!(next.realm(RealmId(1)).silver_treasury, 0);
        assert_eq!(next.realm(RealmId(2)).available_decisions, 1);
        assert_eq!(next.realm(RealmId(2)).silver_treasury, 80);
        assert_eq!(next.realm(RealmId(2)).total_spent, 20);
    }

    #[test]
    fn test_subjugation_folds_treasury_and_favour() {
        let previous = world();
        let mut next = previous.clone();
        next.realm_mut(RealmId(1)).is_favoured = true;
        next.realm_mut(RealmId(2)).subjugated_by = Some(RealmId(1));

        Effect::Subjugation {
            attacker: RealmId(0),
            target: RealmId(1),
        }
        .apply(&previous, &mut next);

        let ruler = next.realm(RealmId(0));
        assert_eq!(ruler.silver_treasury, 200);
        assert!(ruler.is_favoured);
        assert_eq!(next.realm(RealmId(1)).subjugated_by, Some(RealmId(0)));
        assert_eq!(next.realm(RealmId(1)).silver_treasury, 0);
        // Former subjects of the target are handed over.
        assert_eq!(next.realm(RealmId(2)).subjugated_by, Some(RealmId(0)));
        let total: i32 = next.realms().iter().map(|r| r.silver_treasury).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_subjugated_attacker_subjugates_for_its_ruler() {
        let previous = world();
        let mut next = previous.clone();
        next.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(2));

        Effect::Subjugation {
            attacker: RealmId(1),
            target: RealmId(0),
        }
        .apply(&previous, &mut next);
        assert_eq!(next.realm(RealmId(0)).subjugated_by, Some(RealmId(2)));

        // The ruler taking back a subject's capital is a no-op.
        let before = next.clone();
        Effect::Subjugation {
            attacker: RealmId(0),
            target: RealmId(2),
        }
        .apply(&previous, &mut next);
        assert_eq!(next, before);
    }
}
