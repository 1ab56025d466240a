//! Regions: the cells of the world grid.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::{CodecError, RulesError};
use crate::game::{FactionFlags, RealmId, Rules};

/// Index of a region in the world arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RegionId(pub u16);

impl RegionId {
    /// Arena index of this region.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Encode for RegionId {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u16(self.0);
        Ok(())
    }
}

impl Decode for RegionId {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self(dec.get_u16()?))
    }
}

/// Building flags carried by a region.
///
/// Regions normally carry at most one building; the flag form exists so
/// lookups by exact value and membership tests read the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buildings(pub u8);

impl Buildings {
    /// No building.
    pub const NONE: Self = Self(0);
    /// A realm's capital.
    pub const CAPITAL: Self = Self(1);
    /// A fort.
    pub const FORT: Self = Self(2);
    /// A church.
    pub const CHURCH: Self = Self(4);

    /// Whether no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Buildings {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buildings {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One cell of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    /// Permanently unusable: never owned, never targetable.
    pub inert: bool,
    /// Owning realm, if any.
    pub owner: Option<RealmId>,
    /// Buildings standing on the region.
    pub buildings: Buildings,
}

impl Region {
    /// Whether any realm owns this region.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Whether `realm` owns this region.
    #[must_use]
    pub fn is_owned_by(&self, realm: RealmId) -> bool {
        self.owner == Some(realm)
    }

    /// Whether the region may act more than once per day.
    #[must_use]
    pub fn can_replay(&self, rules: &Rules) -> bool {
        self.is_owned() && self.buildings.contains(Buildings::CAPITAL) && rules.capital_can_replay
    }

    /// Whether no attack can ever take this region.
    #[must_use]
    pub fn cannot_be_taken(&self, rules: &Rules) -> bool {
        if self.inert {
            return true;
        }
        self.is_owned() && self.buildings.contains(Buildings::CAPITAL) && !rules.subjugation_enabled
    }

    /// Whether a single attacking region is not enough to take this region.
    #[must_use]
    pub fn is_reinforced_against_attack(&self, rules: &Rules) -> bool {
        (rules.subjugation_enabled && self.buildings.contains(Buildings::CAPITAL))
            || self.buildings.contains(Buildings::FORT)
    }

    /// Daily silver revenue of this region for an owner of the given faction.
    ///
    /// # Errors
    ///
    /// Returns an error if the region carries a building the rules do not know.
    pub fn silver_worth(&self, faction: FactionFlags, rules: &Rules) -> Result<i32, RulesError> {
        let riches = faction.contains(FactionFlags::RICHER_TERRITORIES);
        let mut revenue = rules.silver_revenue_per_region;
        if riches {
            revenue *= rules.factions.riches_silver_multiplier;
        }

        if !self.buildings.is_empty() {
            let settings = rules.building(self.buildings)?;
            if settings.silver_revenue != 0 {
                revenue = i32::from(settings.silver_revenue);
                if riches {
                    revenue = revenue * rules.factions.riches_building_multiplier
                        / rules.factions.riches_building_divider;
                }
            }
        }

        Ok(revenue)
    }
}

impl Encode for Region {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_bool(self.inert);
        enc.put_bool(self.owner.is_some());
        enc.put_u8(self.owner.map_or(0, |r| r.0));
        enc.put_u8(self.buildings.0);
        Ok(())
    }
}

impl Decode for Region {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let inert = dec.get_bool()?;
        let owned = dec.get_bool()?;
        let owner = dec.get_u8()?;
        let buildings = Buildings(dec.get_u8()?);
        Ok(Self {
            inert,
            owner: owned.then_some(RealmId(owner)),
            buildings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(buildings: Buildings) -> Region {
        Region {
            inert: false,
            owner: Some(RealmId(0)),
            buildings,
        }
    }

    #[test]
    fn test_building_flags() {
        let mut b = Buildings::NONE;
        assert!(b.is_empty());
        b |= Buildings::FORT;
        assert!(b.contains(Buildings::FORT));
        assert!(!b.contains(Buildings::CAPITAL));
        assert_eq!(b | Buildings::CHURCH, Buildings(6));
    }

    #[test]
    fn test_capital_replay_and_taking() {
        let mut rules = Rules::default();
        let capital = owned(Buildings::CAPITAL);
        assert!(capital.can_replay(&rules));
        assert!(!capital.cannot_be_taken(&rules));
        assert!(capital.is_reinforced_against_attack(&rules));

        rules.subjugation_enabled = false;
        assert!(capital.cannot_be_taken(&rules));
        assert!(!capital.is_reinforced_against_attack(&rules));

        rules.capital_can_replay = false;
        assert!(!capital.can_replay(&rules));
    }

    #[test]
    fn test_inert_cannot_be_taken() {
        let rules = Rules::default();
        let region = Region {
            inert: true,
            ..Region::default()
        };
        assert!(region.cannot_be_taken(&rules));
    }

    #[test]
    fn test_fort_is_reinforced() {
        let rules = Rules::default();
        assert!(owned(Buildings::FORT).is_reinforced_against_attack(&rules));
        assert!(!owned(Buildings::CHURCH).is_reinforced_against_attack(&rules));
    }

    #[test]
    fn test_silver_worth() {
        let rules = Rules::default();
        let plain = owned(Buildings::NONE);
        assert_eq!(plain.silver_worth(FactionFlags::NONE, &rules).unwrap(), 1);
        assert_eq!(
            plain
                .silver_worth(FactionFlags::RICHER_TERRITORIES, &rules)
                .unwrap(),
            2
        );

        // Church overrides the flat rate; forts have no override.
        let church = owned(Buildings::CHURCH);
        assert_eq!(church.silver_worth(FactionFlags::NONE, &rules).unwrap(), 3);
        assert_eq!(
            church
                .silver_worth(FactionFlags::RICHER_TERRITORIES, &rules)
                .unwrap(),
            4
        );
        let fort = owned(Buildings::FORT);
        assert_eq!(fort.silver_worth(FactionFlags::NONE, &rules).unwrap(), 1);
    }

    #[test]
    fn test_unknown_building_is_an_error() {
        let rules = Rules::default();
        let odd = owned(Buildings(0x80));
        assert!(matches!(
            odd.silver_worth(FactionFlags::NONE, &rules),
            Err(RulesError::UnknownBuilding(Buildings(0x80)))
        ));
    }
}
