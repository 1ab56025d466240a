//! Immutable rule configuration shared by a whole session.
//!
//! Silver amounts are expressed in tenths of a gold piece; the gold-named
//! prices are multiplied by ten where they turn into silver.
//!
//! Rules load from JSON (missing fields take the stock defaults) and also
//! have a versioned binary layout that travels inside snapshots.

use std::ops::{BitOr, BitOrAssign};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::{CodecError, RulesError};
use crate::game::Buildings;

/// Behaviour flags granted by a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionFlags(pub u16);

impl FactionFlags {
    /// No special behaviour.
    pub const NONE: Self = Self(0);
    /// Attacks reach two cells away.
    pub const CHARGE: Self = Self(1);
    /// Conquered regions keep their buildings.
    pub const CONQUEST_BUILDING: Self = Self(2);
    /// Collects money from neighbouring buildings.
    pub const GET_MONEY_FROM_NEIGHBOR_BUILDINGS: Self = Self(4);
    /// Forts anchor territory like a capital.
    pub const FORTS_COUNT_AS_CAPITAL: Self = Self(8);
    /// Regions yield more silver.
    pub const RICHER_TERRITORIES: Self = Self(16);
    /// Looting yields at least a minimum amount.
    pub const LOOT_MORE_MONEY: Self = Self(32);
    /// Taking a fort pays a fixed bounty.
    pub const CONQUERED_FORTS_GIVE_PAYOUT: Self = Self(64);
    /// Planned enemy constructions are visible.
    pub const SEE_ENEMY_PLANNED_CONSTRUCTIONS: Self = Self(128);

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FactionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FactionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Council voting criteria, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Criterion {
    /// Largest treasury.
    MaxMoney = 1,
    /// Most owned regions.
    MaxLands = 2,
    /// Most regions with a building.
    MaxDevelopment = 3,
    /// Paid for council favour.
    Favoured = 4,
    /// Most churches.
    MaxChurches = 5,
    /// Picked at random.
    Accident = 6,
    /// Longest border with the council.
    CouncilNeighbor = 7,
    /// Most available decisions.
    BestAdministration = 8,
    /// Fewest regions left.
    Martyrdom = 9,
}

impl Criterion {
    /// Every criterion in evaluation order.
    pub const ALL: [Self; 9] = [
        Self::MaxMoney,
        Self::MaxLands,
        Self::MaxDevelopment,
        Self::Favoured,
        Self::MaxChurches,
        Self::Accident,
        Self::CouncilNeighbor,
        Self::BestAdministration,
        Self::Martyrdom,
    ];

    /// Upper bound on simultaneously used criteria.
    pub const COUNT: usize = 10;

    /// Wire tag of this criterion.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Criterion for a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::MaxMoney),
            2 => Some(Self::MaxLands),
            3 => Some(Self::MaxDevelopment),
            4 => Some(Self::Favoured),
            5 => Some(Self::MaxChurches),
            6 => Some(Self::Accident),
            7 => Some(Self::CouncilNeighbor),
            8 => Some(Self::BestAdministration),
            9 => Some(Self::Martyrdom),
            _ => None,
        }
    }
}

impl Encode for Criterion {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(self.tag());
        Ok(())
    }
}

impl Decode for Criterion {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let tag = dec.get_u8()?;
        Self::from_tag(tag).ok_or(CodecError::InvalidTag {
            record: "criterion",
            tag,
        })
    }
}

/// Economy of one building kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSettings {
    /// Building these settings describe.
    pub building: Buildings,
    /// Daily revenue replacing the flat rate; zero keeps the flat rate.
    pub silver_revenue: u8,
    /// Construction price.
    pub silver_cost: u8,
    /// Whether players may construct it.
    pub can_be_built: bool,
}

impl Encode for BuildingSettings {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(self.building.0);
        enc.put_u8(self.silver_revenue);
        enc.put_u8(self.silver_cost);
        enc.put_bool(self.can_be_built);
        Ok(())
    }
}

impl Decode for BuildingSettings {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            building: Buildings(dec.get_u8()?),
            silver_revenue: dec.get_u8()?,
            silver_cost: dec.get_u8()?,
            can_be_built: dec.get_bool()?,
        })
    }
}

/// Configuration of one voting criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSettings {
    /// Criterion these settings describe.
    pub criterion: Criterion,
    /// Whether the criterion is used at all.
    pub enabled: bool,
    /// Councils that must have passed before it applies.
    pub active_after_councils: u8,
    /// Relative weight when criteria are pruned at random.
    pub chances_to_be_selected: u8,
    /// Influence awarded to each winner.
    pub influence_weight: u8,
}

impl Encode for VotingSettings {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        self.criterion.encode(enc)?;
        enc.put_bool(self.enabled);
        enc.put_u8(self.active_after_councils);
        enc.put_u8(self.chances_to_be_selected);
        enc.put_u8(self.influence_weight);
        Ok(())
    }
}

impl Decode for VotingSettings {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            criterion: Criterion::decode(dec)?,
            enabled: dec.get_bool()?,
            active_after_councils: dec.get_u8()?,
            chances_to_be_selected: dec.get_u8()?,
            influence_weight: dec.get_u8()?,
        })
    }
}

/// Council election configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingRules {
    /// Size of the voter pool.
    pub voter_count: i32,
    /// Maximum criteria used, indexed by council number (last entry repeats).
    pub criterias_used_per_vote: Vec<u8>,
    /// Turnout percentage, indexed by council number (last entry repeats).
    pub turnover_percentage_per_council: Vec<u8>,
    /// Per-criterion settings.
    pub criteria: Vec<VotingSettings>,
}

impl VotingRules {
    const VERSION: u8 = 1;

    /// Turnout percentage for the council with the given index.
    #[must_use]
    pub fn turnout_percentage(&self, councils_passed: u32) -> i32 {
        schedule_entry(&self.turnover_percentage_per_council, councils_passed).map_or(100, i32::from)
    }

    /// Maximum simultaneously used criteria for the given council index.
    #[must_use]
    pub fn criteria_cap(&self, councils_passed: u32) -> usize {
        schedule_entry(&self.criterias_used_per_vote, councils_passed)
            .map_or(Criterion::COUNT, usize::from)
            .min(Criterion::COUNT)
    }
}

fn schedule_entry(schedule: &[u8], index: u32) -> Option<u8> {
    let last = schedule.len().checked_sub(1)?;
    let i = usize::try_from(index).map_or(last, |i| i.min(last));
    schedule.get(i).copied()
}

impl Default for VotingRules {
    fn default() -> Self {
        let setting = |criterion, active_after_councils, chances_to_be_selected, influence_weight| {
            VotingSettings {
                criterion,
                enabled: true,
                active_after_councils,
                chances_to_be_selected,
                influence_weight,
            }
        };
        Self {
            voter_count: 33,
            criterias_used_per_vote: vec![255],
            turnover_percentage_per_council: vec![33, 51, 75, 95, 100],
            criteria: vec![
                setting(Criterion::MaxMoney, 0, 10, 1),
                setting(Criterion::MaxLands, 0, 10, 2),
                setting(Criterion::MaxDevelopment, 1, 10, 1),
                setting(Criterion::Favoured, 0, 10, 1),
                setting(Criterion::MaxChurches, 0, 10, 1),
                setting(Criterion::Accident, 2, 5, 1),
                setting(Criterion::CouncilNeighbor, 0, 10, 1),
                setting(Criterion::BestAdministration, 1, 10, 1),
                setting(Criterion::Martyrdom, 2, 5, 1),
            ],
        }
    }
}

impl Encode for VotingRules {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(Self::VERSION);
        enc.put_i32(self.voter_count);
        enc.put_blob(&self.criterias_used_per_vote)?;
        enc.put_blob(&self.turnover_percentage_per_council)?;
        enc.put_seq(&self.criteria)
    }
}

impl Decode for VotingRules {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.get_version("voting rules", Self::VERSION)?;
        Ok(Self {
            voter_count: dec.get_i32()?,
            criterias_used_per_vote: dec.get_blob()?,
            turnover_percentage_per_council: dec.get_blob()?,
            criteria: dec.get_seq()?,
        })
    }
}

/// Faction table and the multipliers faction flags refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionSettings {
    /// Flags of each faction, indexed by faction index.
    pub flags_for_faction: Vec<FactionFlags>,
    /// Flat-rate multiplier for `RICHER_TERRITORIES`.
    pub riches_silver_multiplier: i32,
    /// Building revenue multiplier for `RICHER_TERRITORIES`.
    pub riches_building_multiplier: i32,
    /// Building revenue divider for `RICHER_TERRITORIES`.
    pub riches_building_divider: i32,
    /// Minimum-loot multiplier against `RICHER_TERRITORIES` regions.
    pub looter_riches_multiplier: i32,
    /// Minimum loot for `LOOT_MORE_MONEY`.
    pub looter_minimum_silver: i32,
    /// Bounty for `CONQUERED_FORTS_GIVE_PAYOUT`.
    pub conquered_fort_payout: i32,
}

impl Default for FactionSettings {
    fn default() -> Self {
        Self {
            flags_for_faction: vec![
                FactionFlags::NONE,
                FactionFlags::CHARGE,
                FactionFlags::CONQUEST_BUILDING,
                FactionFlags::FORTS_COUNT_AS_CAPITAL,
                FactionFlags::RICHER_TERRITORIES,
                FactionFlags::LOOT_MORE_MONEY,
                FactionFlags::CONQUERED_FORTS_GIVE_PAYOUT,
                FactionFlags::SEE_ENEMY_PLANNED_CONSTRUCTIONS,
            ],
            riches_silver_multiplier: 2,
            riches_building_multiplier: 3,
            riches_building_divider: 2,
            looter_riches_multiplier: 2,
            looter_minimum_silver: 5,
            conquered_fort_payout: 20,
        }
    }
}

impl Encode for FactionSettings {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_count(self.flags_for_faction.len())?;
        for flags in &self.flags_for_faction {
            enc.put_u16(flags.0);
        }
        enc.put_i32(self.riches_silver_multiplier);
        enc.put_i32(self.riches_building_multiplier);
        enc.put_i32(self.riches_building_divider);
        enc.put_i32(self.looter_riches_multiplier);
        enc.put_i32(self.looter_minimum_silver);
        enc.put_i32(self.conquered_fort_payout);
        Ok(())
    }
}

impl Decode for FactionSettings {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let count = usize::from(dec.get_u16()?);
        let mut flags_for_faction = Vec::with_capacity(count.min(dec.remaining()));
        for _ in 0..count {
            flags_for_faction.push(FactionFlags(dec.get_u16()?));
        }
        Ok(Self {
            flags_for_faction,
            riches_silver_multiplier: dec.get_i32()?,
            riches_building_multiplier: dec.get_i32()?,
            riches_building_divider: dec.get_i32()?,
            looter_riches_multiplier: dec.get_i32()?,
            looter_minimum_silver: dec.get_i32()?,
            conquered_fort_payout: dec.get_i32()?,
        })
    }
}

/// The full rule set of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Growth passes applied around each starting capital.
    pub initial_realms_size: u8,
    /// Realms added on top of the players.
    pub additional_realms_count: u8,
    /// Extra growth of the council territory.
    pub council_realm_region_size: u8,
    /// Whether a council realm sits at the map centre.
    pub has_council_realm: bool,
    /// Starting gold per realm.
    pub starting_gold: i32,
    /// Empty cells kept between starting realms.
    pub initial_safety_margin_between_realms: u8,
    /// Extra days before the first council.
    pub initial_vote_turns_delay: u8,
    /// Gold price of the first administration upgrade.
    pub enhance_admin_gold_price: i32,
    /// Gold added to the upgrade price per upgrade already bought.
    pub enhance_admin_gold_price_increase_per_upgrade: i32,
    /// Gold price of council favour.
    pub favour_gold_price: i32,
    /// Whether failed attacks on buildings loot silver.
    pub allow_looting: bool,
    /// Silver looted from a capital when subjugation is off.
    pub silver_looted_on_capital: i32,
    /// Whether enclosed neutral regions are absorbed.
    pub neutral_region_starvation: bool,
    /// Absorb enclosed neutral regions only when a single realm surrounds them.
    pub go_take_neutral_only_when_no_contest: bool,
    /// Days between councils.
    pub turns_between_votes: u8,
    /// Size of the inert triangle cut from each corner.
    pub eaten_corners: u8,
    /// Inert columns cut from each side.
    pub eat_first_last_columns: u8,
    /// Decisions per day at the start.
    pub starting_decision_count: u8,
    /// Ceiling for administration upgrades.
    pub max_decision_count: u8,
    /// Flat daily silver per owned region.
    pub silver_revenue_per_region: i32,
    /// Whether capitals may act more than once per day.
    pub capital_can_replay: bool,
    /// Whether taking a capital subjugates its realm.
    pub subjugation_enabled: bool,
    /// Building economy.
    pub buildings: Vec<BuildingSettings>,
    /// Council voting.
    pub voting: VotingRules,
    /// Faction table.
    pub factions: FactionSettings,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            initial_realms_size: 1,
            additional_realms_count: 1,
            council_realm_region_size: 1,
            has_council_realm: true,
            starting_gold: 2,
            initial_safety_margin_between_realms: 1,
            initial_vote_turns_delay: 1,
            enhance_admin_gold_price: 2,
            enhance_admin_gold_price_increase_per_upgrade: 10,
            favour_gold_price: 10,
            allow_looting: true,
            silver_looted_on_capital: 10,
            neutral_region_starvation: true,
            go_take_neutral_only_when_no_contest: true,
            turns_between_votes: 4,
            eaten_corners: 2,
            eat_first_last_columns: 1,
            starting_decision_count: 3,
            max_decision_count: 5,
            silver_revenue_per_region: 1,
            capital_can_replay: true,
            subjugation_enabled: true,
            buildings: vec![
                BuildingSettings {
                    building: Buildings::CAPITAL,
                    silver_revenue: 5,
                    silver_cost: 0,
                    can_be_built: false,
                },
                BuildingSettings {
                    building: Buildings::FORT,
                    silver_revenue: 0,
                    silver_cost: 40,
                    can_be_built: true,
                },
                BuildingSettings {
                    building: Buildings::CHURCH,
                    silver_revenue: 3,
                    silver_cost: 60,
                    can_be_built: true,
                },
            ],
            voting: VotingRules::default(),
            factions: FactionSettings::default(),
        }
    }
}

impl Rules {
    const VERSION: u8 = 1;

    /// Parse rules from JSON; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load rules from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON form of the rules.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, RulesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Settings of the building with exactly these flags.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::UnknownBuilding`] if no entry matches.
    pub fn building(&self, building: Buildings) -> Result<&BuildingSettings, RulesError> {
        self.buildings
            .iter()
            .find(|b| b.building == building)
            .ok_or(RulesError::UnknownBuilding(building))
    }

    /// Settings of a voting criterion.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::UnknownCriterion`] if no entry matches.
    pub fn voting_setting(&self, criterion: Criterion) -> Result<&VotingSettings, RulesError> {
        self.voting
            .criteria
            .iter()
            .find(|v| v.criterion == criterion)
            .ok_or(RulesError::UnknownCriterion(criterion))
    }

    /// Flags of a faction index; unconfigured indices have none.
    #[must_use]
    pub fn faction_flags(&self, faction_index: u8) -> FactionFlags {
        self.factions
            .flags_for_faction
            .get(usize::from(faction_index))
            .copied()
            .unwrap_or_default()
    }

    /// Silver a realm starts with.
    #[must_use]
    pub const fn starting_silver(&self) -> i32 {
        self.starting_gold * 10
    }

    /// Silver price of council favour.
    #[must_use]
    pub const fn favour_silver_price(&self) -> i32 {
        self.favour_gold_price * 10
    }

    /// Silver price of the next administration upgrade for a realm with
    /// `available_decisions` decisions.
    #[must_use]
    pub fn administration_upgrade_price(&self, available_decisions: i32) -> i32 {
        let upgrades = available_decisions - i32::from(self.starting_decision_count);
        (self.enhance_admin_gold_price + upgrades * self.enhance_admin_gold_price_increase_per_upgrade)
            * 10
    }
}

impl Encode for Rules {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(Self::VERSION);
        enc.put_u8(self.initial_realms_size);
        enc.put_u8(self.additional_realms_count);
        enc.put_u8(self.council_realm_region_size);
        enc.put_bool(self.has_council_realm);
        enc.put_i32(self.starting_gold);
        enc.put_u8(self.initial_safety_margin_between_realms);
        enc.put_u8(self.initial_vote_turns_delay);
        enc.put_i32(self.enhance_admin_gold_price);
        enc.put_i32(self.enhance_admin_gold_price_increase_per_upgrade);
        enc.put_i32(self.favour_gold_price);
        enc.put_bool(self.allow_looting);
        enc.put_i32(self.silver_looted_on_capital);
        enc.put_bool(self.neutral_region_starvation);
        enc.put_bool(self.go_take_neutral_only_when_no_contest);
        enc.put_u8(self.turns_between_votes);
        enc.put_u8(self.eaten_corners);
        enc.put_u8(self.eat_first_last_columns);
        enc.put_u8(self.starting_decision_count);
        enc.put_u8(self.max_decision_count);
        enc.put_i32(self.silver_revenue_per_region);
        enc.put_bool(self.capital_can_replay);
        enc.put_bool(self.subjugation_enabled);
        enc.put_seq(&self.buildings)?;
        self.voting.encode(enc)?;
        self.factions.encode(enc)
    }
}

impl Decode for Rules {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.get_version("rules", Self::VERSION)?;
        Ok(Self {
            initial_realms_size: dec.get_u8()?,
            additional_realms_count: dec.get_u8()?,
            council_realm_region_size: dec.get_u8()?,
            has_council_realm: dec.get_bool()?,
            starting_gold: dec.get_i32()?,
            initial_safety_margin_between_realms: dec.get_u8()?,
            initial_vote_turns_delay: dec.get_u8()?,
            enhance_admin_gold_price: dec.get_i32()?,
            enhance_admin_gold_price_increase_per_upgrade: dec.get_i32()?,
            favour_gold_price: dec.get_i32()?,
            allow_looting: dec.get_bool()?,
            silver_looted_on_capital: dec.get_i32()?,
            neutral_region_starvation: dec.get_bool()?,
            go_take_neutral_only_when_no_contest: dec.get_bool()?,
            turns_between_votes: dec.get_u8()?,
            eaten_corners: dec.get_u8()?,
            eat_first_last_columns: dec.get_u8()?,
            starting_decision_count: dec.get_u8()?,
            max_decision_count: dec.get_u8()?,
            silver_revenue_per_region: dec.get_i32()?,
            capital_can_replay: dec.get_bool()?,
            subjugation_enabled: dec.get_bool()?,
            buildings: dec.get_seq()?,
            voting: VotingRules::decode(dec)?,
            factions: FactionSettings::decode(dec)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_criterion_has_stock_settings() {
        let rules = Rules::default();
        for criterion in Criterion::ALL {
            assert!(rules.voting_setting(criterion).is_ok(), "{criterion:?}");
        }
    }

    #[test]
    fn test_building_lookup_is_exact() {
        let rules = Rules::default();
        assert_eq!(rules.building(Buildings::FORT).unwrap().silver_cost, 40);
        assert!(matches!(
            rules.building(Buildings::FORT | Buildings::CHURCH),
            Err(RulesError::UnknownBuilding(_))
        ));
    }

    #[test]
    fn test_faction_flags_out_of_range() {
        let rules = Rules::default();
        assert_eq!(rules.faction_flags(1), FactionFlags::CHARGE);
        assert_eq!(rules.faction_flags(200), FactionFlags::NONE);
    }

    #[test]
    fn test_prices() {
        let rules = Rules::default();
        assert_eq!(rules.starting_silver(), 20);
        assert_eq!(rules.favour_silver_price(), 100);
        assert_eq!(rules.administration_upgrade_price(3), 20);
        assert_eq!(rules.administration_upgrade_price(4), 120);
    }

    #[test]
    fn test_schedules_repeat_last_entry() {
        let voting = VotingRules::default();
        assert_eq!(voting.turnout_percentage(0), 33);
        assert_eq!(voting.turnout_percentage(4), 100);
        assert_eq!(voting.turnout_percentage(40), 100);
        assert_eq!(voting.criteria_cap(0), Criterion::COUNT);

        let empty = VotingRules {
            criterias_used_per_vote: Vec::new(),
            turnover_percentage_per_council: Vec::new(),
            ..VotingRules::default()
        };
        assert_eq!(empty.turnout_percentage(0), 100);
        assert_eq!(empty.criteria_cap(3), Criterion::COUNT);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let rules = Rules::from_json_str(r#"{ "turns_between_votes": 2, "voting": { "voter_count": 11 } }"#)
            .unwrap();
        assert_eq!(rules.turns_between_votes, 2);
        assert_eq!(rules.voting.voter_count, 11);
        assert_eq!(rules.voting.criteria.len(), Criterion::ALL.len());
        assert_eq!(rules.starting_gold, 2);
    }

    #[test]
    fn test_json_round_trip() {
        let rules = Rules::default();
        let json = rules.to_json_string().unwrap();
        assert_eq!(Rules::from_json_str(&json).unwrap(), rules);
    }

    #[test]
    fn test_binary_round_trip_and_version() {
        let mut rules = Rules::default();
        rules.subjugation_enabled = false;
        rules.voting.criterias_used_per_vote = vec![2, 3];
        let bytes = rules.to_bytes().unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(Rules::from_bytes(&bytes).unwrap(), rules);

        let mut future = bytes;
        future[0] = 9;
        assert!(matches!(
            Rules::from_bytes(&future),
            Err(CodecError::UnsupportedVersion { found: 9, .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Rules::from_json_str("{ not json"),
            Err(RulesError::Json(_))
        ));
    }
}
