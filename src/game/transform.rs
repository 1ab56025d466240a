//! Transforms: the intents a realm submits during a day.
//!
//! A transform only says what a realm wants. Nothing in the world changes
//! until resolution turns the day's transforms into effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::CodecError;
use crate::game::{Buildings, FactionFlags, RealmId, RegionId, World};

/// Stable identifier of a submitted transform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransformId(pub u32);

/// Wire tag of a transform variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransformKind {
    /// Attack a region from an owned region.
    RegionAttack = 1,
    /// Build on an owned region.
    RegionBuild = 2,
    /// Buy one more daily decision.
    ImproveAdministration = 3,
    /// Buy council favour.
    PayFavours = 4,
}

/// What a transform asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Attack `to` from `from`.
    RegionAttack {
        /// Region the attack is launched from.
        from: RegionId,
        /// Region under attack.
        to: RegionId,
        /// Second-ring attack of a charging faction.
        #[serde(default)]
        extended: bool,
    },
    /// Raise `building` on `region` on behalf of `builder`.
    RegionBuild {
        /// Region to build on.
        region: RegionId,
        /// Building to raise.
        building: Buildings,
        /// Realm expected to own the region.
        builder: RealmId,
        /// Price charged when the construction lands.
        silver_cost: i32,
    },
    /// Add a daily decision to `realm`.
    ImproveAdministration {
        /// Realm receiving the upgrade.
        realm: RealmId,
        /// Price paid.
        silver_price: i32,
    },
    /// Mark `realm` as favoured by the council.
    PayFavours {
        /// Realm receiving the favour.
        realm: RealmId,
        /// Price paid.
        silver_price: i32,
    },
}

/// A submitted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    /// Identifier unique within a session.
    pub id: TransformId,
    /// Realm that submitted the transform.
    pub owner: RealmId,
    /// The intent itself.
    #[serde(flatten)]
    pub action: Action,
}

impl Transform {
    /// An attack from `from` on `to`.
    #[must_use]
    pub const fn attack(
        id: TransformId,
        owner: RealmId,
        from: RegionId,
        to: RegionId,
        extended: bool,
    ) -> Self {
        Self {
            id,
            owner,
            action: Action::RegionAttack { from, to, extended },
        }
    }

    /// A construction by `owner` on its own region.
    #[must_use]
    pub const fn build(
        id: TransformId,
        owner: RealmId,
        region: RegionId,
        building: Buildings,
        silver_cost: i32,
    ) -> Self {
        Self {
            id,
            owner,
            action: Action::RegionBuild {
                region,
                building,
                builder: owner,
                silver_cost,
            },
        }
    }

    /// An administration upgrade bought by `owner` for itself.
    #[must_use]
    pub const fn improve_administration(id: TransformId, owner: RealmId, silver_price: i32) -> Self {
        Self {
            id,
            owner,
            action: Action::ImproveAdministration {
                realm: owner,
                silver_price,
            },
        }
    }

    /// Council favour bought by `owner` for itself.
    #[must_use]
    pub const fn pay_favours(id: TransformId, owner: RealmId, silver_price: i32) -> Self {
        Self {
            id,
            owner,
            action: Action::PayFavours {
                realm: owner,
                silver_price,
            },
        }
    }

    /// Wire tag of the variant.
    #[must_use]
    pub const fn kind(&self) -> TransformKind {
        match self.action {
            Action::RegionAttack { .. } => TransformKind::RegionAttack,
            Action::RegionBuild { .. } => TransformKind::RegionBuild,
            Action::ImproveAdministration { .. } => TransformKind::ImproveAdministration,
            Action::PayFavours { .. } => TransformKind::PayFavours,
        }
    }

    /// Decisions this transform consumes. Extended attacks are free.
    #[must_use]
    pub const fn decision_cost(&self) -> i32 {
        match self.action {
            Action::RegionAttack { extended: true, .. } => 0,
            _ => 1,
        }
    }

    /// Silver this transform will cost.
    #[must_use]
    pub const fn silver_cost(&self) -> i32 {
        match self.action {
            Action::RegionAttack { .. } => 0,
            Action::RegionBuild { silver_cost, .. } => silver_cost,
            Action::ImproveAdministration { silver_price, .. }
            | Action::PayFavours { silver_price, .. } => silver_price,
        }
    }

    /// Region the transform acts from or on, for region-related variants.
    #[must_use]
    pub const fn acting_region(&self) -> Option<RegionId> {
        match self.action {
            Action::RegionAttack { from, .. } => Some(from),
            Action::RegionBuild { region, .. } => Some(region),
            Action::ImproveAdministration { .. } | Action::PayFavours { .. } => None,
        }
    }

    /// Whether this is an extended attack.
    #[must_use]
    pub const fn is_extended_attack(&self) -> bool {
        matches!(self.action, Action::RegionAttack { extended: true, .. })
    }

    /// Whether this transform may join the `pending` ones.
    ///
    /// A construction refuses any pending transform acting from the same
    /// region; every other variant is always compatible.
    #[must_use]
    pub fn compatible_with(&self, pending: &[Self]) -> bool {
        match self.action {
            Action::RegionBuild { region, .. } => pending
                .iter()
                .all(|other| other.acting_region() != Some(region)),
            _ => true,
        }
    }

    /// Whether a construction resolves before attacks.
    ///
    /// Forts raised by a faction whose only trait is that forts anchor
    /// territory go first. Factions combining it with other flags queue
    /// with the remaining constructions.
    #[must_use]
    pub fn is_prioritized(&self, world: &World) -> bool {
        match self.action {
            Action::RegionBuild {
                region, building, ..
            } => {
                building == Buildings::FORT
                    && world.contains_region(region)
                    && world.region_faction(region) == FactionFlags::FORTS_COUNT_AS_CAPITAL
            }
            _ => false,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} by realm {}: ", self.id.0, self.owner.0)?;
        match self.action {
            Action::RegionAttack { from, to, extended } => {
                let reach = if extended { "extended attack" } else { "attack" };
                write!(f, "{reach} {} => {}", from.0, to.0)
            }
            Action::RegionBuild {
                region,
                building,
                builder,
                silver_cost,
            } => write!(
                f,
                "build {building:?} on {} for realm {} ({silver_cost} silver)",
                region.0, builder.0
            ),
            Action::ImproveAdministration {
                realm,
                silver_price,
            } => write!(f, "improve administration of realm {} ({silver_price} silver)", realm.0),
            Action::PayFavours {
                realm,
                silver_price,
            } => write!(f, "pay favours for realm {} ({silver_price} silver)", realm.0),
        }
    }
}

impl Encode for Transform {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u32(self.id.0);
        self.owner.encode(enc)?;
        enc.put_u8(self.kind() as u8);
        match self.action {
            Action::RegionAttack { from, to, extended } => {
                from.encode(enc)?;
                to.encode(enc)?;
                enc.put_bool(extended);
            }
            Action::RegionBuild {
                region,
                building,
                builder,
                silver_cost,
            } => {
                region.encode(enc)?;
                enc.put_u8(building.0);
                builder.encode(enc)?;
                enc.put_i32(silver_cost);
            }
            Action::ImproveAdministration {
                realm,
                silver_price,
            }
            | Action::PayFavours {
                realm,
                silver_price,
            } => {
                realm.encode(enc)?;
                enc.put_i32(silver_price);
            }
        }
        Ok(())
    }
}

impl Decode for Transform {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let id = TransformId(dec.get_u32()?);
        let owner = RealmId::decode(dec)?;
        let action = match dec.get_u8()? {
            1 => Action::RegionAttack {
                from: RegionId::decode(dec)?,
                to: RegionId::decode(dec)?,
                extended: dec.get_bool()?,
            },
            2 => Action::RegionBuild {
                region: RegionId::decode(dec)?,
                building: Buildings(dec.get_u8()?),
                builder: RealmId::decode(dec)?,
                silver_cost: dec.get_i32()?,
            },
            3 => Action::ImproveAdministration {
                realm: RealmId::decode(dec)?,
                silver_price: dec.get_i32()?,
            },
            4 => Action::PayFavours {
                realm: RealmId::decode(dec)?,
                silver_price: dec.get_i32()?,
            },
            tag => {
                return Err(CodecError::InvalidTag {
                    record: "transform",
                    tag,
                });
            }
        };
        Ok(Self { id, owner, action })
    }
}
