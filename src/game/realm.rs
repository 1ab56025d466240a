//! Realms: the controlling entities that own regions.

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::CodecError;

/// Index of a realm in the world arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RealmId(pub u8);

impl RealmId {
    /// Arena index of this realm.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Encode for RealmId {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_u8(self.0);
        Ok(())
    }
}

impl Decode for RealmId {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self(dec.get_u8()?))
    }
}

/// A realm's treasury, decision budget and political status.
///
/// Treasury reads and writes should go through the world so that a
/// subjugated realm's money is redirected to its subjugator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Realm {
    /// Silver held, in tenths of a gold piece.
    pub silver_treasury: i32,
    /// Decisions the realm may spend each day.
    pub available_decisions: i32,
    /// Whether the realm paid for council favour since the last council.
    pub is_favoured: bool,
    /// Index into the faction table of the rules.
    pub faction_index: u8,
    /// The realm that subjugated this one, if any.
    pub subjugated_by: Option<RealmId>,
    /// Lifetime silver spent.
    pub total_spent: i32,
}

impl Realm {
    /// Whether another realm subjugated this one.
    #[must_use]
    pub const fn is_subjugated(&self) -> bool {
        self.subjugated_by.is_some()
    }
}

impl Encode for Realm {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_i32(self.silver_treasury);
        enc.put_i32(self.available_decisions);
        enc.put_bool(self.is_favoured);
        enc.put_u8(self.faction_index);
        enc.put_bool(self.subjugated_by.is_some());
        enc.put_u8(self.subjugated_by.map_or(0, |r| r.0));
        enc.put_i32(self.total_spent);
        Ok(())
    }
}

impl Decode for Realm {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let silver_treasury = dec.get_i32()?;
        let available_decisions = dec.get_i32()?;
        let is_favoured = dec.get_bool()?;
        let faction_index = dec.get_u8()?;
        let subjugated = dec.get_bool()?;
        let subjugated_by = RealmId(dec.get_u8()?);
        let total_spent = dec.get_i32()?;
        Ok(Self {
            silver_treasury,
            available_decisions,
            is_favoured,
            faction_index,
            subjugated_by: subjugated.then_some(subjugated_by),
            total_spent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_encoding_keeps_every_field() {
        let realm = Realm {
            silver_treasury: -15,
            available_decisions: 4,
            is_favoured: true,
            faction_index: 3,
            subjugated_by: Some(RealmId(2)),
            total_spent: 120,
        };
        let bytes = realm.to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 1 + 1 + 1 + 1 + 4);
        assert_eq!(Realm::from_bytes(&bytes).unwrap(), realm);
    }

    #[test]
    fn test_unsubjugated_ignores_stored_index() {
        let realm = Realm::default();
        assert!(!realm.is_subjugated());
        let bytes = realm.to_bytes().unwrap();
        assert_eq!(Realm::from_bytes(&bytes).unwrap().subjugated_by, None);
    }
}
