//! Per-player view of a session: what a seat can still do today.
//!
//! Every query reads the current state plus the transforms already pending,
//! so the answers account for decisions and silver committed earlier in the
//! day. `plan_*` methods only build transforms; submit them through
//! [`Session::add_transform`].

use crate::error::RulesError;
use crate::game::{
    Action, Buildings, FactionFlags, RealmId, RegionId, Transform, TransformId, World,
};
use crate::session::Session;

/// A realm seen through the session that plays it.
#[derive(Debug, Clone, Copy)]
pub struct Seat<'a> {
    session: &'a Session,
    realm: RealmId,
}

impl<'a> Seat<'a> {
    pub(super) const fn new(session: &'a Session, realm: RealmId) -> Self {
        Self { session, realm }
    }

    fn world(&self) -> &'a World {
        &self.session.state().world
    }

    fn pending(&self) -> impl Iterator<Item = &'a Transform> + 'a {
        self.session.pending().iter()
    }

    /// Realm of this seat.
    #[must_use]
    pub const fn realm(&self) -> RealmId {
        self.realm
    }

    /// Faction flags of this seat's realm.
    #[must_use]
    pub fn faction(&self) -> FactionFlags {
        self.world().realm_faction(self.realm)
    }

    /// Whether `other` acts on behalf of this seat or the other way around.
    ///
    /// True for the realm itself, for its subjects and for its ruler.
    #[must_use]
    pub fn can_control_realm(&self, other: RealmId) -> bool {
        let world = self.world();
        other == self.realm
            || (world.contains_realm(other)
                && world.top_subjugator(other) == world.top_subjugator(self.realm))
    }

    /// Decisions available today, counting a pending administration upgrade.
    #[must_use]
    pub fn max_decisions(&self) -> i32 {
        let base = self.world().realm(self.realm).available_decisions;
        base + i32::from(self.is_administration_upgrade_planned())
    }

    /// Decisions not yet spent on pending transforms.
    #[must_use]
    pub fn remaining_decisions(&self) -> i32 {
        let taken: i32 = self
            .pending()
            .filter(|t| t.owner == self.realm)
            .map(Transform::decision_cost)
            .sum();
        self.max_decisions() - taken
    }

    /// Treasury after the silver pending transforms will spend.
    #[must_use]
    pub fn treasury(&self) -> i32 {
        let spent: i32 = self
            .pending()
            .filter(|t| self.can_control_realm(t.owner))
            .map(Transform::silver_cost)
            .sum();
        self.world().silver_treasury(self.realm) - spent
    }

    /// Whether the treasury covers `silver_price`.
    #[must_use]
    pub fn can_afford(&self, silver_price: i32) -> bool {
        self.treasury() >= silver_price
    }

    /// Whether a pending transform already acts from `region`.
    #[must_use]
    pub fn has_played(&self, region: RegionId) -> bool {
        self.pending().any(|t| t.acting_region() == Some(region))
    }

    /// Whether this seat may act from `region` now.
    #[must_use]
    pub fn can_play_with_region(&self, region: RegionId) -> bool {
        let world = self.world();
        if !world.contains_region(region) {
            return false;
        }
        let target = world.region(region);
        let Some(owner) = target.owner else {
            return false;
        };
        self.can_control_realm(owner)
            && (!self.has_played(region) || target.can_replay(world.rules()))
            && self.remaining_decisions() > 0
    }

    /// Whether `region` is free to build on.
    #[must_use]
    pub fn can_build_on(&self, region: RegionId) -> bool {
        self.can_play_with_region(region) && self.world().region(region).buildings.is_empty()
    }

    /// Whether `building` can be raised on `region` and paid for.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules have no settings for `building`.
    pub fn can_build(&self, region: RegionId, building: Buildings) -> Result<bool, RulesError> {
        if !self.can_build_on(region) {
            return Ok(false);
        }
        let settings = self.world().rules().building(building)?;
        Ok(settings.can_be_built && self.can_afford(i32::from(settings.silver_cost)))
    }

    /// Silver price of the next administration upgrade.
    #[must_use]
    pub fn administration_upgrade_cost(&self) -> i32 {
        let decisions = self.world().realm(self.realm).available_decisions;
        self.world().rules().administration_upgrade_price(decisions)
    }

    /// Whether an administration upgrade is already pending.
    #[must_use]
    pub fn is_administration_upgrade_planned(&self) -> bool {
        self.pending().any(|t| {
            matches!(t.action, Action::ImproveAdministration { realm, .. } if realm == self.realm)
        })
    }

    /// Whether an administration upgrade may be bought.
    ///
    /// Does not need a free decision.
    #[must_use]
    pub fn can_upgrade_administration(&self) -> bool {
        let max = i32::from(self.world().rules().max_decision_count);
        self.can_afford(self.administration_upgrade_cost())
            && !self.is_administration_upgrade_planned()
            && self.world().realm(self.realm).available_decisions < max
    }

    /// Whether the council already favours this realm.
    #[must_use]
    pub fn is_favoured(&self) -> bool {
        self.world().realm(self.realm).is_favoured
    }

    /// Whether favours are already pending.
    #[must_use]
    pub fn are_favours_planned(&self) -> bool {
        self.pending()
            .any(|t| matches!(t.action, Action::PayFavours { realm, .. } if realm == self.realm))
    }

    /// Whether council favour may be bought.
    #[must_use]
    pub fn can_pay_for_favours(&self) -> bool {
        self.remaining_decisions() > 0
            && self.can_afford(self.world().rules().favour_silver_price())
            && !self.is_favoured()
            && !self.are_favours_planned()
    }

    /// Whether an extended attack may still be planned today.
    ///
    /// Charging factions get one per day.
    #[must_use]
    pub fn can_extend_attack(&self) -> bool {
        self.faction().contains(FactionFlags::CHARGE)
            && !self
                .pending()
                .any(|t| t.owner == self.realm && t.is_extended_attack())
    }

    /// Regions an attack from `from` may reach.
    #[must_use]
    pub fn attack_targets(&self, from: RegionId) -> Vec<RegionId> {
        if !self.world().contains_region(from) {
            return Vec::new();
        }
        self.world().attack_targets(from, self.can_extend_attack())
    }

    /// Pending attacks of this realm.
    #[must_use]
    pub fn planned_attacks(&self) -> Vec<Transform> {
        self.pending()
            .filter(|t| t.owner == self.realm && matches!(t.action, Action::RegionAttack { .. }))
            .copied()
            .collect()
    }

    /// Pending attacks by this seat's side on `region`.
    #[must_use]
    pub fn attacks_planned_on(&self, region: RegionId) -> Vec<Transform> {
        self.pending()
            .filter(|t| {
                self.can_control_realm(t.owner)
                    && matches!(t.action, Action::RegionAttack { to, .. } if to == region)
            })
            .copied()
            .collect()
    }

    /// Pending constructions this seat may see.
    ///
    /// Its own, or everybody's when its faction spies on planned constructions.
    #[must_use]
    pub fn planned_constructions(&self) -> Vec<(RegionId, Buildings)> {
        let see_all = self
            .faction()
            .contains(FactionFlags::SEE_ENEMY_PLANNED_CONSTRUCTIONS);
        self.pending()
            .filter(|t| see_all || t.owner == self.realm)
            .filter_map(|t| match t.action {
                Action::RegionBuild {
                    region, building, ..
                } => Some((region, building)),
                _ => None,
            })
            .collect()
    }

    /// An attack from `from` on `to`, extended when `to` is not adjacent.
    #[must_use]
    pub fn plan_attack(&self, id: TransformId, from: RegionId, to: RegionId) -> Transform {
        let extended =
            self.world().contains_region(from) && !self.world().neighbors(from).contains(to);
        Transform::attack(id, self.realm, from, to, extended)
    }

    /// A construction of `building` on `region` at the rules' price.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules have no settings for `building`.
    pub fn plan_construction(
        &self,
        id: TransformId,
        region: RegionId,
        building: Buildings,
    ) -> Result<Transform, RulesError> {
        let cost = self.world().rules().building(building)?.silver_cost;
        Ok(Transform::build(id, self.realm, region, building, i32::from(cost)))
    }

    /// An administration upgrade at the current price.
    #[must_use]
    pub fn plan_administration_upgrade(&self, id: TransformId) -> Transform {
        Transform::improve_administration(id, self.realm, self.administration_upgrade_cost())
    }

    /// Council favour at the rules' price.
    #[must_use]
    pub fn plan_favours(&self, id: TransformId) -> Transform {
        Transform::pay_favours(id, self.realm, self.world().rules().favour_silver_price())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics::NullDiagnostics;
    use crate::game::Rules;
    use crate::session::SeatAssignment;

    fn session_with_factions(first: u8, second: u8) -> Session {
        let party = vec![
            SeatAssignment::new("ada", first),
            SeatAssignment::new("brn", second),
        ];
        Session::new(party, Arc::new(Rules::default()), 7).unwrap()
    }

    fn submit(session: &mut Session, plan: impl FnOnce(&Seat<'_>, TransformId) -> Transform) {
        let id = session.next_transform_id();
        let transform = plan(&session.seat(0).unwrap(), id);
        assert!(session.add_transform(transform, &mut NullDiagnostics).is_accepted());
    }

    fn outer_region(seat: &Seat<'_>) -> RegionId {
        seat.world().territory_of(seat.realm(), false)[1]
    }

    /// A region of the seat with something to attack, and its targets.
    /// With `far`, some target must lie beyond the first ring.
    fn frontier(seat: &Seat<'_>, far: bool) -> (RegionId, Vec<RegionId>) {
        seat.world()
            .territory_of(seat.realm(), false)
            .into_iter()
            .map(|region| (region, seat.attack_targets(region)))
            .find(|(region, targets)| {
                let near = seat.world().neighbors(*region);
                targets.iter().any(|&to| !far || !near.contains(to))
            })
            .unwrap()
    }

    #[test]
    fn test_fresh_seat_affordances() {
        let session = session_with_factions(0, 0);
        let seat = session.seat(0).unwrap();
        assert_eq!(seat.max_decisions(), 3);
        assert_eq!(seat.remaining_decisions(), 3);
        assert_eq!(seat.treasury(), 20);
        assert_eq!(seat.administration_upgrade_cost(), 20);
        assert!(seat.can_upgrade_administration());
        // Favour costs 100 silver.
        assert!(!seat.can_pay_for_favours());
        assert!(!seat.can_extend_attack());

        let region = outer_region(&seat);
        assert!(seat.can_play_with_region(region));
        assert!(seat.can_build_on(region));
        // A fort costs 40 silver.
        assert!(!seat.can_build(region, Buildings::FORT).unwrap());
        assert!(seat.can_build(region, Buildings::CAPITAL).is_ok_and(|ok| !ok));
        assert!(seat.session.seat(5).is_none());
    }

    #[test]
    fn test_pending_transforms_consume_decisions_and_silver() {
        let mut session = session_with_factions(0, 0);
        submit(&mut session, |seat, id| seat.plan_administration_upgrade(id));

        let seat = session.seat(0).unwrap();
        assert!(seat.is_administration_upgrade_planned());
        assert!(!seat.can_upgrade_administration());
        assert_eq!(seat.max_decisions(), 4);
        assert_eq!(seat.remaining_decisions(), 3);
        assert_eq!(seat.treasury(), 0);
        assert!(!seat.can_afford(1));
    }

    #[test]
    fn test_region_plays_once() {
        let mut session = session_with_factions(0, 0);
        let (region, targets) = frontier(&session.seat(0).unwrap(), false);
        let capital = session.state().world.capital_of(session.seats()[0]);
        submit(&mut session, |seat, id| seat.plan_attack(id, region, targets[0]));

        let seat = session.seat(0).unwrap();
        assert!(seat.has_played(region));
        assert_eq!(seat.can_play_with_region(region), capital == Some(region));
        assert_eq!(seat.remaining_decisions(), 2);
        assert_eq!(seat.planned_attacks().len(), 1);
    }

    #[test]
    fn test_cannot_play_for_other_realm() {
        let session = session_with_factions(0, 0);
        let seat = session.seat(0).unwrap();
        let other = session.seat(1).unwrap();
        let theirs = outer_region(&other);
        assert!(!seat.can_control_realm(other.realm()));
        assert!(!seat.can_play_with_region(theirs));
    }

    #[test]
    fn test_subject_is_controlled_by_ruler() {
        let mut session = session_with_factions(0, 0);
        let ruler = session.seats()[0];
        let subject = session.seats()[1];
        session.state.world.realm_mut(subject).subjugated_by = Some(ruler);

        let seat = session.seat(0).unwrap();
        assert!(seat.can_control_realm(subject));
        let subject_region = seat.world().territory_of(subject, false)[1];
        assert!(seat.can_play_with_region(subject_region));
        assert!(session.seat(1).unwrap().can_control_realm(ruler));
    }

    #[test]
    fn test_charge_reaches_second_ring_once() {
        let mut session = session_with_factions(1, 0);
        let seat = session.seat(0).unwrap();
        assert!(seat.can_extend_attack());
        let (from, targets) = frontier(&seat, true);
        let near = seat.world().neighbors(from);
        let far = targets.into_iter().find(|&to| !near.contains(to)).unwrap();

        let attack = seat.plan_attack(TransformId(0), from, far);
        assert!(attack.is_extended_attack());
        assert!(session.add_transform(attack, &mut NullDiagnostics).is_accepted());
        let seat = session.seat(0).unwrap();
        assert!(!seat.can_extend_attack());
        assert_eq!(seat.remaining_decisions(), 3);
        assert_eq!(seat.attacks_planned_on(far).len(), 1);
    }

    #[test]
    fn test_planned_constructions_visibility() {
        let mut session = session_with_factions(7, 0);
        let builder = session.seats()[1];
        session.state.world.add_silver_treasury(builder, 100);

        let other = session.seat(1).unwrap();
        let region = outer_region(&other);
        assert!(other.can_build(region, Buildings::FORT).unwrap());
        let build = other.plan_construction(TransformId(0), region, Buildings::FORT).unwrap();
        assert!(session.add_transform(build, &mut NullDiagnostics).is_accepted());

        let spy = session.seat(0).unwrap();
        assert_eq!(spy.planned_constructions(), vec![(region, Buildings::FORT)]);
        let builder = session.seat(1).unwrap();
        assert_eq!(builder.treasury(), 80);
        assert!(!builder.can_build_on(region));
    }
}
