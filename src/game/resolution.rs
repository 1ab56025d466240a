//! Day resolution: turning a day's transforms into an ordered effect list.
//!
//! Submission order does not matter. Five phases run in a fixed order, and
//! each one reads a scratch world that already carries the effects of the
//! phases before it:
//!
//! 1. prioritized constructions
//! 2. attacks, grouped by target
//! 3. realm border gore, repeated until a pass adds nothing
//! 4. neutral border gore, repeated likewise and never drawing randomness
//! 5. remaining constructions, then purchases
//!
//! Random draws happen in that order too: attack ties first, then realm
//! border gore ties.

use std::mem;

use crate::diagnostics::Diagnostics;
use crate::error::ResolveError;
use crate::game::{
    Action, Buildings, Conquest, Effect, FactionFlags, GameState, Position, PreRolledRng, RealmId,
    RegionId, Transform, World,
};

/// An attack order, with the realm owning its source region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attack {
    owner: RealmId,
    from: RegionId,
    to: RegionId,
    extended: bool,
}

/// A construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Build {
    region: RegionId,
    building: Buildings,
    builder: RealmId,
    silver_cost: i32,
}

/// World copy that effects are applied to as they are produced.
struct Scratch<'a> {
    previous: &'a World,
    world: World,
    applied: usize,
}

impl Scratch<'_> {
    /// Apply every effect not applied yet.
    fn catch_up(&mut self, effects: &[Effect]) {
        for effect in effects.iter().skip(self.applied) {
            effect.apply(self.previous, &mut self.world);
        }
        self.applied = effects.len();
    }
}

impl GameState {
    /// Resolve one day's transforms into the ordered effects that produce
    /// the next state.
    ///
    /// This state is only read. Apply the result with
    /// [`GameState::apply_effects`].
    ///
    /// # Errors
    ///
    /// Returns an error if a transform names a region or realm outside the
    /// world, if the rules lack a building the world uses, or if border gore
    /// bookkeeping goes inconsistent.
    pub fn compute_effects(
        &self,
        rng: &mut PreRolledRng,
        transforms: &[Transform],
        diag: &mut dyn Diagnostics,
    ) -> Result<Vec<Effect>, ResolveError> {
        diag.trace(format_args!(
            "computing {} transforms on day {}",
            transforms.len(),
            self.days_passed
        ));
        for transform in transforms {
            diag.trace(format_args!("  {transform}"));
            validate_transform(&self.world, transform)?;
        }

        let world = &self.world;
        let mut effects = Vec::new();
        let mut scratch = Scratch {
            previous: world,
            world: world.clone(),
            applied: 0,
        };

        let (prioritized, remaining): (Vec<&Transform>, Vec<&Transform>) = transforms
            .iter()
            .partition(|transform| transform.is_prioritized(world));

        let builds = take_constructions(world, &prioritized);
        play_constructions(world, &builds, true, &mut effects);

        scratch.catch_up(&effects);
        let attacks = take_attacks(&scratch.world, &remaining, diag);
        play_attacks(&scratch.world, rng, attacks, &mut effects, diag)?;

        settle(&mut scratch, &mut effects, "realm border gore", diag, |world, wave, out| {
            resolve_realm_gore(world, rng, wave, out)
        })?;

        if world.rules().neutral_region_starvation {
            settle(&mut scratch, &mut effects, "neutral border gore", diag, |world, wave, out| {
                resolve_neutral_gore(world, wave, out);
                Ok(())
            })?;
        }

        scratch.catch_up(&effects);
        let builds = take_constructions(world, &remaining);
        play_constructions(&scratch.world, &builds, false, &mut effects);

        for transform in &remaining {
            match transform.action {
                Action::ImproveAdministration {
                    realm,
                    silver_price,
                } => effects.push(Effect::AdministrationUpgrade {
                    realm,
                    silver_price,
                }),
                Action::PayFavours {
                    realm,
                    silver_price,
                } => effects.push(Effect::FavourPayment {
                    realm,
                    silver_price,
                }),
                Action::RegionAttack { .. } | Action::RegionBuild { .. } => {}
            }
        }

        diag.debug(format_args!(
            "day {} resolved into {} effects",
            self.days_passed,
            effects.len()
        ));
        Ok(effects)
    }
}

/// Check that every handle a transform names exists in `world`.
pub(crate) fn validate_transform(world: &World, transform: &Transform) -> Result<(), ResolveError> {
    check_realm(world, transform.owner)?;
    match transform.action {
        Action::RegionAttack { from, to, .. } => {
            check_region(world, from)?;
            check_region(world, to)
        }
        Action::RegionBuild {
            region, builder, ..
        } => {
            check_region(world, region)?;
            check_realm(world, builder)
        }
        Action::ImproveAdministration { realm, .. } | Action::PayFavours { realm, .. } => {
            check_realm(world, realm)
        }
    }
}

fn check_region(world: &World, region: RegionId) -> Result<(), ResolveError> {
    if world.contains_region(region) {
        Ok(())
    } else {
        Err(ResolveError::RegionOutOfRange(region))
    }
}

fn check_realm(world: &World, realm: RealmId) -> Result<(), ResolveError> {
    if world.contains_realm(realm) {
        Ok(())
    } else {
        Err(ResolveError::RealmOutOfRange(realm))
    }
}

/// Run `pass` until it stops producing effects, applying its output to the
/// scratch world between passes.
fn settle<F>(
    scratch: &mut Scratch<'_>,
    effects: &mut Vec<Effect>,
    label: &str,
    diag: &mut dyn Diagnostics,
    mut pass: F,
) -> Result<(), ResolveError>
where
    F: FnMut(&World, u8, &mut Vec<Effect>) -> Result<(), ResolveError>,
{
    let max_passes = scratch.world.region_count() + 1;
    for index in 0..max_passes {
        scratch.catch_up(effects);
        let before = effects.len();
        let wave = u8::try_from(index).unwrap_or(u8::MAX);
        pass(&scratch.world, wave, effects)?;
        if effects.len() == before {
            return Ok(());
        }
        diag.debug(format_args!(
            "{label} wave {wave}: {} starvations",
            effects.len() - before
        ));
    }
    diag.warn(format_args!(
        "{label} still changing after {max_passes} passes, giving up"
    ));
    Ok(())
}

fn squared_distance_from_origin(world: &World, region: RegionId) -> i32 {
    world.position_of(region).squared_distance(Position::ORIGIN)
}

/// Constructions among `transforms`, nearest to the origin first.
fn take_constructions(world: &World, transforms: &[&Transform]) -> Vec<Build> {
    let mut builds: Vec<Build> = transforms
        .iter()
        .filter_map(|transform| match transform.action {
            Action::RegionBuild {
                region,
                building,
                builder,
                silver_cost,
            } => Some(Build {
                region,
                building,
                builder,
                silver_cost,
            }),
            _ => None,
        })
        .collect();
    builds.sort_by_key(|build| squared_distance_from_origin(world, build.region));
    builds
}

/// Emit a construction for every build whose region `world` shows owned
/// by its builder.
fn play_constructions(world: &World, builds: &[Build], highlight: bool, effects: &mut Vec<Effect>) {
    for build in builds {
        if world.region(build.region).is_owned_by(build.builder) {
            effects.push(Effect::Construction {
                region: build.region,
                building: build.building,
                for_owner: build.builder,
                silver_price: build.silver_cost,
                highlight,
            });
        }
    }
}

/// Attacks among `transforms`, in play order: direct before extended, then
/// least contested target first, then nearest target to the origin.
fn take_attacks(world: &World, transforms: &[&Transform], diag: &mut dyn Diagnostics) -> Vec<Attack> {
    let mut attacks = Vec::new();
    for transform in transforms {
        let Action::RegionAttack { from, to, extended } = transform.action else {
            continue;
        };
        match world.region(from).owner {
            Some(owner) => attacks.push(Attack {
                owner,
                from,
                to,
                extended,
            }),
            None => diag.debug(format_args!("dropping {transform}: source region is unowned")),
        }
    }

    let mut keyed: Vec<((bool, usize, i32), Attack)> = attacks
        .iter()
        .map(|attack| {
            let contest = attacks.iter().filter(|other| other.to == attack.to).count();
            let distance = squared_distance_from_origin(world, attack.to);
            ((attack.extended, contest, distance), *attack)
        })
        .collect();
    keyed.sort_by_key(|&(key, _)| key);
    keyed.into_iter().map(|(_, attack)| attack).collect()
}

fn play_attacks(
    world: &World,
    rng: &mut PreRolledRng,
    mut remaining: Vec<Attack>,
    effects: &mut Vec<Effect>,
    diag: &mut dyn Diagnostics,
) -> Result<(), ResolveError> {
    while let Some(&first) = remaining.first() {
        let group = if first.extended {
            remaining.remove(0);
            vec![first]
        } else {
            let (group, rest) = mem::take(&mut remaining)
                .into_iter()
                .partition(|attack| attack.to == first.to);
            remaining = rest;
            group
        };
        play_attacked_region(world, rng, group, effects, diag)?;
    }
    Ok(())
}

/// Resolve every attack on one region.
///
/// The realm with the most attacking regions plays last so that its
/// conquest lands last. Tied leaders are settled by one draw and play
/// together as a single attack credited to the drawn realm.
#[allow(clippy::too_many_lines)]
fn play_attacked_region(
    world: &World,
    rng: &mut PreRolledRng,
    mut orders: Vec<Attack>,
    effects: &mut Vec<Effect>,
    diag: &mut dyn Diagnostics,
) -> Result<(), ResolveError> {
    let Some(&lead) = orders.first() else {
        return Ok(());
    };

    let mut is_coin_flip = false;
    let mut coin_flip_losers = Vec::new();
    let majority = if orders.len() == 1 {
        lead.owner
    } else {
        let mut counts: Vec<(RealmId, u8)> = Vec::new();
        for order in &orders {
            match counts.iter_mut().find(|(realm, _)| *realm == order.owner) {
                Some((_, count)) => *count = count.saturating_add(1),
                None => counts.push((order.owner, 1)),
            }
        }
        let top = counts.iter().map(|&(_, count)| count).max().unwrap_or(0);
        let contenders: Vec<RealmId> = counts
            .iter()
            .filter(|&&(_, count)| count == top)
            .map(|&(realm, _)| realm)
            .collect();

        let majority = if contenders.len() > 1 {
            let winner = contenders
                .get(rng.next_index(contenders.len()))
                .copied()
                .unwrap_or(lead.owner);
            is_coin_flip = true;
            coin_flip_losers = contenders.iter().copied().filter(|&r| r != winner).collect();
            diag.debug(format_args!(
                "coin flip on region {} between {contenders:?}: realm {} wins",
                lead.to.0, winner.0
            ));
            winner
        } else {
            contenders.first().copied().unwrap_or(lead.owner)
        };

        let weight = |realm: RealmId| {
            if realm == majority {
                u8::MAX
            } else {
                counts
                    .iter()
                    .find(|(other, _)| *other == realm)
                    .map_or(0, |&(_, count)| count)
            }
        };
        orders.sort_by_key(|order| (weight(order.owner), order.owner, order.extended));
        majority
    };

    let in_coin_flip =
        |realm: RealmId| is_coin_flip && (realm == majority || coin_flip_losers.contains(&realm));

    let rules = world.rules();
    let mut cursor = 0;
    while let Some(&head) = orders.get(cursor) {
        let head_flips = in_coin_flip(head.owner);
        let mut attacking_regions = Vec::new();
        while let Some(&next) = orders.get(cursor) {
            if next.owner != head.owner && !(head_flips && in_coin_flip(next.owner)) {
                break;
            }
            attacking_regions.push(next.from);
            cursor += 1;
        }

        let attacker = if head_flips { majority } else { head.owner };
        let target = *world.region(head.to);
        let mut conquest = Conquest {
            region: head.to,
            attacking_realm: attacker,
            attacking_regions,
            previous_owner: target.owner,
            new_owner: target.owner,
            is_coin_flip: head_flips,
            coin_flip_losers: if head_flips {
                coin_flip_losers.clone()
            } else {
                Vec::new()
            },
            silver_looted: 0,
            had_building: !target.buildings.is_empty(),
            highlights: FactionFlags::NONE,
        };

        if head.extended {
            conquest.highlights |= FactionFlags::CHARGE;
        }

        let blocked =
            target.cannot_be_taken(rules) || !world.can_realm_attack_region(attacker, head.to);
        let unbacked_charge = head.extended
            && !effects.iter().any(|effect| {
                matches!(effect, Effect::Conquest(done)
                    if done.success() && done.attacking_regions.contains(&head.from))
            });
        if !blocked
            && !unbacked_charge
            && (!target.is_reinforced_against_attack(rules) || conquest.attacking_regions.len() > 1)
        {
            conquest.new_owner = Some(attacker);
        }

        let faction = world.realm_faction(attacker);
        let success = conquest.success();
        if success
            && target.buildings.contains(Buildings::FORT)
            && faction.contains(FactionFlags::CONQUERED_FORTS_GIVE_PAYOUT)
        {
            conquest.silver_looted = rules.factions.conquered_fort_payout;
            conquest.highlights |= FactionFlags::CONQUERED_FORTS_GIVE_PAYOUT;
        } else if !success && !target.buildings.is_empty() && rules.allow_looting {
            let regions = i32::try_from(conquest.attacking_regions.len()).unwrap_or(i32::MAX);
            conquest.silver_looted = world
                .region_lootable_silver_worth(head.to, attacker)?
                .saturating_mul(regions);
        }

        if success
            && !target.buildings.is_empty()
            && target.buildings != Buildings::CAPITAL
            && faction.contains(FactionFlags::CONQUEST_BUILDING)
        {
            conquest.highlights |= FactionFlags::CONQUEST_BUILDING;
        }
        if conquest.silver_looted > 0 && faction.contains(FactionFlags::LOOT_MORE_MONEY) {
            conquest.highlights |= FactionFlags::LOOT_MORE_MONEY;
        }

        let effect = Effect::Conquest(conquest);
        diag.debug(format_args!("{effect}"));
        effects.push(effect);

        if rules.subjugation_enabled && success && target.buildings == Buildings::CAPITAL {
            if let Some(subject) = target.owner {
                effects.push(Effect::Subjugation {
                    attacker,
                    target: subject,
                });
            }
        }
    }
    Ok(())
}

/// Mark everything connected to `start` as linked; returns how many regions
/// were newly marked.
fn link(world: &World, start: RegionId, linked: &mut [bool]) -> usize {
    let mut added = 0;
    for region in world.connected_regions(start) {
        if let Some(slot) = linked.get_mut(region.index()) {
            if !*slot {
                *slot = true;
                added += 1;
            }
        }
    }
    added
}

/// One pass of realm border gore: every owned region cut off from its
/// realm's anchors is reassigned by neighbour majority.
fn resolve_realm_gore(
    world: &World,
    rng: &mut PreRolledRng,
    wave: u8,
    effects: &mut Vec<Effect>,
) -> Result<(), ResolveError> {
    let mut found = Vec::new();
    for realm in world.realm_ids() {
        let Some(capital) = world.capital_of(realm) else {
            continue;
        };
        let owned: Vec<RegionId> = world
            .region_ids()
            .filter(|&region| world.region(region).is_owned_by(realm))
            .collect();

        let mut linked = vec![false; world.region_count()];
        let mut connected = link(world, capital, &mut linked);
        if world
            .realm_faction(realm)
            .contains(FactionFlags::FORTS_COUNT_AS_CAPITAL)
        {
            while let Some(fort) = owned.iter().copied().find(|&region| {
                !linked[region.index()] && world.region(region).buildings.contains(Buildings::FORT)
            }) {
                connected += link(world, fort, &mut linked);
            }
        }

        if connected > owned.len() {
            return Err(ResolveError::BorderGoreOverflow {
                realm,
                connected,
                owned: owned.len(),
            });
        }

        for &region in &owned {
            if linked[region.index()] || world.region(region).buildings.contains(Buildings::CAPITAL)
            {
                continue;
            }
            solve_region(world, Some(&mut *rng), region, wave, &mut found);
        }
    }

    // Coin flips land last.
    let (settled, flipped): (Vec<Effect>, Vec<Effect>) =
        found.into_iter().partition(|effect| !effect.is_coin_flip());
    effects.extend(settled);
    effects.extend(flipped);
    Ok(())
}

/// One pass of neutral border gore: unowned groups fully enclosed by realm
/// territory are absorbed cell by cell. Ties stay unowned for this pass.
fn resolve_neutral_gore(world: &World, wave: u8, effects: &mut Vec<Effect>) {
    let no_contest = world.rules().go_take_neutral_only_when_no_contest;
    let mut seen = vec![false; world.region_count()];
    let mut enclosed = Vec::new();

    for start in world.region_ids() {
        let region = world.region(start);
        if seen[start.index()] || region.is_owned() || region.inert {
            continue;
        }
        let group = world.connected_regions(start);
        for member in &group {
            seen[member.index()] = true;
        }
        if is_enclosed(world, &group, no_contest) {
            enclosed.extend(group);
        }
    }

    for region in enclosed {
        solve_region(world, None, region, wave, effects);
    }
}

/// Whether an unowned group touches neither the map edge nor inert cells
/// nor the council, and, with `no_contest`, borders a single realm.
fn is_enclosed(world: &World, group: &[RegionId], no_contest: bool) -> bool {
    let mut surrounding: Option<RealmId> = None;
    for &member in group {
        let neighbors = world.neighbors(member);
        if neighbors.len() < 6 {
            return false;
        }
        for neighbor in neighbors.iter() {
            if world.is_council_region(neighbor) {
                return false;
            }
            let Some(owner) = world.region(neighbor).owner else {
                continue;
            };
            if no_contest {
                match surrounding {
                    Some(realm) if realm != owner => return false,
                    Some(_) => {}
                    None => surrounding = Some(owner),
                }
            }
        }
    }
    true
}

fn solve_region(
    world: &World,
    rng: Option<&mut PreRolledRng>,
    region: RegionId,
    wave: u8,
    effects: &mut Vec<Effect>,
) {
    let current = world.region(region);
    match world.natural_owner(region, rng) {
        Some(natural) => {
            if !current.is_owned_by(natural.realm) {
                effects.push(Effect::Starvation {
                    region,
                    new_owner: Some(natural.realm),
                    wave,
                    was_coin_flip: natural.was_coin_flip,
                });
            }
        }
        None => {
            if current.is_owned() {
                effects.push(Effect::Starvation {
                    region,
                    new_owner: None,
                    wave,
                    was_coin_flip: false,
                });
            }
        }
    }
}
