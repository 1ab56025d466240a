//! Council voting.
//!
//! Every council recomputes the vote from scratch: each active criterion
//! names its winning realms, winners collect the criterion's influence
//! weight, and weights turn into a share of the council's voters. A realm
//! holding a strict majority of all votes (wasted ones included) ends the
//! game.
//!
//! Council and subjugated realms never vote and never score.

use std::collections::{BTreeMap, BTreeSet};

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, RulesError};
use crate::game::{Buildings, Criterion, PreRolledRng, RealmId, World};

/// Outcome of one realm at a council.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoteScore {
    /// Realm scored.
    pub realm: RealmId,
    /// Votes obtained.
    pub total_votes: i32,
    /// Criteria the realm won.
    pub won: BTreeSet<Criterion>,
}

impl VoteScore {
    /// Whether the realm was favoured at this council.
    #[must_use]
    pub fn was_favoured(&self) -> bool {
        self.won.contains(&Criterion::Favoured)
    }
}

impl Encode for VoteScore {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        self.realm.encode(enc)?;
        enc.put_i32(self.total_votes);
        let won: Vec<Criterion> = self.won.iter().copied().collect();
        enc.put_seq(&won)
    }
}

impl Decode for VoteScore {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let realm = RealmId::decode(dec)?;
        let total_votes = dec.get_i32()?;
        let won = dec.get_seq::<Criterion>()?.into_iter().collect();
        Ok(Self {
            realm,
            total_votes,
            won,
        })
    }
}

/// Ranked outcome of a council.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VotingResult {
    /// One entry per realm, most votes first; ties keep realm order.
    pub scores: Vec<VoteScore>,
    /// Voters whose vote went to nobody.
    pub wasted_votes: i32,
}

impl VotingResult {
    /// Score entry of `realm`.
    #[must_use]
    pub fn score_of(&self, realm: RealmId) -> Option<&VoteScore> {
        self.scores.iter().find(|score| score.realm == realm)
    }

    /// Wasted plus expressed votes.
    #[must_use]
    pub fn total_votes(&self) -> i32 {
        self.wasted_votes + self.scores.iter().map(|s| s.total_votes).sum::<i32>()
    }

    /// The realm holding strictly more than half of all votes.
    #[must_use]
    pub fn majority_winner(&self) -> Option<RealmId> {
        let half = self.total_votes() / 2;
        self.scores
            .iter()
            .find(|score| score.total_votes > half)
            .map(|score| score.realm)
    }

    /// Whether some realm won the game at this council.
    #[must_use]
    pub fn has_majority_winner(&self) -> bool {
        self.majority_winner().is_some()
    }

    /// Realm ranked second, if there are at least two entries.
    #[must_use]
    pub fn second_place(&self) -> Option<RealmId> {
        self.scores.get(1).map(|score| score.realm)
    }
}

impl Encode for VotingResult {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        enc.put_seq(&self.scores)?;
        enc.put_i32(self.wasted_votes);
        Ok(())
    }
}

impl Decode for VotingResult {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            scores: dec.get_seq()?,
            wasted_votes: dec.get_i32()?,
        })
    }
}

/// Council voting state: the result of the latest council.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Voting {
    result: VotingResult,
}

impl Voting {
    /// Result of the latest council; empty before the first one.
    #[must_use]
    pub const fn result(&self) -> &VotingResult {
        &self.result
    }

    /// Run a council on `world`, replacing the previous result.
    ///
    /// `councils_passed` is the index of this council. Draws come from
    /// `rng` in a fixed order: the accident winner first, then criteria
    /// pruning.
    ///
    /// # Errors
    ///
    /// Returns an error if a criterion has no voting settings.
    pub fn compute(
        &mut self,
        world: &World,
        councils_passed: u32,
        rng: &mut PreRolledRng,
        diag: &mut dyn Diagnostics,
    ) -> Result<&VotingResult, RulesError> {
        let rules = world.rules();
        diag.info(format_args!(
            "computing votes after {councils_passed} councils"
        ));

        let picked = pick_criteria(world, councils_passed)?;
        diag.info(format_args!("criteria picked: {picked:?}"));

        let mut winners: BTreeMap<Criterion, BTreeSet<RealmId>> = BTreeMap::new();
        for criterion in Criterion::ALL {
            if !picked.contains(&criterion) {
                continue;
            }
            // Favour is paid for, not won; it is weighed separately.
            if criterion == Criterion::Favoured {
                winners.insert(criterion, BTreeSet::new());
                continue;
            }
            let won = category_winners(criterion, world, rng);
            if !won.is_empty() {
                diag.info(format_args!("{criterion:?} won by {won:?}"));
            }
            winners.insert(criterion, won);
        }

        disqualify_lucky_winners(&mut winners, diag);
        limit_criteria(world, councils_passed, rng, &mut winners, diag)?;

        let mut scores: Vec<VoteScore> = world
            .realm_ids()
            .map(|realm| VoteScore {
                realm,
                ..VoteScore::default()
            })
            .collect();
        let mut weights = vec![0i32; world.realm_count()];

        // Paid favour always counts, whichever criteria survived.
        let favour_weight = i32::from(rules.voting_setting(Criterion::Favoured)?.influence_weight);
        for realm in world.realm_ids() {
            if world.realm(realm).is_favoured && !world.is_excluded_from_voting(realm) {
                weights[realm.index()] += favour_weight;
                scores[realm.index()].won.insert(Criterion::Favoured);
            }
        }

        for (&criterion, realms) in &winners {
            if realms.is_empty() {
                continue;
            }
            let weight = i32::from(rules.voting_setting(criterion)?.influence_weight);
            for realm in realms {
                weights[realm.index()] += weight;
                scores[realm.index()].won.insert(criterion);
            }
        }

        let total_weight: i32 = weights.iter().sum();
        let turnout = rules.voting.turnout_percentage(councils_passed);
        let voice_points = turnout * rules.voting.voter_count;
        diag.info(format_args!(
            "total weight {total_weight}, turnout {turnout}%, {voice_points} voice points"
        ));

        let mut expressed = 0;
        for (score, &weight) in scores.iter_mut().zip(&weights) {
            if weight == 0 {
                continue;
            }
            let share = weight * 100 / total_weight;
            let voices = share * voice_points / 100;
            score.total_votes = voices / 100;
            expressed += score.total_votes;
            diag.debug(format_args!(
                "realm {} weighs {weight} ({share}%): {} votes",
                score.realm.0, score.total_votes
            ));
        }

        scores.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
        self.result = VotingResult {
            scores,
            wasted_votes: rules.voting.voter_count - expressed,
        };
        diag.info(format_args!(
            "{expressed} votes expressed, {} wasted",
            self.result.wasted_votes
        ));
        Ok(&self.result)
    }
}

impl Encode for Voting {
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError> {
        self.result.encode(enc)
    }
}

impl Decode for Voting {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            result: VotingResult::decode(dec)?,
        })
    }
}

/// Enabled criteria whose activation threshold has passed.
///
/// Favour is only contested while some free realm holds it, and churches
/// only once one stands somewhere.
fn pick_criteria(world: &World, councils_passed: u32) -> Result<BTreeSet<Criterion>, RulesError> {
    let mut picked = BTreeSet::new();
    for criterion in Criterion::ALL {
        let setting = world.rules().voting_setting(criterion)?;
        if !setting.enabled || u32::from(setting.active_after_councils) > councils_passed {
            continue;
        }
        let contested = match criterion {
            Criterion::Favoured => world.realm_ids().any(|realm| {
                let realm = world.realm(realm);
                realm.is_favoured && !realm.is_subjugated()
            }),
            Criterion::MaxChurches => world
                .region_ids()
                .any(|region| world.region(region).buildings.contains(Buildings::CHURCH)),
            _ => true,
        };
        if contested {
            picked.insert(criterion);
        }
    }
    Ok(picked)
}

/// An accident cannot go to a realm that already won something else.
fn disqualify_lucky_winners(
    winners: &mut BTreeMap<Criterion, BTreeSet<RealmId>>,
    diag: &mut dyn Diagnostics,
) {
    let Some(lucky) = winners.get(&Criterion::Accident).cloned() else {
        return;
    };
    for realm in lucky {
        let won_elsewhere = winners
            .iter()
            .any(|(&criterion, realms)| criterion != Criterion::Accident && realms.contains(&realm));
        if won_elsewhere {
            if let Some(accident) = winners.get_mut(&Criterion::Accident) {
                accident.remove(&realm);
            }
            diag.info(format_args!(
                "realm {} cannot win the accident, it already won another criterion",
                realm.0
            ));
        }
    }
}

/// Keep at most the council's criteria cap, chosen by weighted draws.
///
/// Only criteria that have winners compete; dropped criteria lose them.
fn limit_criteria(
    world: &World,
    councils_passed: u32,
    rng: &mut PreRolledRng,
    winners: &mut BTreeMap<Criterion, BTreeSet<RealmId>>,
    diag: &mut dyn Diagnostics,
) -> Result<(), RulesError> {
    let rules = world.rules();
    let active: Vec<Criterion> = winners
        .iter()
        .filter(|(_, realms)| !realms.is_empty())
        .map(|(&criterion, _)| criterion)
        .collect();
    let cap = rules.voting.criteria_cap(councils_passed);
    if active.len() <= cap {
        return Ok(());
    }

    diag.info(format_args!(
        "{} criteria have winners, keeping {cap}",
        active.len()
    ));
    let mut kept: Vec<Criterion> = Vec::with_capacity(cap);
    while kept.len() < cap {
        let remaining: Vec<(Criterion, u32)> = active
            .iter()
            .filter(|criterion| !kept.contains(criterion))
            .map(|&criterion| {
                rules
                    .voting_setting(criterion)
                    .map(|s| (criterion, u32::from(s.chances_to_be_selected)))
            })
            .collect::<Result<_, _>>()?;
        let total: u32 = remaining.iter().map(|&(_, chances)| chances).sum();
        let roll = rng.next_below(total);

        let mut cumulative = 0;
        let mut choice = remaining.first().map(|&(criterion, _)| criterion);
        for &(criterion, chances) in &remaining {
            if cumulative + chances > roll {
                choice = Some(criterion);
                break;
            }
            cumulative += chances;
        }
        match choice {
            Some(criterion) => kept.push(criterion),
            None => break,
        }
    }

    for (criterion, realms) in winners.iter_mut() {
        if !kept.contains(criterion) && !realms.is_empty() {
            diag.info(format_args!("winners of {criterion:?} disqualified"));
            realms.clear();
        }
    }
    Ok(())
}

fn category_winners(
    criterion: Criterion,
    world: &World,
    rng: &mut PreRolledRng,
) -> BTreeSet<RealmId> {
    let count_territory = |realm: RealmId, keep: fn(Buildings) -> bool| {
        let held = world
            .territory_of(realm, true)
            .into_iter()
            .filter(|&id| keep(world.region(id).buildings))
            .count();
        i32::try_from(held).unwrap_or(i32::MAX)
    };

    match criterion {
        Criterion::MaxDevelopment => most_of(
            world,
            |realm| count_territory(realm, |b| !b.is_empty()),
            Contest {
                min_score: 3,
                stretch_percent: 10,
                max_winners: 2,
            },
        ),
        Criterion::MaxChurches => most_of(
            world,
            |realm| count_territory(realm, |b| b == Buildings::CHURCH),
            Contest {
                min_score: 2,
                max_winners: 2,
                ..Contest::default()
            },
        ),
        Criterion::MaxLands => most_of(
            world,
            |realm| count_territory(realm, |_| true),
            Contest {
                stretch_percent: 20,
                max_winners: 2,
                ..Contest::default()
            },
        ),
        Criterion::MaxMoney => most_of(
            world,
            |realm| world.silver_treasury(realm),
            Contest {
                min_score: 100,
                stretch_percent: 10,
                max_winners: 2,
            },
        ),
        Criterion::Martyrdom => most_of(
            world,
            |realm| (6 - count_territory(realm, |_| true)).max(0),
            Contest {
                min_score: 3,
                stretch_percent: 15,
                ..Contest::default()
            },
        ),
        Criterion::Accident => {
            let index = rng.next_index(world.realm_count());
            let realm = RealmId(u8::try_from(index).unwrap_or(u8::MAX));
            let mut winners = BTreeSet::new();
            if world.contains_realm(realm) && !world.is_excluded_from_voting(realm) {
                winners.insert(realm);
            }
            winners
        }
        Criterion::BestAdministration => {
            let min_score = i32::from(world.rules().starting_decision_count) + 1;
            unique_most_of(world, |realm| world.realm(realm).available_decisions, min_score)
                .into_iter()
                .collect()
        }
        Criterion::CouncilNeighbor => unique_most_of(
            world,
            |realm| {
                let borders: usize = world
                    .territory_of(realm, true)
                    .into_iter()
                    .map(|id| {
                        world
                            .neighbors(id)
                            .iter()
                            .filter(|&n| world.is_council_region(n))
                            .count()
                    })
                    .sum();
                i32::try_from(borders).unwrap_or(i32::MAX)
            },
            2,
        )
        .into_iter()
        .collect(),
        Criterion::Favoured => BTreeSet::new(),
    }
}

/// Thresholds of a shared-win criterion.
#[derive(Debug, Clone, Copy)]
struct Contest {
    min_score: i32,
    stretch_percent: i32,
    max_winners: usize,
}

impl Default for Contest {
    fn default() -> Self {
        Self {
            min_score: 0,
            stretch_percent: 0,
            max_winners: usize::MAX,
        }
    }
}

/// Every voting realm within the stretch of the best score.
///
/// Nobody wins if the best score is under the minimum or if more realms
/// qualify than the contest allows.
fn most_of(
    world: &World,
    score: impl Fn(RealmId) -> i32,
    contest: Contest,
) -> BTreeSet<RealmId> {
    let scores: Vec<(RealmId, i32)> = world
        .realm_ids()
        .filter(|&realm| !world.is_excluded_from_voting(realm))
        .map(|realm| (realm, score(realm)))
        .collect();
    let best = scores.iter().map(|&(_, s)| s).fold(0, i32::max);
    if best < contest.min_score {
        return BTreeSet::new();
    }

    let stretch = best * contest.stretch_percent / 100;
    let winners: BTreeSet<RealmId> = scores
        .into_iter()
        .filter(|&(_, s)| s >= best - stretch)
        .map(|(realm, _)| realm)
        .collect();
    if winners.len() > contest.max_winners {
        BTreeSet::new()
    } else {
        winners
    }
}

/// The single voting realm with the best score; a tie has no winner.
fn unique_most_of(world: &World, score: impl Fn(RealmId) -> i32, min_score: i32) -> Option<RealmId> {
    let scores: Vec<(RealmId, i32)> = world
        .realm_ids()
        .filter(|&realm| !world.is_excluded_from_voting(realm))
        .map(|realm| (realm, score(realm)))
        .collect();
    let best = scores.iter().map(|&(_, s)| s).fold(0, i32::max);
    if best < min_score {
        return None;
    }

    let mut leaders = scores.iter().filter(|&&(_, s)| s == best);
    match (leaders.next(), leaders.next()) {
        (Some(&(realm, _)), None) => Some(realm),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics::NullDiagnostics;
    use crate::game::{RegionId, Rules};

    /// Rules with only the listed criteria enabled and full turnout.
    fn rules_with(criteria: &[Criterion]) -> Rules {
        let mut rules = Rules::default();
        rules.voting.turnover_percentage_per_council = vec![100];
        for setting in &mut rules.voting.criteria {
            setting.enabled = criteria.contains(&setting.criterion);
        }
        rules
    }

    /// Three realms on a 6x6 grid: realm 0 holds six regions, the others two.
    fn world(rules: Rules) -> World {
        let mut world = World::blank(Arc::new(rules), 6, 2, 3);
        let holdings: [(u8, &[u16]); 3] = [
            (0, &[0, 1, 2, 3, 4, 5]),
            (1, &[24, 25]),
            (2, &[34, 35]),
        ];
        for (realm, ids) in holdings {
            for &id in ids {
                world.region_mut(RegionId(id)).owner = Some(RealmId(realm));
            }
            world.region_mut(RegionId(ids[0])).buildings = Buildings::CAPITAL;
        }
        world.realm_mut(RealmId(0)).silver_treasury = 500;
        world.realm_mut(RealmId(1)).silver_treasury = 10;
        world.realm_mut(RealmId(2)).silver_treasury = 10;
        world
    }

    fn run(world: &World, councils: u32, seed: u64) -> VotingResult {
        let mut voting = Voting::default();
        let mut rng = PreRolledRng::new(seed);
        voting
            .compute(world, councils, &mut rng, &mut NullDiagnostics)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_majority_threshold() {
        let score = |realm, total_votes| VoteScore {
            realm: RealmId(realm),
            total_votes,
            won: BTreeSet::new(),
        };
        let winning = VotingResult {
            scores: vec![score(0, 17), score(1, 0)],
            wasted_votes: 16,
        };
        assert_eq!(winning.majority_winner(), Some(RealmId(0)));

        let split = VotingResult {
            scores: vec![score(0, 5), score(1, 5)],
            wasted_votes: 0,
        };
        assert!(!split.has_majority_winner());
        assert!(!VotingResult::default().has_majority_winner());
    }

    #[test]
    fn test_single_realm_sweeping_every_criterion_wins() {
        let world = world(rules_with(&[Criterion::MaxLands, Criterion::MaxMoney]));
        let result = run(&world, 0, 1);

        let first = &result.scores[0];
        assert_eq!(first.realm, RealmId(0));
        assert_eq!(first.total_votes, 33);
        assert_eq!(
            first.won,
            BTreeSet::from([Criterion::MaxMoney, Criterion::MaxLands])
        );
        assert_eq!(result.wasted_votes, 0);
        assert_eq!(result.majority_winner(), Some(RealmId(0)));
    }

    #[test]
    fn test_low_turnout_wastes_votes() {
        let mut rules = rules_with(&[Criterion::MaxLands]);
        rules.voting.turnover_percentage_per_council = vec![33, 100];
        let world = world(rules);

        let first = run(&world, 0, 1);
        assert_eq!(first.scores[0].total_votes, 10);
        assert_eq!(first.wasted_votes, 23);
        assert!(!first.has_majority_winner());

        let later = run(&world, 5, 1);
        assert_eq!(later.scores[0].total_votes, 33);
    }

    #[test]
    fn test_too_many_tied_winners_void_the_criterion() {
        let mut world = world(rules_with(&[Criterion::MaxLands]));
        for id in [26, 27, 28, 29] {
            world.region_mut(RegionId(id)).owner = Some(RealmId(1));
        }
        for id in [30, 31, 32, 33] {
            world.region_mut(RegionId(id)).owner = Some(RealmId(2));
        }
        // Every realm now holds one full row of six regions.
        let result = run(&world, 0, 1);
        assert!(result.scores.iter().all(|s| s.total_votes == 0));
        assert_eq!(result.wasted_votes, 33);
    }

    #[test]
    fn test_excluded_realms_never_score() {
        let mut world = world(rules_with(&[Criterion::MaxLands, Criterion::MaxMoney]));
        world.set_council_realm(Some(RealmId(0)));
        let result = run(&world, 0, 1);
        assert_eq!(result.score_of(RealmId(0)).unwrap().total_votes, 0);
        assert!(result.score_of(RealmId(0)).unwrap().won.is_empty());
    }

    #[test]
    fn test_favoured_realm_collects_weight() {
        let mut world = world(rules_with(&[Criterion::Favoured]));
        world.realm_mut(RealmId(2)).is_favoured = true;
        let result = run(&world, 0, 1);
        let favoured = result.score_of(RealmId(2)).unwrap();
        assert!(favoured.was_favoured());
        assert_eq!(favoured.total_votes, 33);
        assert_eq!(result.scores[0].realm, RealmId(2));
    }

    #[test]
    fn test_favour_counts_even_when_not_contested() {
        let mut world = world(rules_with(&[Criterion::MaxLands]));
        world.realm_mut(RealmId(2)).is_favoured = true;
        let result = run(&world, 0, 1);

        let favoured = result.score_of(RealmId(2)).unwrap();
        assert!(favoured.was_favoured());
        assert_eq!(favoured.total_votes, 10);
        assert_eq!(result.score_of(RealmId(0)).unwrap().total_votes, 21);
        assert_eq!(result.wasted_votes, 2);
    }

    #[test]
    fn test_uncontested_favour_and_churches_are_not_picked() {
        let all = [
            Criterion::MaxLands,
            Criterion::MaxMoney,
            Criterion::Favoured,
            Criterion::MaxChurches,
        ];
        let mut rules = rules_with(&all);
        rules.voting.criterias_used_per_vote = vec![2];
        let mut world = world(rules);

        let picked = pick_criteria(&world, 0).unwrap();
        assert_eq!(
            picked,
            BTreeSet::from([Criterion::MaxMoney, Criterion::MaxLands])
        );

        // Both criteria with winners fit under the cap and survive.
        let result = run(&world, 0, 1);
        assert_eq!(
            result.scores[0].won,
            BTreeSet::from([Criterion::MaxMoney, Criterion::MaxLands])
        );
        assert_eq!(result.scores[0].total_votes, 33);

        world.realm_mut(RealmId(1)).is_favoured = true;
        world.region_mut(RegionId(25)).buildings = Buildings::CHURCH;
        assert_eq!(pick_criteria(&world, 0).unwrap(), BTreeSet::from(all));

        // A subject's favour is not contested.
        world.realm_mut(RealmId(1)).subjugated_by = Some(RealmId(0));
        assert!(!pick_criteria(&world, 0).unwrap().contains(&Criterion::Favoured));
    }

    #[test]
    fn test_criteria_cap_keeps_one_criterion() {
        let mut rules = rules_with(&[Criterion::MaxLands, Criterion::BestAdministration]);
        rules.voting.criterias_used_per_vote = vec![1];
        let mut world = world(rules);
        world.realm_mut(RealmId(1)).available_decisions = 5;

        // Best administration becomes active after the first council.
        let result = run(&world, 1, 3);
        let won: usize = result.scores.iter().map(|s| s.won.len()).sum();
        assert_eq!(won, 1);
        assert_eq!(result, run(&world, 1, 3));
    }

    #[test]
    fn test_ties_keep_realm_order() {
        let mut world = world(rules_with(&[Criterion::MaxMoney]));
        world.realm_mut(RealmId(2)).silver_treasury = 500;
        let result = run(&world, 0, 1);
        assert_eq!(result.scores[0].realm, RealmId(0));
        assert_eq!(result.scores[1].realm, RealmId(2));
        assert_eq!(result.scores[0].total_votes, result.scores[1].total_votes);
    }

    #[test]
    fn test_voting_round_trip() {
        let world = world(rules_with(&[Criterion::MaxLands, Criterion::MaxMoney]));
        let mut voting = Voting::default();
        let mut rng = PreRolledRng::new(4);
        voting
            .compute(&world, 0, &mut rng, &mut NullDiagnostics)
            .unwrap();
        let bytes = voting.to_bytes().unwrap();
        assert_eq!(Voting::from_bytes(&bytes).unwrap(), voting);
    }
}
