//! Output formatting utilities for CLI.

use hexcouncil::replay::render_text;
use hexcouncil::{DayReport, Effect, RealmId, Session};
use serde::Serialize;

/// JSON-serializable session result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSessionResult {
    /// Random seed used.
    seed: u64,
    /// Days resolved.
    days_played: u32,
    /// Councils held.
    councils_held: u32,
    /// Winning seat (null while nobody won).
    winner: Option<usize>,
    /// Per-seat results.
    seats: Vec<JsonSeatResult>,
    /// Per-day summaries.
    days: Vec<JsonDay>,
}

/// JSON-serializable seat result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSeatResult {
    /// Player name.
    player: String,
    /// Realm the seat plays.
    realm: u8,
    /// Faction index.
    faction: u8,
    /// Silver in the treasury.
    silver: i32,
    /// Regions connected to the capital.
    regions: usize,
    /// Ruler, if subjugated.
    subjugated_by: Option<u8>,
}

/// JSON-serializable day summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonDay {
    /// Day number after the advance.
    day: u32,
    /// Whether resolution failed and the day was voided.
    voided: bool,
    /// Effects in application order.
    effects: Vec<Effect>,
    /// Council ranking as `(realm, votes)`, if a council was held.
    council: Option<Vec<(u8, i32)>>,
}

impl JsonDay {
    /// Create from a day report.
    pub(super) fn from_report(report: &DayReport) -> Self {
        Self {
            day: report.day,
            voided: report.voided,
            effects: report.effects.clone(),
            council: report.council.as_ref().map(|result| {
                result
                    .scores
                    .iter()
                    .map(|score| (score.realm.0, score.total_votes))
                    .collect()
            }),
        }
    }
}

impl JsonSessionResult {
    /// Create from a finished session and its day reports.
    pub(super) fn from_session(session: &Session, reports: &[DayReport]) -> Self {
        let world = &session.state().world;
        let seats = session
            .party()
            .iter()
            .zip(session.seats())
            .map(|(assignment, &realm)| {
                let entry = world.realm(realm);
                JsonSeatResult {
                    player: assignment.player.clone(),
                    realm: realm.0,
                    faction: entry.faction_index,
                    silver: world.silver_treasury(realm),
                    regions: world.territory_of(realm, false).len(),
                    subjugated_by: entry.subjugated_by.map(|ruler| ruler.0),
                }
            })
            .collect();

        Self {
            seed: session.seed(),
            days_played: session.state().days_passed,
            councils_held: session.state().councils_passed,
            winner: session.winner().and_then(|realm| session.seat_of(realm)),
            seats,
            days: reports.iter().map(JsonDay::from_report).collect(),
        }
    }
}

/// Name of the player seated on `realm`, or a realm tag.
pub(super) fn realm_label(session: &Session, realm: RealmId) -> String {
    session
        .seat_of(realm)
        .and_then(|seat| session.party().get(seat))
        .map_or_else(|| format!("realm {}", realm.0), |a| a.player.clone())
}

/// Format one day report as a text line plus its effects.
pub(super) fn format_day(session: &Session, report: &DayReport, verbose: bool) -> String {
    let mut output = String::new();
    output.push_str(&format!("Day {}: {} effects", report.day, report.effects.len()));
    if report.voided {
        output.push_str(" (voided)");
    }
    output.push('\n');

    if verbose {
        for effect in &report.effects {
            output.push_str(&format!("  {effect}\n"));
        }
    }

    if let Some(council) = &report.council {
        output.push_str("  Council:");
        for score in &council.scores {
            output.push_str(&format!(
                " {} {}",
                realm_label(session, score.realm),
                score.total_votes
            ));
        }
        output.push_str(&format!(" (wasted {})\n", council.wasted_votes));
        let runner_up = council
            .second_place()
            .filter(|_| !council.has_majority_winner());
        if let Some(runner_up) = runner_up {
            output.push_str(&format!(
                "  No majority; runner-up {}\n",
                realm_label(session, runner_up)
            ));
        }
    }
    if let Some(winner) = report.winner {
        output.push_str(&format!("  {} wins the council!\n", realm_label(session, winner)));
    }
    output
}

/// Format the final session state as human-readable text.
pub(super) fn format_text(session: &Session) -> String {
    let mut output = String::new();

    output.push_str(&format!("Session Result (seed: {})\n", session.seed()));
    match session.winner() {
        Some(winner) => {
            output.push_str(&format!("  Winner: {}\n", realm_label(session, winner)));
        }
        None => output.push_str("  Winner: none yet\n"),
    }
    output.push_str(&format!(
        "  Days: {}  Councils: {}\n\n",
        session.state().days_passed,
        session.state().councils_passed
    ));

    for (assignment, &realm) in session.party().iter().zip(session.seats()) {
        let world = &session.state().world;
        output.push_str(&format!(
            "  {} (realm {}, faction {}): {} silver, {} regions\n",
            assignment.player,
            realm.0,
            assignment.faction_index,
            world.silver_treasury(realm),
            world.territory_of(realm, false).len()
        ));
    }
    output.push('\n');
    output.push_str(&render_text(session.state()));
    output
}
