//! Text renderer for terminal viewing with ANSI colors.

use crate::game::{Buildings, GameState, RealmId, Region};

/// ANSI color codes for realms.
const REALM_COLORS: [&str; 8] = [
    "\x1b[31m", // Red
    "\x1b[34m", // Blue
    "\x1b[32m", // Green
    "\x1b[33m", // Yellow
    "\x1b[35m", // Magenta
    "\x1b[36m", // Cyan
    "\x1b[91m", // Bright Red
    "\x1b[94m", // Bright Blue
];

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const WHITE: &str = "\x1b[37m";
const GRAY: &str = "\x1b[90m";

/// Render a game state as a hex map with a realm table.
///
/// Output format:
/// ```text
/// Day 3  council in 2 days  councils held: 0
/// ┌───────────────────┐
/// │   .  .  a  a  .   │
/// │    .  a  A* a  .  │
/// └───────────────────┘
///
/// Legend: a=owned  A=capital  *=capital ^=fort +=church  .=neutral
///
/// a  realm 0  faction 1  silver 23  decisions 3  regions 7
/// ```
///
/// Odd rows are shifted right by half a cell.
#[must_use]
pub fn render_text(state: &GameState) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{BOLD}Day {}{RESET}  council in {} days  councils held: {}\n",
        state.days_passed, state.days_remaining_before_next_council, state.councils_passed
    ));

    render_map(&mut output, state);

    output.push_str("\nLegend: a=owned  A=capital  *=capital ^=fort +=church  .=neutral\n\n");

    render_realms(&mut output, state);
    output
}

fn render_map(output: &mut String, state: &GameState) {
    let world = &state.world;
    let side = usize::try_from(world.side_length()).unwrap_or(0);
    let border = "─".repeat(side * 3 + 2);

    output.push_str(&format!("┌{border}┐\n"));
    for (index, id) in world.region_ids().enumerate() {
        let x = index % side;
        let y = index / side;
        if x == 0 {
            output.push_str(if y % 2 == 1 { "│  " } else { "│ " });
        }
        render_region(output, world.region(id));
        if x + 1 == side {
            output.push_str(if y % 2 == 1 { "│\n" } else { " │\n" });
        }
    }
    output.push_str(&format!("└{border}┘\n"));
}

fn render_region(output: &mut String, region: &Region) {
    if region.inert {
        output.push_str("   ");
        return;
    }
    let Some(owner) = region.owner else {
        output.push_str(&format!("{GRAY} . {RESET}"));
        return;
    };

    let mut letter = realm_letter(owner);
    if region.buildings.contains(Buildings::CAPITAL) {
        letter = letter.to_ascii_uppercase();
    }
    let mark = building_mark(region.buildings);
    let color = realm_color(owner);
    output.push_str(&format!("{color} {letter}{mark}{RESET}"));
}

fn building_mark(buildings: Buildings) -> char {
    if buildings.contains(Buildings::CAPITAL) {
        '*'
    } else if buildings.contains(Buildings::FORT) {
        '^'
    } else if buildings.contains(Buildings::CHURCH) {
        '+'
    } else {
        ' '
    }
}

/// Single-letter tag of a realm, `a` for realm 0.
fn realm_letter(realm: RealmId) -> char {
    if realm.0 < 26 {
        char::from(b'a' + realm.0)
    } else {
        '?'
    }
}

fn realm_color(realm: RealmId) -> &'static str {
    REALM_COLORS.get(realm.index()).copied().unwrap_or(WHITE)
}

fn render_realms(output: &mut String, state: &GameState) {
    let world = &state.world;
    for realm in world.realm_ids() {
        let entry = world.realm(realm);
        let regions = world
            .regions()
            .iter()
            .filter(|region| region.is_owned_by(realm))
            .count();
        let color = realm_color(realm);
        output.push_str(&format!(
            "{color}{}{RESET}  realm {}  faction {}  silver {}  decisions {}  regions {regions}",
            realm_letter(realm),
            realm.0,
            entry.faction_index,
            world.silver_treasury(realm),
            entry.available_decisions,
        ));
        if world.is_council_realm(realm) {
            output.push_str("  (council)");
        }
        if entry.is_favoured {
            output.push_str("  favoured");
        }
        if let Some(ruler) = entry.subjugated_by {
            output.push_str(&format!("  subject of {}", realm_letter(ruler)));
        }
        output.push('\n');
    }
}
