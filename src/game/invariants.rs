//! Game invariants - sanity checks that detect bugs.
//!
//! No sequence of accepted transforms should ever break these. A violation
//! means resolution or effect application is wrong, not that a player did
//! something unusual.

use crate::game::{Buildings, GameState};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all game invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<InvariantViolation> {
    let world = &state.world;
    let mut violations = Vec::new();
    let mut report = |message: String| violations.push(InvariantViolation { message });

    let mut capitals = vec![0usize; world.realm_count()];
    let mut territory = vec![0usize; world.realm_count()];

    for id in world.region_ids() {
        let region = world.region(id);
        if region.inert && (region.is_owned() || !region.buildings.is_empty()) {
            report(format!("Inert region {} is owned or built on", id.0));
        }
        let Some(owner) = region.owner else {
            continue;
        };
        if !world.contains_realm(owner) {
            report(format!("Region {} owned by unknown realm {}", id.0, owner.0));
            continue;
        }
        territory[owner.index()] += 1;
        if region.buildings.contains(Buildings::CAPITAL) {
            capitals[owner.index()] += 1;
        }
    }

    for realm in world.realm_ids() {
        let count = capitals[realm.index()];
        if count > 1 {
            report(format!("Realm {} holds {count} capitals", realm.0));
        }
        if count == 0 && territory[realm.index()] > 0 {
            report(format!(
                "Realm {} owns {} regions but no capital",
                realm.0,
                territory[realm.index()]
            ));
        }

        let entry = world.realm(realm);
        if let Some(ruler) = entry.subjugated_by {
            if ruler == realm || !world.contains_realm(ruler) {
                report(format!("Realm {} subjugated by invalid realm {}", realm.0, ruler.0));
            } else if world.realm(ruler).is_subjugated() {
                report(format!(
                    "Realm {} subjugated by realm {}, which is itself subjugated",
                    realm.0, ruler.0
                ));
            }
            if entry.is_favoured {
                report(format!("Subjugated realm {} is favoured", realm.0));
            }
            if entry.silver_treasury != 0 {
                report(format!(
                    "Subjugated realm {} holds {} silver of its own",
                    realm.0, entry.silver_treasury
                ));
            }
            if world.is_council_realm(realm) {
                report("Council realm is subjugated".to_string());
            }
        }
    }

    violations
}

/// Assert all game invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &GameState) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Game invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &GameState) {}
