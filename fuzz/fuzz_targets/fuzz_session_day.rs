#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use hexcouncil::game::check_invariants;
use hexcouncil::{
    Buildings, NullDiagnostics, RealmId, RegionId, Rules, SeatAssignment, Session, Transform,
};
use libfuzzer_sys::fuzz_target;

/// One fuzzed intent.
#[derive(Arbitrary, Debug)]
enum FuzzAction {
    Attack { seat: u8, from: u16, to: u16, extended: bool },
    Build { seat: u8, region: u16, church: bool },
    Upgrade { seat: u8 },
    Favours { seat: u8 },
}

/// Structured input for whole-session fuzzing.
#[derive(Arbitrary, Debug)]
struct SessionInput {
    /// Session seed.
    seed: u64,
    /// Number of players (capped to 1-8).
    players: u8,
    /// Faction per seat.
    factions: [u8; 8],
    /// Actions per day.
    days: Vec<Vec<FuzzAction>>,
}

fuzz_target!(|input: SessionInput| {
    let count = usize::from(input.players % 8) + 1;
    let party = (0..count)
        .map(|i| SeatAssignment::new(format!("p{i}"), input.factions[i] % 8))
        .collect();
    let Ok(mut session) = Session::new(party, Arc::new(Rules::default()), input.seed) else {
        return;
    };
    let mut diag = NullDiagnostics;

    for day in input.days.iter().take(30) {
        if session.is_over() {
            break;
        }
        for action in day.iter().take(32) {
            let id = session.next_transform_id();
            let realm = |seat: u8| {
                session
                    .seats()
                    .get(usize::from(seat) % count)
                    .copied()
                    .unwrap_or(RealmId(0))
            };
            let transform = match *action {
                FuzzAction::Attack { seat, from, to, extended } => {
                    Transform::attack(id, realm(seat), RegionId(from), RegionId(to), extended)
                }
                FuzzAction::Build { seat, region, church } => {
                    let building = if church { Buildings::CHURCH } else { Buildings::FORT };
                    Transform::build(id, realm(seat), RegionId(region), building, 40)
                }
                FuzzAction::Upgrade { seat } => Transform::improve_administration(id, realm(seat), 20),
                FuzzAction::Favours { seat } => Transform::pay_favours(id, realm(seat), 100),
            };
            session.add_transform(transform, &mut diag);
        }
        if session.advance(&mut diag).is_err() {
            break;
        }
        let violations = check_invariants(session.state());
        assert!(violations.is_empty(), "{violations:?}");
    }
});
