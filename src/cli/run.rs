//! Run command implementation.

use super::output::{format_day, format_text, JsonSessionResult};
use super::{clock_seed, CliError, OutputFormat};
use hexcouncil::replay::Recording;
use hexcouncil::{
    Buildings, Diagnostics, RegionId, Rules, SeatAssignment, Session, TracingDiagnostics,
    Transform, TransformId,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Building a seat may order in an action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum BuildingName {
    /// Fort.
    Fort,
    /// Church.
    Church,
}

impl From<BuildingName> for Buildings {
    fn from(name: BuildingName) -> Self {
        match name {
            BuildingName::Fort => Self::FORT,
            BuildingName::Church => Self::CHURCH,
        }
    }
}

/// One action of the action log, addressed by seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum PlannedAction {
    /// Attack `to` from `from`; extended when not adjacent.
    Attack {
        /// Seat index.
        seat: usize,
        /// Region to attack from.
        from: RegionId,
        /// Region to attack.
        to: RegionId,
    },
    /// Build on an owned region.
    Build {
        /// Seat index.
        seat: usize,
        /// Region to build on.
        region: RegionId,
        /// Building to raise.
        building: BuildingName,
    },
    /// Buy one more daily decision.
    UpgradeAdministration {
        /// Seat index.
        seat: usize,
    },
    /// Buy council favour.
    PayFavours {
        /// Seat index.
        seat: usize,
    },
}

impl PlannedAction {
    const fn seat(&self) -> usize {
        match *self {
            Self::Attack { seat, .. }
            | Self::Build { seat, .. }
            | Self::UpgradeAdministration { seat }
            | Self::PayFavours { seat } => seat,
        }
    }
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if loading inputs, playing or saving fails.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    players: Vec<SeatAssignment>,
    rules: Option<PathBuf>,
    seed: Option<u64>,
    days: u32,
    actions: Option<PathBuf>,
    autoplay: bool,
    format: OutputFormat,
    save: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let rules = match rules {
        Some(path) => Rules::load(&path).map_err(|e| {
            CliError::new(format!("Failed to load rules {}: {e}", path.display()))
        })?,
        None => Rules::default(),
    };

    let log: Vec<Vec<PlannedAction>> = match actions {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|e| {
                CliError::new(format!("Failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&text)?
        }
        None => Vec::new(),
    };

    let seed = seed.unwrap_or_else(clock_seed);
    let mut session = Session::new(players, Arc::new(rules), seed)?;
    let mut diag = TracingDiagnostics;
    let text = format == OutputFormat::Text && !quiet;

    if text {
        println!("Running session with seed {seed}...");
        for (assignment, realm) in session.party().iter().zip(session.seats()) {
            println!("  {} plays realm {}", assignment.player, realm.0);
        }
        println!();
    }

    let mut reports = Vec::new();
    for day in 0..days {
        if session.is_over() {
            break;
        }

        let planned = usize::try_from(day).ok().and_then(|day| log.get(day));
        if let Some(planned) = planned {
            for action in planned {
                let transform = plan(&mut session, action)?;
                session.add_transform(transform, &mut diag);
            }
        } else if autoplay {
            autoplay_day(&mut session, &mut diag);
        }

        let report = session.advance(&mut diag)?;
        if text {
            print!("{}", format_day(&session, &report, true));
        }
        reports.push(report);
    }

    if let Some(save_path) = save {
        Recording::from_session(&session)
            .save(&save_path)
            .map_err(|e| CliError::new(format!("Failed to save recording: {e}")))?;
        if text {
            println!("Recording saved to: {}", save_path.display());
        }
    }
    if let Some(snapshot_path) = snapshot {
        session
            .save(&snapshot_path)
            .map_err(|e| CliError::new(format!("Failed to save snapshot: {e}")))?;
        if text {
            println!("Snapshot saved to: {}", snapshot_path.display());
        }
    }

    match format {
        OutputFormat::Text => {
            println!();
            print!("{}", format_text(&session));
        }
        OutputFormat::Json => {
            let json_result = JsonSessionResult::from_session(&session, &reports);
            let json = serde_json::to_string_pretty(&json_result)?;
            println!("{json}");
        }
    }

    Ok(())
}

/// Turn a logged action into a transform for its seat.
fn plan(session: &mut Session, action: &PlannedAction) -> Result<Transform, CliError> {
    let id = session.next_transform_id();
    let index = action.seat();
    let seat = session
        .seat(index)
        .ok_or_else(|| CliError::new(format!("Action log names unknown seat {index}")))?;

    Ok(match *action {
        PlannedAction::Attack { from, to, .. } => seat.plan_attack(id, from, to),
        PlannedAction::Build {
            region, building, ..
        } => seat.plan_construction(id, region, building.into())?,
        PlannedAction::UpgradeAdministration { .. } => seat.plan_administration_upgrade(id),
        PlannedAction::PayFavours { .. } => seat.plan_favours(id),
    })
}

/// Plan a simple day for every seat: upgrade administration when
/// affordable, then spend the remaining decisions attacking, neutral
/// targets first.
pub(crate) fn autoplay_day(session: &mut Session, diag: &mut dyn Diagnostics) {
    for index in 0..session.seats().len() {
        let upgrade = session
            .seat(index)
            .filter(|seat| seat.can_upgrade_administration())
            .map(|seat| seat.plan_administration_upgrade(TransformId(0)));
        if let Some(mut upgrade) = upgrade {
            upgrade.id = session.next_transform_id();
            session.add_transform(upgrade, diag);
        }

        loop {
            let Some(mut attack) = session.seat(index).and_then(|seat| {
                let world = &session.state().world;
                world
                    .territory_of(seat.realm(), false)
                    .into_iter()
                    .filter(|&from| seat.can_play_with_region(from) && !seat.has_played(from))
                    .find_map(|from| {
                        let targets = seat.attack_targets(from);
                        let to = targets
                            .iter()
                            .copied()
                            .find(|&to| !world.region(to).is_owned())
                            .or_else(|| targets.first().copied())?;
                        Some(seat.plan_attack(TransformId(0), from, to))
                    })
            }) else {
                break;
            };
            attack.id = session.next_transform_id();
            if !session.add_transform(attack, diag).is_accepted() {
                break;
            }
        }
    }
}
