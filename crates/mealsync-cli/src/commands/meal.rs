use chrono::{DateTime, SecondsFormat, Utc};
use mealsync_api::{ConsumeData, MealTrackingApi, ReplaceData};
use mealsync_core::{ExitCode, MealError, MealResult};
use mealsync_sync::{MutationOutcome, SyncEngine};
use serde_json::json;

use crate::{GlobalOptions, MealCommand, print_json, render_error, with_engine};

pub(crate) fn cmd_meal(command: MealCommand, globals: &GlobalOptions) -> MealResult<ExitCode> {
    with_engine(globals, |engine, _ctx| {
        let (tracking_id, outcome) = match command {
            MealCommand::Consume {
                id,
                rating,
                notes,
                at,
            } => {
                let consumption_time = match at {
                    Some(raw) => DateTime::parse_from_rfc3339(&raw)
                        .map_err(|err| {
                            MealError::usage(format!("--at must be an RFC 3339 timestamp: {err}"))
                        })?
                        .with_timezone(&Utc),
                    None => Utc::now(),
                };

                ensure_loaded(engine, id);
                let outcome = engine.consume_meal(
                    id,
                    ConsumeData {
                        consumption_time: consumption_time
                            .to_rfc3339_opts(SecondsFormat::Secs, true),
                        satisfaction_rating: rating,
                        notes,
                    },
                )?;
                (id, outcome)
            }
            MealCommand::Adjust { id, portion } => {
                ensure_loaded(engine, id);
                (id, engine.adjust_portions(id, portion, None)?)
            }
            MealCommand::Skip { id, reason } => {
                ensure_loaded(engine, id);
                (id, engine.skip_meal(id, reason)?)
            }
            MealCommand::Replace { id, name, reason } => {
                ensure_loaded(engine, id);
                let outcome = engine.replace_meal(
                    id,
                    ReplaceData {
                        replacement_name: name,
                        reason,
                        nutrition: None,
                    },
                )?;
                (id, outcome)
            }
        };

        report(engine, tracking_id, outcome, globals)
    })
}

/// Trackings are only known once their day has been loaded; the cache
/// answers without a request when it can.
fn ensure_loaded(engine: &mut SyncEngine<'_, MealTrackingApi>, tracking_id: i64) {
    if engine.store().find(tracking_id).is_none() {
        engine.load_today_meal_trackings(false);
    }
}

fn report(
    engine: &SyncEngine<'_, MealTrackingApi>,
    tracking_id: i64,
    outcome: MutationOutcome,
    globals: &GlobalOptions,
) -> MealResult<ExitCode> {
    if let MutationOutcome::RolledBack { error } = &outcome {
        render_error(error, globals.json);
        return Ok(error.exit_code());
    }

    let store = engine.store();
    if globals.json {
        print_json(&json!({
            "ok": true,
            "result": {
                "tracking_id": tracking_id,
                "settled": outcome,
                "tracking": store.find(tracking_id),
                "offline_mode": store.is_offline(),
                "pending_actions": store.pending_actions_count(),
            }
        }))?;
        return Ok(ExitCode::Success);
    }

    match outcome {
        MutationOutcome::Confirmed { tracking } => {
            println!(
                "Meal #{} ({}) is now {}.",
                tracking.id,
                tracking.display_name(),
                tracking.status
            );
        }
        MutationOutcome::Queued { action_id } => {
            println!(
                "Server unreachable, queued {} ({} pending). Run `mealsync sync run` once back online.",
                action_id,
                store.pending_actions_count()
            );
        }
        MutationOutcome::Applied | MutationOutcome::RolledBack { .. } => {
            println!("Meal #{tracking_id} updated locally.");
        }
    }

    Ok(ExitCode::Success)
}
