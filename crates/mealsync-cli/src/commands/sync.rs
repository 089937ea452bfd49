use mealsync_core::{ExitCode, MealError, MealResult};
use serde::Serialize;
use serde_json::json;

use crate::{GlobalOptions, SyncCommand, print_json, with_engine, with_workspace_context};

#[derive(Debug, Serialize)]
struct QueuedActionView {
    id: String,
    kind: String,
    tracking_id: i64,
    selected_date: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct SyncSummary {
    replayed: usize,
    remaining: usize,
    offline_mode: bool,
    last_sync: Option<String>,
}

pub(crate) fn cmd_sync(command: SyncCommand, globals: &GlobalOptions) -> MealResult<ExitCode> {
    match command {
        SyncCommand::Status => with_workspace_context(globals, |ctx| {
            let state = ctx.cache.load_state(&ctx.profile)?;
            let queued: Vec<QueuedActionView> = state
                .pending_actions
                .iter()
                .map(|pending| QueuedActionView {
                    id: pending.id.clone(),
                    kind: pending.kind().to_string(),
                    tracking_id: pending.tracking_id,
                    selected_date: pending.selected_date.to_string(),
                    timestamp: pending.timestamp.to_rfc3339(),
                })
                .collect();

            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {
                        "profile": ctx.profile,
                        "server": ctx.server,
                        "state_db": ctx.paths.state_db_path.display().to_string(),
                        "offline_mode": state.offline_mode,
                        "last_sync": state.last_sync.map(|at| at.to_rfc3339()),
                        "selected_date": state.selected_date,
                        "cached_days": state.cached_days.len(),
                        "pending_actions": queued,
                    }
                }))?;
            } else {
                println!("Profile: {} ({})", ctx.profile, ctx.server);
                println!(
                    "Offline mode: {}",
                    if state.offline_mode { "on" } else { "off" }
                );
                match state.last_sync {
                    Some(at) => println!("Last sync: {}", at.to_rfc3339()),
                    None => println!("Last sync: never"),
                }
                println!("Cached days: {}", state.cached_days.len());
                println!("Pending actions: {}", queued.len());
                for action in &queued {
                    println!(
                        "  - {} {} #{} ({})",
                        action.id, action.kind, action.tracking_id, action.selected_date
                    );
                }
            }

            Ok(ExitCode::Success)
        }),
        SyncCommand::Run => with_engine(globals, |engine, _ctx| {
            let replayed = engine.sync_pending_actions();
            let store = engine.store();
            let summary = SyncSummary {
                replayed,
                remaining: store.pending_actions_count(),
                offline_mode: store.is_offline(),
                last_sync: store.last_sync().map(|at| at.to_rfc3339()),
            };

            if globals.json {
                print_json(&json!({"ok": true, "result": summary}))?;
            } else if summary.replayed == 0 && summary.remaining == 0 {
                println!("Nothing to sync.");
            } else {
                println!(
                    "Sync completed: {} replayed, {} still queued.",
                    summary.replayed, summary.remaining
                );
            }

            Ok(if summary.remaining == 0 {
                ExitCode::Success
            } else {
                ExitCode::Sync
            })
        }),
        SyncCommand::Clear { all } => {
            if !globals.yes {
                return Err(MealError::usage(
                    "clearing queued actions discards them for good; pass --yes to confirm",
                ));
            }

            with_workspace_context(globals, |ctx| {
                let dropped = ctx.cache.load_pending(&ctx.profile)?.len();
                ctx.cache.clear(&ctx.profile, all)?;

                if globals.json {
                    print_json(&json!({
                        "ok": true,
                        "result": {"dropped_actions": dropped, "cleared_cache": all}
                    }))?;
                } else if all {
                    println!("Dropped {dropped} queued actions and all cached days.");
                } else {
                    println!("Dropped {dropped} queued actions.");
                }

                Ok(ExitCode::Success)
            })
        }
    }
}
