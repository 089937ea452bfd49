use mealsync_core::{ExitCode, MealError, MealResult};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::{GlobalOptions, absolutize, print_json, with_workspace_context};

pub(crate) fn cmd_import_legacy(file: &Path, globals: &GlobalOptions) -> MealResult<ExitCode> {
    let file = absolutize(file)?;
    let raw = fs::read_to_string(&file)
        .map_err(|err| MealError::io(format!("failed to read {}: {err}", file.display())))?;

    with_workspace_context(globals, |ctx| {
        let import = ctx.cache.import_legacy(&ctx.profile, &raw)?;

        if globals.json {
            print_json(&json!({
                "ok": true,
                "result": {
                    "profile": ctx.profile,
                    "imported_days": import.imported_days,
                    "imported_actions": import.imported_actions,
                    "pending_actions": import.state.pending_actions.len(),
                    "skipped": import.skipped,
                }
            }))?;
        } else {
            println!(
                "Imported {} days and {} queued actions into profile '{}'.",
                import.imported_days, import.imported_actions, ctx.profile
            );
            if !import.skipped.is_empty() {
                println!("Skipped {} entries:", import.skipped.len());
                for entry in &import.skipped {
                    println!("  - {entry}");
                }
            }
        }

        Ok(ExitCode::Success)
    })
}
