use mealsync_core::{ExitCode, MealResult};
use mealsync_fs::{
    STATE_DIR_NAME, init_workspace, list_profiles, load_config, resolve_profile,
    resolve_workspace, run_doctor, save_config, set_active_profile, set_profile_server,
};
use mealsync_store::CacheStore;
use serde_json::json;

use crate::{
    GlobalOptions, InitOutput, ProfileChangedOutput, ProfileCommand, print_json, workspace_target,
};

pub(crate) fn cmd_init(globals: &GlobalOptions) -> MealResult<ExitCode> {
    let target = workspace_target(globals)?;
    let result = init_workspace(Some(&target), globals.server.as_deref(), globals.user_id)?;
    CacheStore::from_workspace(&result.paths)?;

    let output = InitOutput {
        workspace: result.paths.root.display().to_string(),
        created: result
            .created
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        updated: result
            .updated
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
    };

    if globals.json {
        print_json(&json!({"ok": true, "result": output}))?;
    } else {
        println!("Workspace initialized: {}", output.workspace);
        println!("Created:");
        if output.created.is_empty() {
            println!("  - none");
        } else {
            for path in &output.created {
                println!("  - {path}");
            }
        }

        if output.updated.is_empty() {
            println!("Updated: none");
        } else {
            println!("Updated:");
            for path in &output.updated {
                println!("  - {path}");
            }
        }
    }

    Ok(ExitCode::Success)
}

pub(crate) fn cmd_doctor(globals: &GlobalOptions) -> MealResult<ExitCode> {
    let target = workspace_target(globals)?;
    let paths = resolve_workspace(Some(&target))?;

    let report = run_doctor(
        &paths,
        globals.profile.as_deref(),
        globals.server.as_deref(),
        globals.user_id,
    )?;

    // An unreadable state database should show up in the report, not abort it.
    let cache_state = report.active_profile.as_deref().map(|profile| {
        CacheStore::from_workspace(&paths).and_then(|cache| cache.load_state(profile))
    });
    let (cache_ok, cache_details, pending, offline, last_sync) = match cache_state {
        Some(Ok(state)) => (
            true,
            format!(
                "{} cached days, {} pending actions",
                state.cached_days.len(),
                state.pending_actions.len()
            ),
            state.pending_actions.len(),
            state.offline_mode,
            state.last_sync.map(|at| at.to_rfc3339()),
        ),
        Some(Err(err)) => (false, err.message, 0, false, None),
        None => (false, "no active profile".to_string(), 0, false, None),
    };
    let healthy = report.healthy && cache_ok;

    if globals.json {
        print_json(&json!({
            "ok": healthy,
            "result": {
                "workspace": report.workspace,
                "healthy": healthy,
                "checks": report.checks,
                "active_profile": report.active_profile,
                "server": report.server,
                "user_id": report.user_id,
                "cache": {
                    "ok": cache_ok,
                    "details": cache_details,
                    "pending_actions": pending,
                    "offline_mode": offline,
                    "last_sync": last_sync
                }
            }
        }))?;
    } else {
        println!("Workspace: {}", report.workspace);
        println!("Health: {}", if healthy { "healthy" } else { "degraded" });

        for check in &report.checks {
            let prefix = if check.ok { "OK" } else { "FAIL" };
            println!("[{}] {} -> {}", prefix, check.name, check.details);
        }

        println!(
            "[{}] cache -> {}",
            if cache_ok { "OK" } else { "FAIL" },
            cache_details
        );
        if offline {
            println!("Offline mode is on; run `mealsync net check` to re-probe the server.");
        }
    }

    Ok(if healthy {
        ExitCode::Success
    } else {
        ExitCode::Io
    })
}

pub(crate) fn cmd_profile(
    command: ProfileCommand,
    globals: &GlobalOptions,
) -> MealResult<ExitCode> {
    let target = workspace_target(globals)?;
    if !target.join(STATE_DIR_NAME).is_dir() {
        init_workspace(Some(&target), globals.server.as_deref(), globals.user_id)?;
    }

    let paths = resolve_workspace(Some(&target))?;
    let mut config = load_config(&paths)?;

    match command {
        ProfileCommand::List => {
            let profiles = list_profiles(&config);
            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {"active_profile": config.active_profile, "profiles": profiles}
                }))?;
            } else {
                println!("Active profile: {}", config.active_profile);
                for profile in profiles {
                    let marker = if profile.active { "*" } else { " " };
                    let user = profile
                        .user_id
                        .map_or_else(|| "no user".to_string(), |id| format!("user {id}"));
                    println!("{} {} ({}, {})", marker, profile.name, profile.server, user);
                }
            }

            Ok(ExitCode::Success)
        }
        ProfileCommand::Use { name } => {
            set_active_profile(&mut config, &name)?;
            save_config(&paths, &config)?;

            let resolved = resolve_profile(
                &config,
                Some(&name),
                globals.server.as_deref(),
                globals.user_id,
            )?;
            let output = ProfileChangedOutput {
                profile: resolved.name,
                server: resolved.server,
                user_id: resolved.user_id,
            };

            if globals.json {
                print_json(&json!({"ok": true, "result": output}))?;
            } else {
                println!(
                    "Active profile set to '{}' ({})",
                    output.profile, output.server
                );
            }

            Ok(ExitCode::Success)
        }
        ProfileCommand::Set {
            name,
            server,
            user_id,
        } => {
            let target_profile = name.unwrap_or_else(|| config.active_profile.clone());
            set_profile_server(&mut config, &target_profile, &server, user_id);
            save_config(&paths, &config)?;

            let resolved = resolve_profile(&config, Some(&target_profile), None, None)?;
            let output = ProfileChangedOutput {
                profile: resolved.name,
                server: resolved.server,
                user_id: resolved.user_id,
            };

            if globals.json {
                print_json(&json!({"ok": true, "result": output}))?;
            } else {
                match output.user_id {
                    Some(id) => println!(
                        "Profile '{}' server set to {} (user {})",
                        output.profile, output.server, id
                    ),
                    None => println!(
                        "Profile '{}' server set to {}",
                        output.profile, output.server
                    ),
                }
            }

            Ok(ExitCode::Success)
        }
    }
}
