use crate::config::{load_config, resolve_profile};
use crate::workspace::WorkspacePaths;
use mealsync_core::MealResult;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub ok: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub workspace: String,
    pub healthy: bool,
    pub checks: Vec<DoctorCheck>,
    pub active_profile: Option<String>,
    pub server: Option<String>,
    pub user_id: Option<i64>,
}

pub fn run_doctor(
    paths: &WorkspacePaths,
    profile_override: Option<&str>,
    server_override: Option<&str>,
    user_override: Option<i64>,
) -> MealResult<DoctorReport> {
    let mut checks = vec![
        dir_check("workspace_root", &paths.root),
        dir_check("state_directory", &paths.state_dir),
        dir_check("cache_directory", &paths.cache_dir),
        dir_check("logs_directory", &paths.logs_dir),
        file_check("config_file", &paths.config_path),
        file_check("state_db_file", &paths.state_db_path),
        file_check("lock_file", &paths.lock_path),
    ];

    let mut active_profile = None;
    let mut server = None;
    let mut user_id = None;

    if paths.config_path.is_file() {
        match load_config(paths) {
            Ok(config) => match resolve_profile(
                &config,
                profile_override,
                server_override,
                user_override,
            ) {
                Ok(resolved) => {
                    checks.push(DoctorCheck {
                        name: "active_profile".to_string(),
                        ok: true,
                        details: format!("{} ({})", resolved.name, resolved.server),
                    });
                    checks.push(DoctorCheck {
                        name: "user_id".to_string(),
                        ok: resolved.user_id.is_some(),
                        details: resolved.user_id.map_or_else(
                            || "not configured; run `mealsync profile set --server <URL> --user-id <ID>`".to_string(),
                            |id| id.to_string(),
                        ),
                    });
                    active_profile = Some(resolved.name);
                    server = Some(resolved.server);
                    user_id = resolved.user_id;
                }
                Err(err) => checks.push(DoctorCheck {
                    name: "active_profile".to_string(),
                    ok: false,
                    details: err.message,
                }),
            },
            Err(err) => checks.push(DoctorCheck {
                name: "config_parse".to_string(),
                ok: false,
                details: err.message,
            }),
        }
    }

    let healthy = checks.iter().all(|check| check.ok);

    Ok(DoctorReport {
        workspace: paths.root.display().to_string(),
        healthy,
        checks,
        active_profile,
        server,
        user_id,
    })
}

fn dir_check(name: &str, path: &Path) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        ok: path.is_dir(),
        details: path.display().to_string(),
    }
}

fn file_check(name: &str, path: &Path) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        ok: path.is_file(),
        details: path.display().to_string(),
    }
}
