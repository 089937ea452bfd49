use crate::config::{DEFAULT_SERVER_URL, WorkspaceConfig, load_config, save_config};
use mealsync_core::{MealError, MealResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = ".mealsync";

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_path: PathBuf,
    pub state_db_path: PathBuf,
    pub lock_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkspaceInitResult {
    pub paths: WorkspacePaths,
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
}

impl WorkspacePaths {
    pub fn from_root(root: PathBuf) -> Self {
        let state_dir = root.join(STATE_DIR_NAME);

        Self {
            cache_dir: state_dir.join("cache"),
            logs_dir: state_dir.join("logs"),
            config_path: state_dir.join("config.toml"),
            state_db_path: state_dir.join("state.db"),
            lock_path: state_dir.join("lock"),
            root,
            state_dir,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir()
    }
}

pub fn init_workspace(
    target: Option<&Path>,
    server: Option<&str>,
    user_id: Option<i64>,
) -> MealResult<WorkspaceInitResult> {
    let root = match target {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            MealError::io(format!(
                "failed to resolve current directory for init: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    let mut created = Vec::new();
    let mut updated = Vec::new();

    ensure_dir(&paths.root, &mut created)?;
    ensure_dir(&paths.state_dir, &mut created)?;
    ensure_dir(&paths.cache_dir, &mut created)?;
    ensure_dir(&paths.logs_dir, &mut created)?;

    ensure_file(&paths.state_db_path, &mut created)?;
    ensure_file(&paths.lock_path, &mut created)?;

    if paths.config_path.exists() {
        let mut config = load_config(&paths)?;
        if let Some(user_id) = user_id
            && let Some(profile) = config.profiles.get_mut(&config.active_profile)
            && profile.user_id != Some(user_id)
        {
            profile.user_id = Some(user_id);
            save_config(&paths, &config)?;
            updated.push(paths.config_path.clone());
        }
    } else {
        let default_server = server.unwrap_or(DEFAULT_SERVER_URL);
        let mut config = WorkspaceConfig::with_default_server(default_server);
        if let Some(profile) = config.profiles.get_mut(&config.active_profile) {
            profile.user_id = user_id;
        }
        save_config(&paths, &config)?;
        created.push(paths.config_path.clone());
    }

    Ok(WorkspaceInitResult {
        paths,
        created,
        updated,
    })
}

pub fn resolve_workspace(explicit: Option<&Path>) -> MealResult<WorkspacePaths> {
    let root = match explicit {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            MealError::io(format!(
                "failed to resolve current directory for workspace lookup: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    if !paths.is_initialized() {
        let root_display = paths.root.display();
        return Err(MealError::usage(format!(
            "workspace is not initialized at '{root_display}'; run `mealsync init --workspace {root_display}` first"
        )));
    }

    Ok(paths)
}

fn absolutize(path: &Path) -> MealResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|err| {
        MealError::io(format!(
            "failed to resolve current directory for path: {err}"
        ))
    })?;

    Ok(cwd.join(path))
}

fn ensure_dir(path: &Path, created: &mut Vec<PathBuf>) -> MealResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(MealError::io(format!(
                "expected '{}' to be a directory",
                path.display()
            )));
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| {
        MealError::io(format!(
            "failed to create directory '{}': {}",
            path.display(),
            err
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}

fn ensure_file(path: &Path, created: &mut Vec<PathBuf>) -> MealResult<()> {
    if path.exists() {
        if !path.is_file() {
            return Err(MealError::io(format!(
                "expected '{}' to be a file",
                path.display()
            )));
        }
        return Ok(());
    }

    fs::write(path, []).map_err(|err| {
        MealError::io(format!(
            "failed to create file '{}': {}",
            path.display(),
            err
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}
