mod commands;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use mealsync_api::MealTrackingApi;
use mealsync_core::{ExitCode, MealError, MealResult};
use mealsync_fs::{
    STATE_DIR_NAME, WorkspaceConfig, WorkspacePaths, init_workspace, load_config, resolve_profile,
    resolve_workspace,
};
use mealsync_store::CacheStore;
use mealsync_sync::{SyncEngine, TrackingStore};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mealsync",
    version,
    about = "Offline-aware meal tracking client",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,

    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, global = true, value_name = "ID")]
    user_id: Option<i64>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Init,
    Doctor,
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Show or switch the tracked day
    Day {
        #[command(subcommand)]
        command: DayCommand,
    },
    /// Record what happened to a planned meal
    Meal {
        #[command(subcommand)]
        command: MealCommand,
    },
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
    /// Connectivity checks and manual online/offline transitions
    Net {
        #[command(subcommand)]
        command: NetCommand,
    },
    /// Import a browser storage export (`meal-tracking-storage` JSON)
    ImportLegacy {
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    List,
    Use {
        name: String,
    },
    Set {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        server: String,

        #[arg(long)]
        user_id: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum DayCommand {
    Show {
        #[arg(long)]
        refresh: bool,
    },
    /// Switch to a date (YYYY-MM-DD or "today")
    Select {
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    Summary {
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Debug, Subcommand)]
enum MealCommand {
    Consume {
        id: i64,
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    Adjust {
        id: i64,
        #[arg(long)]
        portion: f64,
    },
    Skip {
        id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    Replace {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

#[derive(Debug, Subcommand)]
enum SyncCommand {
    Status,
    /// Replay queued actions against the server
    Run,
    /// Drop queued actions (requires --yes)
    Clear {
        /// Also drop cached days
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Subcommand)]
enum NetCommand {
    Check,
    Online,
    Offline,
    Watch {
        /// Seconds between probes, defaults to the workspace setting
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        iterations: Option<u32>,
    },
}

#[derive(Debug, Clone)]
struct GlobalOptions {
    profile: Option<String>,
    workspace: Option<PathBuf>,
    server: Option<String>,
    user_id: Option<i64>,
    json: bool,
    yes: bool,
}

#[derive(Debug)]
struct WorkspaceContext {
    paths: WorkspacePaths,
    config: WorkspaceConfig,
    profile: String,
    server: String,
    user_id: Option<i64>,
    cache: CacheStore,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    workspace: String,
    created: Vec<String>,
    updated: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ProfileChangedOutput {
    profile: String,
    server: String,
    user_id: Option<i64>,
}

fn main() {
    let cli = Cli::parse();
    configure_logging(cli.debug, cli.json, cli.no_color);

    let globals = GlobalOptions {
        profile: cli.profile,
        workspace: cli.workspace,
        server: cli.server,
        user_id: cli.user_id,
        json: cli.json,
        yes: cli.yes,
    };

    let result = run_command(cli.command, &globals);

    let exit = match result {
        Ok(code) => code,
        Err(error) => {
            render_error(&error, globals.json);
            error.exit_code()
        }
    };

    std::process::exit(exit.as_i32());
}

fn configure_logging(debug: bool, json: bool, no_color: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_command(command: Command, globals: &GlobalOptions) -> MealResult<ExitCode> {
    match command {
        Command::Init => commands::profile::cmd_init(globals),
        Command::Doctor => commands::profile::cmd_doctor(globals),
        Command::Profile { command } => commands::profile::cmd_profile(command, globals),
        Command::Day { command } => commands::day::cmd_day(command, globals),
        Command::Meal { command } => commands::meal::cmd_meal(command, globals),
        Command::Sync { command } => commands::sync::cmd_sync(command, globals),
        Command::Net { command } => commands::net::cmd_net(command, globals),
        Command::ImportLegacy { file } => commands::import::cmd_import_legacy(&file, globals),
    }
}

fn with_workspace_context<F>(globals: &GlobalOptions, run: F) -> MealResult<ExitCode>
where
    F: FnOnce(WorkspaceContext) -> MealResult<ExitCode>,
{
    let target = workspace_target(globals)?;
    if !target.join(STATE_DIR_NAME).is_dir() {
        init_workspace(Some(&target), globals.server.as_deref(), globals.user_id)?;
    }

    let paths = resolve_workspace(Some(&target))?;
    let config = load_config(&paths)?;
    let resolved = resolve_profile(
        &config,
        globals.profile.as_deref(),
        globals.server.as_deref(),
        globals.user_id,
    )?;
    let cache = CacheStore::from_workspace(&paths)?;

    run(WorkspaceContext {
        paths,
        config,
        profile: resolved.name,
        server: resolved.server,
        user_id: resolved.user_id,
        cache,
    })
}

/// Loads the profile's tracking state, hands a sync engine to `run`, and
/// persists the state afterwards whether or not `run` succeeded.
fn with_engine<F>(globals: &GlobalOptions, run: F) -> MealResult<ExitCode>
where
    F: FnOnce(&mut SyncEngine<'_, MealTrackingApi>, &WorkspaceContext) -> MealResult<ExitCode>,
{
    with_workspace_context(globals, |ctx| {
        let user_id = ctx.user_id.ok_or_else(|| {
            MealError::usage(format!(
                "no user id configured for profile '{}'; pass --user-id or run `mealsync profile set --server {} --user-id <ID>`",
                ctx.profile, ctx.server
            ))
        })?;

        let api = build_api(&ctx)?;
        let store = TrackingStore::load(&ctx.cache, &ctx.profile, today())?;
        let mut engine = SyncEngine::new(&api, store, user_id);

        let result = run(&mut engine, &ctx);
        engine.store().persist(&ctx.cache, &ctx.profile)?;
        result
    })
}

fn build_api(ctx: &WorkspaceContext) -> MealResult<MealTrackingApi> {
    MealTrackingApi::with_timeout(
        &ctx.server,
        Duration::from_secs(ctx.config.network.request_timeout_secs),
    )
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    if raw.eq_ignore_ascii_case("today") {
        return Ok(today());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD or 'today': {err}"))
}

fn workspace_target(globals: &GlobalOptions) -> MealResult<PathBuf> {
    if let Some(path) = &globals.workspace {
        return absolutize(path);
    }

    std::env::current_dir().map_err(|err| {
        MealError::io(format!(
            "failed to resolve current directory for default workspace: {err}"
        ))
    })
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

fn render_error(error: &MealError, json_output: bool) {
    if json_output {
        let payload = json!({
            "ok": false,
            "error": {
                "kind": error.kind,
                "message": &error.message,
            }
        });
        let serialized = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"ok\":false,\"error\":{\"kind\":\"io\",\"message\":\"failed to serialize error\"}}".to_string()
        });
        eprintln!("{serialized}");
    } else {
        eprintln!("error: {}", error.message);
    }
}

fn print_json<T: Serialize>(value: &T) -> MealResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| MealError::io(format!("failed to render JSON output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
