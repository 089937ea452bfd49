use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn init_then_profile_set_use_and_list() {
    let workspace = temp_workspace();

    let init = run_json(
        &workspace.path,
        &["init", "--server", "http://meals.local/api", "--user-id", "7"],
    );
    assert_eq!(init["ok"], true);
    assert!(workspace.path.join(".mealsync").join("config.toml").is_file());

    let set = run_json(
        &workspace.path,
        &[
            "profile",
            "set",
            "--name",
            "work",
            "--server",
            "http://work.local/api",
            "--user-id",
            "12",
        ],
    );
    assert_eq!(set["result"]["profile"], "work");
    assert_eq!(set["result"]["user_id"], 12);

    let used = run_json(&workspace.path, &["profile", "use", "work"]);
    assert_eq!(used["result"]["server"], "http://work.local/api");

    let listed = run_json(&workspace.path, &["profile", "list"]);
    assert_eq!(listed["result"]["active_profile"], "work");
    let profiles = listed["result"]["profiles"]
        .as_array()
        .expect("profiles array");
    assert_eq!(profiles.len(), 2);
    let default = profiles
        .iter()
        .find(|profile| profile["name"] == "default")
        .expect("default profile");
    assert_eq!(default["user_id"], 7);
    assert_eq!(default["active"], false);
}

#[test]
fn doctor_reports_missing_user_id_as_unhealthy() {
    let workspace = temp_workspace();
    run_json(&workspace.path, &["init", "--server", "http://meals.local/api"]);

    let mut cmd = base_command(&workspace.path);
    cmd.arg("doctor");
    let assert = cmd.assert().code(6);
    let report: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    assert_eq!(report["result"]["healthy"], false);
    let user_check = report["result"]["checks"]
        .as_array()
        .expect("checks")
        .iter()
        .find(|check| check["name"] == "user_id")
        .expect("user_id check")
        .clone();
    assert_eq!(user_check["ok"], false);

    let healthy = run_json(&workspace.path, &["doctor", "--user-id", "7"]);
    assert_eq!(healthy["result"]["healthy"], true);
    assert_eq!(healthy["result"]["cache"]["pending_actions"], 0);
}

#[test]
fn tracking_commands_without_user_id_are_usage_errors() {
    let workspace = temp_workspace();
    run_json(&workspace.path, &["init", "--server", "http://127.0.0.1:9"]);

    let mut cmd = base_command(&workspace.path);
    cmd.args(["day", "show"]);
    let assert = cmd.assert().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("no user id configured"), "{stderr}");
}

#[test]
fn sync_clear_requires_confirmation() {
    let workspace = temp_workspace();
    run_json(
        &workspace.path,
        &["init", "--server", "http://127.0.0.1:9", "--user-id", "7"],
    );

    let mut cmd = base_command(&workspace.path);
    cmd.args(["sync", "clear"]);
    cmd.assert().code(2);

    let cleared = run_json(&workspace.path, &["sync", "clear", "--yes"]);
    assert_eq!(cleared["result"]["dropped_actions"], 0);
}

#[test]
fn import_legacy_merges_browser_export_into_queue() {
    let workspace = temp_workspace();
    run_json(
        &workspace.path,
        &["init", "--server", "http://127.0.0.1:9", "--user-id", "7"],
    );

    let export = workspace.path.join("export.json");
    fs::write(
        &export,
        json!({
            "state": {
                "cachedTrackings": {
                    "2025-03-01": [{"id": 42, "meal_type": "dinner", "status": "skipped"}]
                },
                "pendingActions": [
                    {
                        "id": "skip_meal_42_1740830400000",
                        "type": "skip_meal",
                        "trackingId": 42,
                        "payload": {"reason": "travel"},
                        "selectedDate": "2025-03-01",
                        "timestamp": 1740830400000i64
                    },
                    {"id": "broken", "type": "teleport_meal", "trackingId": 1}
                ],
                "userId": 7,
                "selectedDate": "2025-03-01"
            },
            "version": 0
        })
        .to_string(),
    )
    .expect("write export");

    let imported = run_json(
        &workspace.path,
        &["import-legacy", export.to_str().expect("export path")],
    );
    assert_eq!(imported["result"]["imported_actions"], 1);
    assert_eq!(imported["result"]["imported_days"], 1);
    assert_eq!(
        imported["result"]["skipped"]
            .as_array()
            .expect("skipped list")
            .len(),
        1
    );

    // Importing the same export twice does not duplicate queued actions.
    let again = run_json(
        &workspace.path,
        &["import-legacy", export.to_str().expect("export path")],
    );
    assert_eq!(again["result"]["pending_actions"], 1);

    let status = run_json(&workspace.path, &["sync", "status"]);
    let pending = status["result"]["pending_actions"]
        .as_array()
        .expect("pending list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["kind"], "skip_meal");
    assert_eq!(status["result"]["cached_days"], 1);
}

#[test]
fn import_legacy_rejects_malformed_file() {
    let workspace = temp_workspace();
    let export = workspace.path.join("export.json");
    fs::write(&export, "not json").expect("write export");

    let mut cmd = base_command(&workspace.path);
    cmd.args(["import-legacy", export.to_str().expect("export path")]);
    let assert = cmd.assert().failure();
    let stderr: Value =
        serde_json::from_slice(&assert.get_output().stderr).expect("json stderr");
    assert_eq!(stderr["ok"], false);
}

fn base_command(workspace: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("mealsync");
    cmd.args([
        "--workspace",
        workspace.to_str().expect("workspace path"),
        "--json",
    ]);
    cmd.env("RUST_LOG", "off");
    cmd
}

fn run_json(workspace: &Path, args: &[&str]) -> Value {
    let mut cmd = base_command(workspace);
    cmd.args(args);

    let assert = cmd.assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    serde_json::from_str(&stdout).expect("json stdout")
}

struct TestWorkspace {
    _temp: TempDir,
    path: PathBuf,
}

fn temp_workspace() -> TestWorkspace {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace_path = temp.path().join("workspace");
    fs::create_dir_all(&workspace_path).expect("create workspace dir");
    TestWorkspace {
        _temp: temp,
        path: workspace_path,
    }
}
