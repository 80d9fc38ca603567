use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

use mcpsync_cli::test_utils::TestEnvironment;

/// Builds an `mcpsync` command isolated inside the test environment.
fn mcpsync(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("mcpsync").unwrap();
    for (key, value) in env.env_vars() {
        cmd.env(key, value);
    }
    cmd.env("MCPSYNC_NO_PROGRESS", "1");
    cmd
}

const CONTEXT7_NPX: &str = r#"{"mcpServers": {"context7": {"command": "npx"}}}"#;

/// Test that discover lists every project-scoped definition with its path
#[test]
fn test_discover_lists_project_servers() {
    let env = TestEnvironment::new().unwrap();
    env.write_project("work/appA", CONTEXT7_NPX).unwrap();
    env.write_project(
        "work/appB",
        r#"{"mcpServers": {"linear": {"type": "http", "url": "https://mcp.linear.app/mcp"}}}"#,
    )
    .unwrap();

    mcpsync(&env)
        .arg("discover")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("Discovered 2 project server(s):"))
        .stdout(predicate::str::contains("context7"))
        .stdout(predicate::str::contains("appA"))
        .stdout(predicate::str::contains("linear"))
        .stdout(predicate::str::contains("mcpsync consolidate"));
}

/// Test that a project copy of a globally known name is flagged
#[test]
fn test_discover_flags_duplicates_of_global_servers() {
    let env = TestEnvironment::new().unwrap();
    env.write_claude(CONTEXT7_NPX).unwrap();
    env.write_project("appA", CONTEXT7_NPX).unwrap();

    mcpsync(&env)
        .arg("discover")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("collides with a global server"));
}

/// Test discover against a tree with no project files
#[test]
fn test_discover_reports_empty_tree() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .arg("discover")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("No project-scoped servers found under 1 root."));
}

/// Test the JSON row shape emitted by discover
#[test]
fn test_discover_json_rows() {
    let env = TestEnvironment::new().unwrap();
    env.write_project("appA", CONTEXT7_NPX).unwrap();

    let output =
        mcpsync(&env).arg("discover").arg(env.home()).arg("--format").arg("json").assert().success();
    let rows: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "context7");
    assert_eq!(rows[0]["transport"], "stdio");
    assert_eq!(rows[0]["config"]["command"], "npx");
    assert_eq!(rows[0]["is_duplicate"], false);
}

/// Test that a dry run plans without creating the store
#[test]
fn test_consolidate_dry_run_leaves_store_untouched() {
    let env = TestEnvironment::new().unwrap();
    env.write_project("appA", CONTEXT7_NPX).unwrap();

    mcpsync(&env)
        .arg("consolidate")
        .arg(env.home())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("promote 'context7'"))
        .stdout(predicate::str::contains("Dry run; no changes were made."));

    assert!(!env.store_path().exists());
}

/// Test promoting two colliding project definitions under the rename
/// strategy
#[test]
fn test_consolidate_promotes_and_renames() {
    let env = TestEnvironment::new().unwrap();
    env.write_project(
        "appA",
        r#"{"mcpServers": {"context7": {"type": "http", "url": "https://a.example/mcp"}}}"#,
    )
    .unwrap();
    env.write_project(
        "appB",
        r#"{"mcpServers": {"context7": {"type": "http", "url": "https://b.example/mcp"}}}"#,
    )
    .unwrap();

    mcpsync(&env)
        .arg("consolidate")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("promote 'context7'"))
        .stdout(predicate::str::contains("rename 'context7'"))
        .stdout(predicate::str::contains("context7-appB"))
        .stdout(predicate::str::contains("1 promoted, 0 replaced, 1 renamed, 0 skipped"))
        .stdout(predicate::str::contains("store updated"))
        .stdout(predicate::str::contains("backup at").not());

    let store: Value = serde_json::from_str(&env.read(&env.store_path()).unwrap()).unwrap();
    assert_eq!(store["context7"]["config"]["url"], "https://a.example/mcp");
    assert_eq!(store["context7-appB"]["config"]["url"], "https://b.example/mcp");
}

/// Test that running consolidate twice plans nothing the second time
#[test]
fn test_consolidate_rerun_plans_nothing() {
    let env = TestEnvironment::new().unwrap();
    env.write_project(
        "appA",
        r#"{"mcpServers": {"context7": {"type": "http", "url": "https://a.example/mcp"}}}"#,
    )
    .unwrap();
    env.write_project(
        "appB",
        r#"{"mcpServers": {"context7": {"type": "http", "url": "https://b.example/mcp"}}}"#,
    )
    .unwrap();

    mcpsync(&env).arg("consolidate").arg(env.home()).assert().success();

    mcpsync(&env)
        .arg("consolidate")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("skip 'context7': already consolidated"))
        .stdout(predicate::str::contains("0 promoted, 0 replaced, 0 renamed, 2 skipped"))
        .stdout(predicate::str::contains("Nothing to apply; the store already matches."));
}

/// Test that applying over an existing store writes a backup first
#[test]
fn test_consolidate_backs_up_existing_store() {
    let env = TestEnvironment::new().unwrap();
    mcpsync(&env).args(["add", "linear", "--command", "uvx"]).assert().success();
    env.write_project("appA", CONTEXT7_NPX).unwrap();

    mcpsync(&env)
        .arg("consolidate")
        .arg(env.home())
        .assert()
        .success()
        .stdout(predicate::str::contains("store updated (backup at"));

    let backups = std::fs::read_dir(env.config_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains(".backup-"))
        .count();
    assert!(backups >= 1);
}
