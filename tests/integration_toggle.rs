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

/// Test that disabling removes the server from the client file but keeps
/// the definition in the store
#[test]
fn test_disable_removes_from_client_file_and_keeps_store() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();

    mcpsync(&env)
        .args(["disable", "context7", "--client", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled 'context7' for claude"))
        .stdout(predicate::str::contains("definition kept in the store"));

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(!claude.contains("context7"));

    let store: Value = serde_json::from_str(&env.read(&env.store_path()).unwrap()).unwrap();
    assert_eq!(store["context7"]["config"]["command"], "npx");
    assert_eq!(store["context7"]["disabled_for"], serde_json::json!(["claude"]));
}

/// Test that disabling for one client does not touch the other client files
#[test]
fn test_disable_is_scoped_to_one_client() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();
    let gemini_before = env.read(&env.gemini_path()).unwrap();
    let codex_before = env.read(&env.codex_path()).unwrap();

    mcpsync(&env).args(["disable", "context7", "--client", "claude"]).assert().success();

    assert_eq!(env.read(&env.gemini_path()).unwrap(), gemini_before);
    assert_eq!(env.read(&env.codex_path()).unwrap(), codex_before);
}

/// Test that re-enabling writes back the exact definition that was disabled
#[test]
fn test_reenable_restores_exact_definition() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args([
            "add",
            "context7",
            "--command",
            "npx",
            "--arg",
            "-y",
            "--arg",
            "@upstash/context7-mcp",
            "--env",
            "API_KEY=secret",
        ])
        .assert()
        .success();

    let before: Value = serde_json::from_str(&env.read(&env.claude_path()).unwrap()).unwrap();

    mcpsync(&env).args(["disable", "context7", "--client", "claude"]).assert().success();
    mcpsync(&env)
        .args(["enable", "context7", "--client", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled 'context7' for claude"));

    let after: Value = serde_json::from_str(&env.read(&env.claude_path()).unwrap()).unwrap();
    assert_eq!(after["mcpServers"]["context7"], before["mcpServers"]["context7"]);
}

/// Test that disabling a server the store has never seen adopts its
/// definition from the client file first
#[test]
fn test_disable_adopts_handwritten_definition() {
    let env = TestEnvironment::new().unwrap();
    env.write_claude(r#"{"mcpServers": {"linear": {"command": "uvx", "args": ["linear-mcp"]}}}"#)
        .unwrap();

    mcpsync(&env).args(["disable", "linear", "--client", "claude"]).assert().success();

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(!claude.contains("linear"));

    let store: Value = serde_json::from_str(&env.read(&env.store_path()).unwrap()).unwrap();
    assert_eq!(store["linear"]["config"]["command"], "uvx");
}

/// Test enabling a server nobody knows about
#[test]
fn test_enable_unknown_server_fails() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["enable", "ghost", "--client", "claude"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server 'ghost' not found"));
}

/// Test enable with a misspelled server name suggests the closest match
#[test]
fn test_enable_suggests_closest_name() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();

    mcpsync(&env)
        .args(["enable", "contxt7", "--client", "claude"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server 'contxt7' not found"))
        .stderr(predicate::str::contains("Did you mean 'context7'?"));
}

/// Test toggling against a client that is not registered
#[test]
fn test_toggle_unknown_client_fails() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["disable", "context7", "--client", "cursor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown client 'cursor'"))
        .stderr(predicate::str::contains("claude, gemini, codex"));
}
