use assert_cmd::Command;
use predicates::prelude::*;

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

/// Test adding a stdio server for every client
#[test]
fn test_add_stdio_server_all_clients() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["add", "context7", "--command", "npx", "--arg", "-y", "--arg", "pkg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added 'context7'"))
        .stdout(predicate::str::contains("claude, codex, gemini"));

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(claude.contains("\"context7\""));
    assert!(claude.contains("\"command\": \"npx\""));

    let codex = env.read(&env.codex_path()).unwrap();
    assert!(codex.contains("[mcp_servers.context7]"));
    assert!(codex.contains("command = \"npx\""));

    let store = env.read(&env.store_path()).unwrap();
    assert!(store.contains("context7"));
}

/// Test adding an HTTP server for a single client
#[test]
fn test_add_http_server_single_client() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args([
            "add",
            "search",
            "--url",
            "https://mcp.example.com/sse",
            "--header",
            "Authorization=Bearer token",
            "--client",
            "claude",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("added 'search' (http) for claude"));

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(claude.contains("https://mcp.example.com/sse"));

    // Non-target clients get no file
    assert!(!env.gemini_path().exists());
    assert!(!env.codex_path().exists());
}

/// Test that a server cannot be both stdio and http
#[test]
fn test_add_rejects_conflicting_transports() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["add", "x", "--command", "npx", "--url", "https://e.com"])
        .assert()
        .failure();
}

/// Test adding with an invalid server name
#[test]
fn test_add_rejects_invalid_name() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["add", "bad name!", "--command", "npx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad name!"));
}

/// Test adding for an unregistered client
#[test]
fn test_add_unknown_client() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env)
        .args(["add", "ctx", "--command", "npx", "--client", "cursor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown client 'cursor'"))
        .stderr(predicate::str::contains("Known clients are: claude, gemini, codex"));
}

/// Test removing a server from every client drops the store entry
#[test]
fn test_remove_everywhere() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();

    mcpsync(&env)
        .args(["remove", "context7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 'context7'"))
        .stdout(predicate::str::contains("store entry dropped"));

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(!claude.contains("context7"));
    let store = env.read(&env.store_path()).unwrap();
    assert!(!store.contains("context7"));
}

/// Test removing from a single client keeps the stored definition
#[test]
fn test_remove_single_client_keeps_definition() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();

    mcpsync(&env)
        .args(["remove", "context7", "--client", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 'context7' from claude"))
        .stdout(predicate::str::contains("definition kept in the store"));

    let claude = env.read(&env.claude_path()).unwrap();
    assert!(!claude.contains("context7"));

    // Other clients and the store still know the server
    let codex = env.read(&env.codex_path()).unwrap();
    assert!(codex.contains("[mcp_servers.context7]"));
    let store = env.read(&env.store_path()).unwrap();
    assert!(store.contains("context7"));
}

/// Test the typo suggestion when removing an unknown server
#[test]
fn test_remove_unknown_server_suggests_closest() {
    let env = TestEnvironment::new().unwrap();

    mcpsync(&env).args(["add", "context7", "--command", "npx"]).assert().success();

    mcpsync(&env)
        .args(["remove", "contxt7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server 'contxt7' not found"))
        .stderr(predicate::str::contains("Did you mean 'context7'?"));
}
