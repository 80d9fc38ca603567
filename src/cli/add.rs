//! Add command implementation.
//!
//! Registers a server in the enablement store and writes it into the
//! chosen client files. The transport is built from the flags: `--command`
//! (with `--arg`/`--env`) for a stdio server, `--url` (with `--header`)
//! for an HTTP server.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::server::{ClientKind, ServerRecord, TransportKind};

/// Command to register a new MCP server.
///
/// # Examples
///
/// ```bash
/// # A stdio server for every client
/// mcpsync add context7 --command npx --arg -y --arg @upstash/context7-mcp
///
/// # A remote server for Claude only
/// mcpsync add search --url https://mcp.example.com/sse \
///     --header "Authorization=Bearer TOKEN" --client claude
/// ```
#[derive(Debug, Parser)]
pub struct AddCommand {
    /// Server name (letters, digits, `.`, `_`, `-`)
    name: String,

    /// Command launching a stdio server
    #[arg(long, conflicts_with = "url")]
    command: Option<String>,

    /// Argument passed to the command (repeatable, in order)
    #[arg(long = "arg", value_name = "ARG", requires = "command")]
    args: Vec<String>,

    /// Environment variable for the server process (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", requires = "command")]
    env: Vec<String>,

    /// URL of an HTTP server
    #[arg(long)]
    url: Option<String>,

    /// HTTP header sent with each request (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE", requires = "url")]
    headers: Vec<String>,

    /// Client to add the server to (repeatable; default: all registered)
    #[arg(long = "client", value_name = "CLIENT")]
    clients: Vec<String>,
}

impl AddCommand {
    /// Execute the add command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let mut manager = super::build_manager(store_path)?;

        let transport = match (&self.command, &self.url) {
            (Some(command), None) => TransportKind::Stdio {
                command: command.clone(),
                args: self.args.clone(),
                env: parse_pairs(&self.env, "--env")?,
            },
            (None, Some(url)) => TransportKind::Http {
                url: url.clone(),
                headers: parse_pairs(&self.headers, "--header")?,
            },
            _ => bail!("provide --command for a stdio server or --url for an HTTP server"),
        };
        let record = ServerRecord::new(self.name.clone(), transport)?;

        let targets: BTreeSet<ClientKind> = if self.clients.is_empty() {
            manager.registry().kinds().cloned().collect()
        } else {
            self.clients
                .iter()
                .map(|name| manager.registry().parse_kind(name))
                .collect::<Result<_>>()?
        };

        manager.add(&record, &targets)?;

        let clients = targets.iter().map(ClientKind::as_str).collect::<Vec<_>>().join(", ");
        println!(
            "{} added '{}' ({}) for {clients}",
            "✓".green(),
            record.name,
            record.transport.label()
        );
        Ok(())
    }
}

/// Parses repeated `KEY=VALUE` flag values into a map.
fn parse_pairs(pairs: &[String], flag: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid {flag} '{pair}': expected KEY=VALUE");
        };
        if key.is_empty() {
            bail!("invalid {flag} '{pair}': key must not be empty");
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stdio_flags() {
        let cmd = AddCommand::try_parse_from([
            "add", "context7", "--command", "npx", "--arg", "-y", "--arg", "pkg", "--env",
            "TOKEN=abc",
        ])
        .unwrap();
        assert_eq!(cmd.name, "context7");
        assert_eq!(cmd.command.as_deref(), Some("npx"));
        assert_eq!(cmd.args, vec!["-y", "pkg"]);
        assert_eq!(cmd.env, vec!["TOKEN=abc"]);
    }

    #[test]
    fn test_command_conflicts_with_url() {
        let result = AddCommand::try_parse_from([
            "add", "x", "--command", "npx", "--url", "https://example.com",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_header_requires_url() {
        let result = AddCommand::try_parse_from(["add", "x", "--header", "A=b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_requires_command() {
        let result =
            AddCommand::try_parse_from(["add", "x", "--url", "https://e.com", "--env", "A=b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = vec!["A=1".to_string(), "B=two=parts".to_string()];
        let map = parse_pairs(&pairs, "--env").unwrap();
        assert_eq!(map["A"], "1");
        assert_eq!(map["B"], "two=parts");
    }

    #[test]
    fn test_parse_pairs_rejects_missing_separator() {
        let pairs = vec!["NOEQUALS".to_string()];
        assert!(parse_pairs(&pairs, "--env").is_err());

        let empty_key = vec!["=value".to_string()];
        assert!(parse_pairs(&empty_key, "--header").is_err());
    }
}
