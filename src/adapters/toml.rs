//! Adapter for TOML client configurations (codex).
//!
//! Codex keeps its servers as `[mcp_servers.<name>]` tables inside
//! `config.toml`, alongside model and sandbox settings that must not be
//! disturbed. Parsing goes through the `toml` crate; writing goes through
//! `toml_edit` so comments and formatting in the rest of the document
//! survive a rewrite.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table, TableLike, value};

use super::{FormatAdapter, MANAGED_KEYS};
use crate::core::McpSyncError;
use crate::server::{RawServerEntry, ServerRecord};

/// Adapter for `[mcp_servers.<name>]` TOML documents.
pub struct TomlAdapter;

impl TomlAdapter {
    fn format_error(reason: impl Into<String>) -> anyhow::Error {
        McpSyncError::Format { format: "toml".to_string(), reason: reason.into() }.into()
    }
}

impl FormatAdapter for TomlAdapter {
    fn format_name(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, content: &str) -> Result<Vec<ServerRecord>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut tbl: toml::Table =
            content.parse::<toml::Table>().map_err(|e| Self::format_error(e.to_string()))?;
        let servers = match tbl.remove("mcp_servers") {
            Some(toml::Value::Table(servers)) => servers,
            Some(other) => {
                return Err(Self::format_error(format!(
                    "mcp_servers must be a table, found {}",
                    other.type_str()
                )));
            }
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(servers.len());
        for (name, entry) in servers {
            let toml::Value::Table(entry) = entry else {
                return Err(McpSyncError::Validation {
                    name,
                    reason: "server entry must be a table".to_string(),
                }
                .into());
            };
            let raw: RawServerEntry = entry.try_into().map_err(|e| McpSyncError::Validation {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            records.push(ServerRecord::from_raw(name, raw)?);
        }
        Ok(records)
    }

    fn serialize(&self, records: &[ServerRecord], existing: Option<&str>) -> Result<String> {
        for record in records {
            self.check(record)?;
        }

        let mut doc = match existing {
            Some(content) => {
                content.parse::<DocumentMut>().map_err(|e| Self::format_error(e.to_string()))?
            }
            None => DocumentMut::new(),
        };

        if records.is_empty() {
            let _ = doc.remove("mcp_servers");
            return Ok(doc.to_string());
        }

        if !doc.contains_key("mcp_servers") {
            let mut table = Table::new();
            table.set_implicit(true);
            doc.insert("mcp_servers", Item::Table(table));
        }
        let Some(parent) = doc.get_mut("mcp_servers").and_then(Item::as_table_like_mut) else {
            return Err(Self::format_error("mcp_servers must be a table"));
        };

        let keep: BTreeSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let stale: Vec<String> = parent
            .iter()
            .map(|(key, _)| key.to_string())
            .filter(|key| !keep.contains(key.as_str()))
            .collect();
        for key in stale {
            tracing::debug!("removing server '{key}' from toml document");
            parent.remove(&key);
        }

        for record in records {
            let raw = record.to_raw();
            match parent.get_mut(&record.name).and_then(Item::as_table_like_mut) {
                // Update in place so unknown client-specific keys survive
                Some(entry) => apply_entry(entry, &raw),
                None => {
                    let mut table = Table::new();
                    apply_entry(&mut table, &raw);
                    parent.insert(&record.name, Item::Table(table));
                }
            }
        }

        Ok(doc.to_string())
    }

    fn check(&self, record: &ServerRecord) -> Result<()> {
        // Both transport variants are expressible in this format
        let _ = record;
        Ok(())
    }
}

/// Rewrites the managed keys of one entry table, leaving every other key
/// in place.
fn apply_entry(entry: &mut dyn TableLike, raw: &RawServerEntry) {
    for key in MANAGED_KEYS {
        entry.remove(key);
    }

    if let Some(command) = &raw.command {
        entry.insert("command", value(command.as_str()));
    }
    if !raw.args.is_empty() {
        let mut args = Array::new();
        for arg in &raw.args {
            args.push(arg.as_str());
        }
        entry.insert("args", value(args));
    }
    if let Some(env) = &raw.env
        && !env.is_empty()
    {
        entry.insert("env", value(inline_string_table(env)));
    }
    if let Some(transport_type) = &raw.transport_type {
        entry.insert("type", value(transport_type.as_str()));
    }
    if let Some(url) = &raw.url {
        entry.insert("url", value(url.as_str()));
    }
    if let Some(headers) = &raw.headers
        && !headers.is_empty()
    {
        entry.insert("headers", value(inline_string_table(headers)));
    }
    if let Some(enabled) = raw.enabled {
        entry.insert("enabled", value(enabled));
    }
}

fn inline_string_table(map: &BTreeMap<String, String>) -> InlineTable {
    let mut table = InlineTable::new();
    for (key, val) in map {
        table.insert(key.as_str(), val.as_str().into());
    }
    table
}
