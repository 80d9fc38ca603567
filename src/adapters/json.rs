//! Adapter for JSON client configurations (claude, gemini).
//!
//! Both clients keep their servers under a top-level `mcpServers` key inside
//! a larger settings document. Project-level `.mcp.json` files use the same
//! wrapped shape. A document that consists of nothing but server entries
//! (some tools write that) is also accepted and written back in the same
//! bare form.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{FormatAdapter, MANAGED_KEYS};
use crate::core::McpSyncError;
use crate::server::ServerRecord;

/// Adapter for `mcpServers` JSON documents.
pub struct JsonAdapter;

impl JsonAdapter {
    fn format_error(reason: impl Into<String>) -> anyhow::Error {
        McpSyncError::Format { format: "json".to_string(), reason: reason.into() }.into()
    }
}

/// A top-level object with no `mcpServers` key is treated as a bare server
/// map when every value is an object and at least one looks like a server
/// entry. This keeps settings documents that merely lack the key reading
/// as empty.
fn is_bare_server_map(root: &Map<String, Value>) -> bool {
    !root.is_empty()
        && root.values().all(Value::is_object)
        && root.values().any(|v| {
            v.as_object().is_some_and(|entry| {
                entry.contains_key("command") || entry.contains_key("url") || entry.contains_key("type")
            })
        })
}

impl FormatAdapter for JsonAdapter {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<Vec<ServerRecord>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let doc: Value =
            serde_json::from_str(content).map_err(|e| Self::format_error(e.to_string()))?;
        let Value::Object(root) = doc else {
            return Err(Self::format_error("top-level value must be an object"));
        };

        let servers = if let Some(section) = root.get("mcpServers") {
            match section {
                Value::Object(map) => map.clone(),
                _ => return Err(Self::format_error("mcpServers must be an object")),
            }
        } else if is_bare_server_map(&root) {
            root
        } else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(servers.len());
        for (name, value) in servers {
            if !value.is_object() {
                return Err(McpSyncError::Validation {
                    name,
                    reason: "server entry must be an object".to_string(),
                }
                .into());
            }
            let raw = serde_json::from_value(value).map_err(|e| McpSyncError::Validation {
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

        let mut root = match existing {
            Some(content) if !content.trim().is_empty() => {
                let doc: Value =
                    serde_json::from_str(content).map_err(|e| Self::format_error(e.to_string()))?;
                match doc {
                    Value::Object(root) => root,
                    _ => return Err(Self::format_error("top-level value must be an object")),
                }
            }
            _ => Map::new(),
        };

        let had_key = root.contains_key("mcpServers");
        let bare = !had_key && is_bare_server_map(&root);

        let mut previous = if bare {
            std::mem::take(&mut root)
        } else {
            match root.remove("mcpServers") {
                Some(Value::Object(map)) => map,
                Some(_) => return Err(Self::format_error("mcpServers must be an object")),
                None => Map::new(),
            }
        };

        let mut updated = Map::new();
        for record in records {
            let Value::Object(fields) = serde_json::to_value(record.to_raw())? else {
                return Err(Self::format_error("server entry did not serialize as an object"));
            };

            let entry = match previous.remove(&record.name) {
                // Update in place so unknown client-specific keys survive
                Some(Value::Object(mut prev)) => {
                    for key in MANAGED_KEYS {
                        prev.remove(key);
                    }
                    prev.extend(fields);
                    Value::Object(prev)
                }
                _ => Value::Object(fields),
            };
            updated.insert(record.name.clone(), entry);
        }

        for dropped in previous.keys() {
            tracing::debug!("removing server '{dropped}' from json document");
        }

        let output = if bare {
            Value::Object(updated)
        } else {
            if had_key || !updated.is_empty() {
                root.insert("mcpServers".to_string(), Value::Object(updated));
            }
            Value::Object(root)
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn check(&self, record: &ServerRecord) -> Result<()> {
        // Both transport variants are expressible in this format
        let _ = record;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::TransportKind;
    use std::collections::BTreeMap;

    fn record(name: &str, command: &str) -> ServerRecord {
        ServerRecord::new(
            name,
            TransportKind::Stdio {
                command: command.to_string(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_parse_wrapped_document() {
        let records = JsonAdapter
            .parse(
                r#"{
                    "mcpServers": {
                        "context7": {"command": "npx", "args": ["-y", "@upstash/context7-mcp"]},
                        "linear": {"type": "http", "url": "https://mcp.linear.app/mcp"}
                    },
                    "theme": "dark"
                }"#,
            )
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "context7");
        assert_eq!(records[1].name, "linear");
    }

    #[test]
    fn test_parse_bare_map() {
        let records = JsonAdapter
            .parse(r#"{"context7": {"command": "npx"}, "fetch": {"command": "uvx"}}"#)
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_missing_key_is_empty() {
        // A settings document with no mcpServers key has no servers
        let records =
            JsonAdapter.parse(r#"{"theme": "dark", "editor": {"fontSize": 14}}"#).unwrap();
        assert!(records.is_empty());

        assert!(JsonAdapter.parse("{}").unwrap().is_empty());
        assert!(JsonAdapter.parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_json_is_format_error() {
        let err = JsonAdapter.parse("{not json").unwrap_err();
        match err.downcast::<McpSyncError>().unwrap() {
            McpSyncError::Format { format, .. } => assert_eq!(format, "json"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_object_entry_is_validation_error() {
        let err = JsonAdapter.parse(r#"{"mcpServers": {"bad": "nope"}}"#).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_serialize_fresh_document() {
        let output = JsonAdapter.serialize(&[record("context7", "npx")], None).unwrap();
        let doc: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(doc["mcpServers"]["context7"]["command"], "npx");
    }

    #[test]
    fn test_serialize_preserves_unrelated_keys() {
        let existing = r#"{
            "mcpServers": {"old": {"command": "stale"}},
            "hooks": {"preToolUse": []},
            "permissions": {"allow": ["Bash"]}
        }"#;

        let output = JsonAdapter.serialize(&[record("context7", "npx")], Some(existing)).unwrap();
        let doc: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(doc["hooks"]["preToolUse"], serde_json::json!([]));
        assert_eq!(doc["permissions"]["allow"][0], "Bash");
        assert!(doc["mcpServers"].get("old").is_none());
        assert_eq!(doc["mcpServers"]["context7"]["command"], "npx");
    }

    #[test]
    fn test_serialize_updates_entry_in_place() {
        // The cwd key is client-specific and must survive the rewrite
        let existing = r#"{
            "mcpServers": {
                "context7": {"command": "old-cmd", "url": "https://stale.example", "cwd": "/srv"}
            }
        }"#;

        let output = JsonAdapter.serialize(&[record("context7", "npx")], Some(existing)).unwrap();
        let doc: Value = serde_json::from_str(&output).unwrap();
        let entry = &doc["mcpServers"]["context7"];

        assert_eq!(entry["command"], "npx");
        assert_eq!(entry["cwd"], "/srv");
        // Stale http fields from the replaced definition are gone
        assert!(entry.get("url").is_none());
    }

    #[test]
    fn test_serialize_bare_map_stays_bare() {
        let existing = r#"{"context7": {"command": "npx"}}"#;
        let output = JsonAdapter
            .serialize(&[record("context7", "npx"), record("fetch", "uvx")], Some(existing))
            .unwrap();

        let doc: Value = serde_json::from_str(&output).unwrap();
        assert!(doc.get("mcpServers").is_none());
        assert_eq!(doc["fetch"]["command"], "uvx");
    }

    #[test]
    fn test_serialize_empty_set_keeps_existing_key() {
        let existing = r#"{"mcpServers": {"old": {"command": "x"}}, "theme": "dark"}"#;
        let output = JsonAdapter.serialize(&[], Some(existing)).unwrap();
        let doc: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(doc["theme"], "dark");
        assert_eq!(doc["mcpServers"], serde_json::json!({}));
    }

    #[test]
    fn test_serialize_empty_set_without_key_adds_nothing() {
        let output = JsonAdapter.serialize(&[], Some(r#"{"theme": "dark"}"#)).unwrap();
        let doc: Value = serde_json::from_str(&output).unwrap();
        assert!(doc.get("mcpServers").is_none());
    }

    #[test]
    fn test_parse_serialize_round_trip() {
        let original = r#"{
            "mcpServers": {
                "context7": {"command": "npx", "args": ["-y"], "env": {"TOKEN": "t"}},
                "linear": {"type": "http", "url": "https://mcp.linear.app/mcp", "headers": {"Authorization": "Bearer x"}}
            }
        }"#;

        let records = JsonAdapter.parse(original).unwrap();
        let output = JsonAdapter.serialize(&records, Some(original)).unwrap();
        let reparsed = JsonAdapter.parse(&output).unwrap();
        assert_eq!(records, reparsed);
    }
}
