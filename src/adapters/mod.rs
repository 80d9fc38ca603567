//! Format adapters translating between [`ServerRecord`]s and client
//! configuration documents.
//!
//! Each client speaks one of two on-disk syntaxes: a JSON document with an
//! `mcpServers` map (claude, gemini) or a TOML document with
//! `[mcp_servers.<name>]` tables (codex). An adapter knows how to read the
//! server entries out of such a document and how to write a new server set
//! back into it without disturbing unrelated content, which matters because
//! these files also hold the client's own settings.
//!
//! # Document Preservation
//!
//! `serialize` is a read-modify-write operation on the document level:
//!
//! - Unrelated top-level keys and sections survive untouched
//! - Entries that already exist are updated in place, so unknown
//!   client-specific keys on an entry survive a rewrite
//! - TOML comments and formatting outside the managed tables survive,
//!   courtesy of `toml_edit`
//!
//! # Round-Trip Law
//!
//! For any adapter `a` and valid record set `rs`:
//! `a.parse(&a.serialize(rs, existing)?)? == rs` up to entry ordering. Both
//! shipped formats express both transport variants, so `check` never
//! refuses a record today; a format that cannot express a variant reports
//! it as an unsupported-variant error instead of writing a lossy entry.
//!
//! # Examples
//!
//! ```rust
//! use mcpsync_cli::adapters::adapter_for;
//! use mcpsync_cli::server::ConfigFormat;
//!
//! # fn example() -> anyhow::Result<()> {
//! let adapter = adapter_for(ConfigFormat::Json);
//! let records = adapter.parse(r#"{"mcpServers": {"context7": {"command": "npx"}}}"#)?;
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;

use crate::server::{ConfigFormat, ServerRecord};

pub mod json;
pub mod toml;

pub use json::JsonAdapter;
pub use toml::TomlAdapter;

/// The entry keys managed by this crate. Everything else on an entry is
/// client-specific and preserved as-is.
pub(crate) const MANAGED_KEYS: [&str; 7] =
    ["command", "args", "env", "type", "url", "headers", "enabled"];

/// Translates between server records and one document syntax.
pub trait FormatAdapter: Send + Sync {
    /// Short format name used in error messages.
    fn format_name(&self) -> &'static str;

    /// Extracts all server records from a document.
    ///
    /// A missing server section and an empty document both read as an empty
    /// set. Unknown keys on individual entries are tolerated.
    ///
    /// # Errors
    ///
    /// Returns a format error for unparseable documents and a validation
    /// error naming the entry for entries that are neither transport
    /// variant.
    fn parse(&self, content: &str) -> Result<Vec<ServerRecord>>;

    /// Writes a server set into a document, replacing the managed section
    /// and preserving everything else.
    ///
    /// `existing` is the current document content, if the file exists.
    /// Entries absent from `records` are removed from the document.
    ///
    /// # Errors
    ///
    /// Returns a format error if the existing document cannot be parsed,
    /// or an unsupported-variant error if a record cannot be expressed.
    fn serialize(&self, records: &[ServerRecord], existing: Option<&str>) -> Result<String>;

    /// Verifies that this format can express a record without loss.
    ///
    /// # Errors
    ///
    /// Returns an unsupported-variant error naming the record and format.
    fn check(&self, record: &ServerRecord) -> Result<()>;
}

/// Returns the adapter for a configuration format.
#[must_use]
pub fn adapter_for(format: ConfigFormat) -> &'static dyn FormatAdapter {
    match format {
        ConfigFormat::Json => &JsonAdapter,
        ConfigFormat::Toml => &TomlAdapter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::TransportKind;
    use std::collections::BTreeMap;

    fn stdio_record(name: &str) -> ServerRecord {
        ServerRecord::new(
            name,
            TransportKind::Stdio {
                command: "npx".to_string(),
                args: vec!["-y".to_string(), format!("@example/{name}")],
                env: BTreeMap::new(),
            },
        )
        .unwrap()
    }

    fn http_record(name: &str) -> ServerRecord {
        ServerRecord::new(
            name,
            TransportKind::Http {
                url: format!("https://{name}.example.com/mcp"),
                headers: BTreeMap::from([("Authorization".to_string(), "Bearer x".to_string())]),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_adapter_for_dispatch() {
        assert_eq!(adapter_for(ConfigFormat::Json).format_name(), "json");
        assert_eq!(adapter_for(ConfigFormat::Toml).format_name(), "toml");
    }

    #[test]
    fn test_both_formats_express_both_variants() {
        for format in [ConfigFormat::Json, ConfigFormat::Toml] {
            let adapter = adapter_for(format);
            adapter.check(&stdio_record("context7")).unwrap();
            adapter.check(&http_record("linear")).unwrap();
        }
    }

    #[test]
    fn test_round_trip_across_formats() {
        let records = vec![stdio_record("context7"), http_record("linear")];

        for format in [ConfigFormat::Json, ConfigFormat::Toml] {
            let adapter = adapter_for(format);
            let document = adapter.serialize(&records, None).unwrap();
            let reparsed = adapter.parse(&document).unwrap();
            assert_eq!(reparsed, records, "{format} round trip");
        }
    }
}
