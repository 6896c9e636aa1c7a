//! Supplementary content table
//!
//! Hand-curated records keyed by canonical slug, loaded once at startup
//! from JSON:
//!
//! ```json
//! { "787-9": { "title": "Boeing 787-9", "summary": "...", "fields": { "range_km": 14010 } } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use aerodex_common::{Error, Result};

/// One supplementary content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// Read-only mapping from canonical key to content record
#[derive(Debug, Clone, Default)]
pub struct ContentTable {
    entries: HashMap<String, ContentRecord>,
}

impl ContentTable {
    /// Build a table, rejecting keys that are not canonical slugs
    pub fn new(entries: HashMap<String, ContentRecord>) -> Result<Self> {
        if let Some(bad) = entries.keys().find(|k| !is_canonical(k)) {
            return Err(Error::InvalidInput(format!(
                "content key is not a canonical slug: {:?}",
                bad
            )));
        }
        Ok(Self { entries })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&json)?;
        info!(entries = table.len(), "Loaded content table from {}", path.display());
        Ok(table)
    }

    pub fn get(&self, key: &str) -> Option<&ContentRecord> {
        self.entries.get(key)
    }

    /// Entry together with the table's own copy of the key
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &ContentRecord)> {
        self.entries
            .get_key_value(key)
            .map(|(k, record)| (k.as_str(), record))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase `[a-z0-9-]`, non-empty
pub fn is_canonical(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "a330-900": { "title": "Airbus A330-900", "fields": { "seats": 287 } },
        "787-9": { "title": "Boeing 787-9", "summary": "Stretched 787" }
    }"#;

    #[test]
    fn test_parse_sample() {
        let table = ContentTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("787-9").unwrap().summary.as_deref(), Some("Stretched 787"));
        assert_eq!(table.get("a330-900").unwrap().fields["seats"], 287);
        assert!(table.get("a330-900neo").is_none());
    }

    #[test]
    fn test_rejects_non_canonical_key() {
        let result = ContentTable::from_json_str(r#"{ "A330 900": { "title": "x" } }"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let result = ContentTable::from_json_str(r#"{ "787-9": { "summary": "no title" } }"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let table = ContentTable::load(file.path()).unwrap();
        assert!(table.contains("a330-900"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ContentTable::load(Path::new("/nonexistent/aerodex/content.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("787-9"));
        assert!(!is_canonical(""));
        assert!(!is_canonical("A350"));
        assert!(!is_canonical("a350_900"));
    }
}
