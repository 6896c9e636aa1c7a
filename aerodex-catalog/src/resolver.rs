//! Identity resolver: display name → content table entry
//!
//! Catalog names arrive in several historical conventions (with or without
//! the manufacturer prefix, with or without the generation suffix), while
//! the content table was curated against one of them. The resolver derives
//! an ordered set of candidate keys from the name and returns the first one
//! present in the table. Every candidate is an exact lookup.
//!
//! Candidate order, each a pure relaxation of the normalized name:
//! 1. manufacturer prefix and generation suffix removed
//! 2. manufacturer prefix removed
//! 3. normalized name as-is
//! 4. digits and hyphens only
//!
//! Duplicates are dropped, keeping the first position.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::content::{ContentRecord, ContentTable};

/// Leading manufacturer tokens removed by the prefix relaxation
pub const DEFAULT_MANUFACTURERS: &[&str] = &[
    "airbus",
    "boeing",
    "embraer",
    "bombardier",
    "atr",
    "comac",
    "mcdonnell-douglas",
    "de-havilland",
    "sukhoi",
    "mitsubishi",
    "cessna",
    "lockheed",
];

/// Trailing tokens removed by the suffix relaxation
pub const GENERATION_SUFFIXES: &[&str] = &["neo", "ceo", "dreamliner"];

/// Lowercase hyphenated slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free candidate keys, highest priority first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKeySet(Vec<CanonicalKey>);

impl CandidateKeySet {
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_strs(&self) -> Vec<&str> {
        self.0.iter().map(CanonicalKey::as_str).collect()
    }
}

/// A successful resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub key: &'a str,
    pub record: &'a ContentRecord,
}

type Relaxation = fn(&IdentityResolver, &str) -> String;

/// Candidate rules in priority order
const RELAXATIONS: &[(&str, Relaxation)] = &[
    ("prefix+suffix", without_prefix_and_suffix),
    ("prefix", without_prefix),
    ("verbatim", verbatim),
    ("digits", digits_only),
];

/// `boeing-787-9-dreamliner` → `787-9`
fn without_prefix_and_suffix(resolver: &IdentityResolver, base: &str) -> String {
    strip_suffix(&resolver.strip_manufacturer(base))
}

/// `boeing-787-9-dreamliner` → `787-9-dreamliner`
fn without_prefix(resolver: &IdentityResolver, base: &str) -> String {
    resolver.strip_manufacturer(base)
}

fn verbatim(_: &IdentityResolver, base: &str) -> String {
    base.to_string()
}

/// `b737-800` → `737-800`; coarse, so it runs last
fn digits_only(_: &IdentityResolver, base: &str) -> String {
    let kept: String = base
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    tidy_hyphens(&kept)
}

/// Resolves display names against a shared content table
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    table: Arc<ContentTable>,
    manufacturers: Vec<String>,
}

impl IdentityResolver {
    pub fn new(table: Arc<ContentTable>) -> Self {
        Self::with_manufacturers(table, DEFAULT_MANUFACTURERS.iter().copied())
    }

    /// Use a custom manufacturer token list (names are normalized here)
    pub fn with_manufacturers<I, N>(table: Arc<ContentTable>, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut manufacturers: Vec<String> = names
            .into_iter()
            .map(|n| normalize(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        // longest first so "de-havilland-canada" wins over "de-havilland"
        manufacturers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        manufacturers.dedup();
        Self {
            table,
            manufacturers,
        }
    }

    pub fn table(&self) -> &ContentTable {
        &self.table
    }

    /// Ordered candidate keys for `raw_name`
    pub fn candidates(&self, raw_name: &str) -> CandidateKeySet {
        let base = normalize(raw_name);
        let mut keys: Vec<CanonicalKey> = Vec::with_capacity(RELAXATIONS.len());

        for (rule, relax) in RELAXATIONS {
            let candidate = relax(self, &base);
            if candidate.is_empty() || keys.iter().any(|k| k.0 == candidate) {
                continue;
            }
            trace!(rule, candidate = %candidate, "Candidate key");
            keys.push(CanonicalKey(candidate));
        }

        CandidateKeySet(keys)
    }

    /// First table entry matching a candidate of `raw_name`
    ///
    /// `None` means no supplementary content exists for this name; it is not
    /// an error.
    pub fn resolve(&self, raw_name: &str) -> Option<Resolved<'_>> {
        let candidates = self.candidates(raw_name);
        for candidate in candidates.iter() {
            if let Some((key, record)) = self.table.get_key_value(candidate.as_str()) {
                debug!(raw_name, key, "Resolved content key");
                return Some(Resolved { key, record });
            }
        }
        debug!(raw_name, candidates = ?candidates.as_strs(), "No content for name");
        None
    }

    fn strip_manufacturer(&self, base: &str) -> String {
        for token in &self.manufacturers {
            if let Some(rest) = base.strip_prefix(token.as_str()) {
                if let Some(rest) = rest.strip_prefix('-') {
                    return tidy_hyphens(rest);
                }
            }
        }
        base.to_string()
    }
}

/// Lowercase, collapse whitespace runs to one hyphen, drop anything outside `[a-z0-9-]`
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

fn strip_suffix(key: &str) -> String {
    for suffix in GENERATION_SUFFIXES {
        if let Some(rest) = key.strip_suffix(suffix) {
            return tidy_hyphens(rest);
        }
    }
    key.to_string()
}

/// Collapse hyphen runs and trim hyphens at either end
fn tidy_hyphens(key: &str) -> String {
    key.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(title: &str) -> ContentRecord {
        ContentRecord {
            title: title.to_string(),
            summary: None,
            fields: Default::default(),
        }
    }

    fn resolver(keys: &[&str]) -> IdentityResolver {
        let entries: HashMap<String, ContentRecord> = keys
            .iter()
            .map(|k| (k.to_string(), record(k)))
            .collect();
        IdentityResolver::new(Arc::new(ContentTable::new(entries).unwrap()))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Boeing 787-9 Dreamliner"), "boeing-787-9-dreamliner");
        assert_eq!(normalize("  Airbus \t A350 (XWB) "), "airbus-a350-xwb");
        assert_eq!(normalize("ATR 72-600"), "atr-72-600");
        assert_eq!(normalize("Embraer E195-E2™"), "embraer-e195-e2");
    }

    #[test]
    fn test_candidate_order_with_suffix_only() {
        let r = resolver(&[]);
        assert_eq!(
            r.candidates("A330-900neo").as_strs(),
            vec!["a330-900", "a330-900neo", "330-900"]
        );
    }

    #[test]
    fn test_candidate_order_with_prefix_and_suffix() {
        let r = resolver(&[]);
        assert_eq!(
            r.candidates("Boeing 787-9 Dreamliner").as_strs(),
            vec!["787-9", "787-9-dreamliner", "boeing-787-9-dreamliner"]
        );
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let r = resolver(&[]);
        // no prefix, no suffix: three rules collapse into one
        assert_eq!(r.candidates("737").as_strs(), vec!["737"]);
        assert!(r.candidates("   ").is_empty());
    }

    #[test]
    fn test_prefix_and_suffix_match_wins() {
        let r = resolver(&["787-9", "boeing-787-9-dreamliner"]);
        let resolved = r.resolve("Boeing 787-9 Dreamliner").unwrap();
        assert_eq!(resolved.key, "787-9");
    }

    #[test]
    fn test_suffix_relaxation_match() {
        let r = resolver(&["a330-900"]);
        assert_eq!(r.resolve("A330-900neo").unwrap().key, "a330-900");
    }

    #[test]
    fn test_verbatim_match_when_table_keeps_prefix() {
        let r = resolver(&["atr-72-600"]);
        assert_eq!(r.resolve("ATR 72-600").unwrap().key, "atr-72-600");
    }

    #[test]
    fn test_coarse_digits_match_is_last_resort() {
        let r = resolver(&["737-800"]);
        assert_eq!(r.resolve("B737-800").unwrap().key, "737-800");
    }

    #[test]
    fn test_prefix_requires_token_boundary() {
        let r = resolver(&[]);
        // "atr" must not be stripped from "atrium"
        assert_eq!(r.candidates("Atrium 1").as_strs(), vec!["atrium-1", "1"]);
    }

    #[test]
    fn test_not_found() {
        let r = resolver(&["a320"]);
        assert!(r.resolve("Concorde").is_none());
    }

    #[test]
    fn test_custom_manufacturers() {
        let table = Arc::new(ContentTable::new(
            [("q400".to_string(), record("Dash 8"))].into_iter().collect(),
        )
        .unwrap());
        let r = IdentityResolver::with_manufacturers(table, ["De Havilland Canada"]);
        assert_eq!(r.resolve("De Havilland Canada Q400").unwrap().key, "q400");
    }
}
