//! Query state and catalog data types
//!
//! `FilterSet` and `SortSpec` hold exactly what the user entered. `QueryKey`
//! is derived from them after search-term validation and decides whether two
//! states describe the same query.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Catalog identifier for manufacturers and families
pub type Id = i64;

/// Minimum trimmed search length (in characters) sent to the catalog
pub const MIN_SEARCH_LEN: usize = 2;

/// User-entered filter state
///
/// `search_term` is stored verbatim (untrimmed) so it can be echoed back to
/// the input field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    pub manufacturer_id: Option<Id>,
    pub family_id: Option<Id>,
    pub search_term: Option<String>,
    pub only_active: bool,
}

impl FilterSet {
    /// Merge a partial update into this filter set
    ///
    /// Changing the manufacturer without naming a family clears the family,
    /// since a family belongs to exactly one manufacturer.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(manufacturer_id) = patch.manufacturer_id {
            if manufacturer_id != self.manufacturer_id && patch.family_id.is_none() {
                self.family_id = None;
            }
            self.manufacturer_id = manufacturer_id;
        }
        if let Some(family_id) = patch.family_id {
            self.family_id = family_id;
        }
        if let Some(search_term) = patch.search_term {
            self.search_term = search_term;
        }
        if let Some(only_active) = patch.only_active {
            self.only_active = only_active;
        }
    }

    /// Validated form of the stored search term
    pub fn search(&self) -> SearchQuery {
        SearchQuery::from_raw(self.search_term.as_deref())
    }
}

/// Partial filter update
///
/// Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub manufacturer_id: Option<Option<Id>>,
    pub family_id: Option<Option<Id>>,
    pub search_term: Option<Option<String>>,
    pub only_active: Option<bool>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manufacturer(mut self, id: Option<Id>) -> Self {
        self.manufacturer_id = Some(id);
        self
    }

    pub fn family(mut self, id: Option<Id>) -> Self {
        self.family_id = Some(id);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(Some(term.into()));
        self
    }

    pub fn clear_search(mut self) -> Self {
        self.search_term = Some(None);
        self
    }

    pub fn only_active(mut self, only_active: bool) -> Self {
        self.only_active = Some(only_active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Search term after trimming and length validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchQuery {
    /// Empty or absent; the field is left out of the request
    Omitted,
    /// Exactly one character after trimming; the request is suppressed
    TooShort,
    /// Trimmed term of at least `MIN_SEARCH_LEN` characters
    Term(String),
}

impl SearchQuery {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let trimmed = raw.map(str::trim).unwrap_or("");
        match trimmed.chars().count() {
            0 => SearchQuery::Omitted,
            n if n < MIN_SEARCH_LEN => SearchQuery::TooShort,
            _ => SearchQuery::Term(trimmed.to_string()),
        }
    }

    pub fn term(&self) -> Option<&str> {
        match self {
            SearchQuery::Term(term) => Some(term),
            _ => None,
        }
    }
}

/// Sortable catalog fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Manufacturer,
    FirstFlight,
    Capacity,
    Range,
}

impl SortField {
    /// Property name understood by the catalog service
    pub fn api_name(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Manufacturer => "manufacturer",
            SortField::FirstFlight => "firstFlight",
            SortField::Capacity => "passengerCapacity",
            SortField::Range => "rangeKm",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "manufacturer" => Ok(SortField::Manufacturer),
            "first_flight" | "firstflight" => Ok(SortField::FirstFlight),
            "capacity" | "passengers" => Ok(SortField::Capacity),
            "range" => Ok(SortField::Range),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort order, defaults to name ascending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// `field,direction` form used in the catalog `sort` parameter
    pub fn to_query_param(self) -> String {
        format!("{},{}", self.field.api_name(), self.direction.as_str())
    }
}

/// Parses `field` or `field:asc|desc`
impl FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field, Some(direction)),
            None => (s, None),
        };
        let direction = match direction.map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(format!("unknown sort direction: {}", other)),
        };
        Ok(Self::new(field.parse()?, direction))
    }
}

/// Identity of one query
///
/// Two controller states issue the same request exactly when their keys are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub manufacturer_id: Option<Id>,
    pub family_id: Option<Id>,
    pub search: SearchQuery,
    pub only_active: bool,
    pub sort: SortSpec,
}

impl QueryKey {
    pub fn new(filters: &FilterSet, sort: SortSpec) -> Self {
        Self {
            manufacturer_id: filters.manufacturer_id,
            family_id: filters.family_id,
            search: filters.search(),
            only_active: filters.only_active,
            sort,
        }
    }

    /// Whether the search gate blocks requests for this key
    pub fn is_suppressed(&self) -> bool {
        self.search == SearchQuery::TooShort
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "manufacturer={:?} family={:?} search={:?} only_active={} sort={}",
            self.manufacturer_id,
            self.family_id,
            self.search.term(),
            self.only_active,
            self.sort.to_query_param()
        )
    }
}

/// One catalog entity
///
/// The shape is owned by the catalog service; only the `id` field is relied
/// upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Stable identity as a string, whether the service sends a number or a string
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Display name, if the entity carries one
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .or_else(|| self.0.get("model"))
            .and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// One page of catalog results
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Entity>,
    pub total_elements: u64,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_validation() {
        assert_eq!(SearchQuery::from_raw(None), SearchQuery::Omitted);
        assert_eq!(SearchQuery::from_raw(Some("   ")), SearchQuery::Omitted);
        assert_eq!(SearchQuery::from_raw(Some(" a ")), SearchQuery::TooShort);
        assert_eq!(
            SearchQuery::from_raw(Some("  a35 ")),
            SearchQuery::Term("a35".to_string())
        );
        // length is counted in characters, not bytes
        assert_eq!(SearchQuery::from_raw(Some("é")), SearchQuery::TooShort);
    }

    #[test]
    fn test_trimmed_terms_share_a_key() {
        let a = FilterSet {
            search_term: Some("a35".to_string()),
            ..Default::default()
        };
        let b = FilterSet {
            search_term: Some(" a35  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            QueryKey::new(&a, SortSpec::default()),
            QueryKey::new(&b, SortSpec::default())
        );
    }

    #[test]
    fn test_patch_keeps_untouched_fields() {
        let mut filters = FilterSet {
            manufacturer_id: Some(1),
            family_id: Some(10),
            search_term: Some("a3".to_string()),
            only_active: true,
        };
        filters.apply(FilterPatch::new().search("a35"));

        assert_eq!(filters.manufacturer_id, Some(1));
        assert_eq!(filters.family_id, Some(10));
        assert_eq!(filters.search_term.as_deref(), Some("a35"));
        assert!(filters.only_active);
    }

    #[test]
    fn test_manufacturer_change_clears_family() {
        let mut filters = FilterSet {
            manufacturer_id: Some(1),
            family_id: Some(10),
            ..Default::default()
        };
        filters.apply(FilterPatch::new().manufacturer(Some(2)));
        assert_eq!(filters.family_id, None);

        filters.apply(FilterPatch::new().manufacturer(Some(3)).family(Some(30)));
        assert_eq!(filters.manufacturer_id, Some(3));
        assert_eq!(filters.family_id, Some(30));

        // same manufacturer again keeps the family
        filters.apply(FilterPatch::new().manufacturer(Some(3)));
        assert_eq!(filters.family_id, Some(30));
    }

    #[test]
    fn test_sort_spec_parsing() {
        assert_eq!("name".parse::<SortSpec>().unwrap(), SortSpec::default());
        assert_eq!(
            "range:desc".parse::<SortSpec>().unwrap(),
            SortSpec::new(SortField::Range, SortDirection::Desc)
        );
        assert!("name:sideways".parse::<SortSpec>().is_err());
        assert!("wingspan".parse::<SortSpec>().is_err());
        assert_eq!(
            SortSpec::new(SortField::Capacity, SortDirection::Desc).to_query_param(),
            "passengerCapacity,desc"
        );
    }

    #[test]
    fn test_entity_identity() {
        let numeric: Entity = serde_json::from_value(json!({"id": 42, "name": "A350-900"})).unwrap();
        assert_eq!(numeric.id().as_deref(), Some("42"));
        assert_eq!(numeric.name(), Some("A350-900"));

        let textual: Entity = serde_json::from_value(json!({"id": "b789"})).unwrap();
        assert_eq!(textual.id().as_deref(), Some("b789"));

        let missing: Entity = serde_json::from_value(json!({"name": "?"})).unwrap();
        assert!(missing.id().is_none());
    }

    #[test]
    fn test_entity_keeps_unknown_fields() {
        let entity: Entity =
            serde_json::from_value(json!({"id": 7, "manufacturer": "Airbus", "rangeKm": 15000}))
                .unwrap();
        assert_eq!(entity.get("manufacturer"), Some(&json!("Airbus")));
        assert_eq!(entity.get("rangeKm"), Some(&json!(15000)));
        assert!(entity.get("wingspan").is_none());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(FilterPatch::new().is_empty());
        assert!(!FilterPatch::new().clear_search().is_empty());
        assert!(!FilterPatch::new().only_active(false).is_empty());
    }
}
