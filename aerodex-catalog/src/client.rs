//! HTTP catalog client
//!
//! Talks to the remote catalog service:
//! - `GET {base}/aircraft?...&page=&size=` → `{ content: [...], page: { totalElements, hasNext } }`
//! - `GET {base}/manufacturers` → `[ { id, name, country? } ]`

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use aerodex_common::config::CatalogConfig;

use crate::error::FetchError;
use crate::manufacturers::Manufacturer;
use crate::model::{Entity, QueryKey, ResultPage};
use crate::pagination::CatalogSource;

const USER_AGENT: &str = concat!("aerodex-catalog/", env!("CARGO_PKG_VERSION"));

/// Paginated response envelope
#[derive(Debug, Deserialize)]
struct AircraftEnvelope {
    content: Vec<Entity>,
    page: PageMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    total_elements: u64,
    has_next: bool,
}

/// Error body shapes the catalog is known to send
///
/// Spring-style bodies carry both `error` (the reason phrase) and `message`
/// (the explanation), so each field is read on its own.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
    error: Option<String>,
}

/// reqwest-backed catalog source
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connectivity(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, FetchError> {
        Self::new(config.catalog_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(&self, url: &str, query: &[(&'static str, String)]) -> Result<T, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(FetchError::from)?;

        if !status.is_success() {
            let message = server_message(&body);
            warn!(url = %url, status = status.as_u16(), message = %message, "Catalog request failed");
            return Err(FetchError::from_status(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Server {
            status: status.as_u16(),
            message: format!("invalid catalog payload: {}", e),
        })
    }
}

/// Query parameters for one aircraft page
///
/// The search parameter is present only for terms that passed validation;
/// suppressed keys never reach this point.
pub fn aircraft_query(key: &QueryKey, page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(7);
    if let Some(id) = key.manufacturer_id {
        params.push(("manufacturerId", id.to_string()));
    }
    if let Some(id) = key.family_id {
        params.push(("familyId", id.to_string()));
    }
    if let Some(term) = key.search.term() {
        params.push(("search", term.to_string()));
    }
    params.push(("onlyActive", key.only_active.to_string()));
    params.push(("sort", key.sort.to_query_param()));
    params.push(("page", page.to_string()));
    params.push(("size", page_size.to_string()));
    params
}

/// Best human-readable message from an error body
fn server_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.detail).or(b.error))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_page(
        &self,
        key: &QueryKey,
        page: u32,
        page_size: u32,
    ) -> Result<ResultPage, FetchError> {
        let url = format!("{}/aircraft", self.base_url);
        debug!(url = %url, page, key = %key, "Querying catalog");

        let envelope: AircraftEnvelope = self
            .get_json(&url, &aircraft_query(key, page, page_size))
            .await?;

        if let Some(index) = envelope.content.iter().position(|e| e.id().is_none()) {
            return Err(FetchError::Server {
                status: 200,
                message: format!("catalog entity at index {} has no id", index),
            });
        }

        info!(
            page,
            count = envelope.content.len(),
            total = envelope.page.total_elements,
            has_next = envelope.page.has_next,
            "Retrieved catalog page"
        );

        Ok(ResultPage {
            items: envelope.content,
            total_elements: envelope.page.total_elements,
            has_next: envelope.page.has_next,
        })
    }

    async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, FetchError> {
        let url = format!("{}/manufacturers", self.base_url);
        debug!(url = %url, "Querying manufacturers");
        self.get_json(&url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserFacingError;
    use crate::model::{FilterSet, SortDirection, SortField, SortSpec};

    #[test]
    fn test_client_creation_trims_base() {
        let client = CatalogClient::new("http://localhost:8080/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_query_includes_only_set_filters() {
        let filters = FilterSet {
            search_term: Some(" a35 ".into()),
            only_active: true,
            ..Default::default()
        };
        let key = QueryKey::new(&filters, SortSpec::default());

        assert_eq!(
            aircraft_query(&key, 0, 20),
            vec![
                ("search", "a35".to_string()),
                ("onlyActive", "true".to_string()),
                ("sort", "name,asc".to_string()),
                ("page", "0".to_string()),
                ("size", "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_omits_empty_search() {
        let filters = FilterSet {
            manufacturer_id: Some(4),
            family_id: Some(41),
            search_term: Some("   ".into()),
            only_active: false,
        };
        let key = QueryKey::new(
            &filters,
            SortSpec::new(SortField::FirstFlight, SortDirection::Desc),
        );
        let params = aircraft_query(&key, 3, 20);

        assert!(params.iter().all(|(name, _)| *name != "search"));
        assert!(params.contains(&("manufacturerId", "4".to_string())));
        assert!(params.contains(&("familyId", "41".to_string())));
        assert!(params.contains(&("sort", "firstFlight,desc".to_string())));
        assert!(params.contains(&("page", "3".to_string())));
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(server_message(r#"{"message":"Unknown family"}"#), "Unknown family");
        assert_eq!(server_message(r#"{"error":"Bad sort"}"#), "Bad sort");
        assert_eq!(server_message("  plain text \n"), "plain text");
    }

    #[test]
    fn test_server_message_prefers_message_over_reason_phrase() {
        let body = r#"{"timestamp":"2026-10-14T09:12:44.120+00:00","status":400,"error":"Bad Request","message":"Unknown family for manufacturer","path":"/api/aircraft"}"#;
        let message = server_message(body);
        assert_eq!(message, "Unknown family for manufacturer");

        let user = UserFacingError::from(FetchError::from_status(400, message));
        assert_eq!(user.detail.as_deref(), Some("Unknown family for manufacturer"));

        assert_eq!(
            server_message(r#"{"error":"Bad Request","detail":"Sort field not supported"}"#),
            "Sort field not supported"
        );
    }
}
