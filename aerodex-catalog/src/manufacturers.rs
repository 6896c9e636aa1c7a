//! Manufacturer directory cache
//!
//! The manufacturer list changes rarely and backs the manufacturer dropdown.
//! It is loaded once on first use and kept until `invalidate()` or
//! `refresh()` is called. Clones share the same cache.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::model::Id;
use crate::pagination::CatalogSource;

/// Aircraft manufacturer as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// Explicit cache of the manufacturer list
#[derive(Debug, Clone, Default)]
pub struct ManufacturerDirectory {
    cached: Arc<Mutex<Option<Arc<Vec<Manufacturer>>>>>,
}

impl ManufacturerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached list, loading it from `source` on first use
    ///
    /// Concurrent callers wait on the same load rather than issuing their own.
    pub async fn get_or_load<S>(&self, source: &S) -> Result<Arc<Vec<Manufacturer>>, FetchError>
    where
        S: CatalogSource + ?Sized,
    {
        let mut cached = self.cached.lock().await;
        if let Some(list) = cached.as_ref() {
            debug!(count = list.len(), "Manufacturer directory cache hit");
            return Ok(Arc::clone(list));
        }

        let list = Arc::new(sorted(source.fetch_manufacturers().await?));
        info!(count = list.len(), "Loaded manufacturer directory");
        *cached = Some(Arc::clone(&list));
        Ok(list)
    }

    /// Reload unconditionally, replacing the cached list on success
    ///
    /// On failure the previous list stays cached.
    pub async fn refresh<S>(&self, source: &S) -> Result<Arc<Vec<Manufacturer>>, FetchError>
    where
        S: CatalogSource + ?Sized,
    {
        let mut cached = self.cached.lock().await;
        let list = Arc::new(sorted(source.fetch_manufacturers().await?));
        info!(count = list.len(), "Refreshed manufacturer directory");
        *cached = Some(Arc::clone(&list));
        Ok(list)
    }

    /// Forget the cached list; the next `get_or_load` fetches again
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
        debug!("Manufacturer directory invalidated");
    }

    /// Cached list without loading
    pub async fn cached(&self) -> Option<Arc<Vec<Manufacturer>>> {
        self.cached.lock().await.clone()
    }
}

fn sorted(mut list: Vec<Manufacturer>) -> Vec<Manufacturer> {
    list.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QueryKey, ResultPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct DirectorySource {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl DirectorySource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for DirectorySource {
        async fn fetch_page(
            &self,
            _key: &QueryKey,
            _page: u32,
            _page_size: u32,
        ) -> Result<ResultPage, FetchError> {
            unreachable!("directory tests never page")
        }

        async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Connectivity("offline".into()));
            }
            let mut list = vec![
                Manufacturer {
                    id: 2,
                    name: "Boeing".into(),
                    country: Some("US".into()),
                },
                Manufacturer {
                    id: 1,
                    name: "Airbus".into(),
                    country: Some("EU".into()),
                },
            ];
            if n > 0 {
                list.push(Manufacturer {
                    id: 3,
                    name: "Embraer".into(),
                    country: None,
                });
            }
            Ok(list)
        }
    }

    #[tokio::test]
    async fn test_loads_once_and_sorts() {
        let source = DirectorySource::new();
        let directory = ManufacturerDirectory::new();

        let first = directory.get_or_load(&source).await.unwrap();
        let second = directory.get_or_load(&source).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "Airbus");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let source = DirectorySource::new();
        let directory = ManufacturerDirectory::new();

        directory.get_or_load(&source).await.unwrap();
        directory.invalidate().await;
        assert!(directory.cached().await.is_none());

        let reloaded = directory.get_or_load(&source).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reloaded.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let source = DirectorySource::new();
        let directory = ManufacturerDirectory::new();

        directory.get_or_load(&source).await.unwrap();
        source.fail.store(true, Ordering::SeqCst);

        assert!(directory.refresh(&source).await.is_err());
        assert_eq!(directory.cached().await.map(|l| l.len()), Some(2));
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let source = DirectorySource::new();
        let directory = ManufacturerDirectory::new();
        let shared = directory.clone();

        directory.get_or_load(&source).await.unwrap();
        assert!(shared.cached().await.is_some());
    }
}
