//! Query state controller for one catalog view
//!
//! Owns the filter set, sort order and accumulated results. State changes go
//! through the debounce gate; when it fires, one replace fetch is issued for
//! the state current at that moment. Every request carries a sequence number
//! and its `QueryKey`; a response is applied only if both still match when it
//! arrives, so a slow answer to an old query can never overwrite a newer one.
//!
//! The controller is single-owner and driven by [`QueryController::step`],
//! which waits for the next timer fire or fetch completion and applies it.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use aerodex_common::config::DEFAULT_DEBOUNCE_MS;
use aerodex_common::events::{CatalogEvent, EventBus, FailureKind, FetchMode};

use crate::debounce::DebounceGate;
use crate::error::{FetchError, UserFacingError};
use crate::manufacturers::{Manufacturer, ManufacturerDirectory};
use crate::model::{Entity, FilterPatch, FilterSet, QueryKey, ResultPage, SortSpec};
use crate::pagination::{CatalogSource, IncrementalPager, PageCompletion, PageCursor, PageRequest, PAGE_SIZE};

/// Controller tuning
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub debounce: Duration,
    pub page_size: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            page_size: PAGE_SIZE,
        }
    }
}

/// What the view should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ViewState {
    /// Nothing loaded yet
    Idle,
    /// Replace fetch in flight; previous results may still be shown
    Loading,
    /// Load-more fetch in flight
    LoadingMore,
    /// Results available
    Ready,
    /// Query succeeded with zero results
    Empty,
    /// Search term is one character; keep typing
    SearchTooShort,
    /// Replace fetch failed; see `error`
    Error,
}

/// Point-in-time copy of the controller state
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Filters exactly as entered, including a too-short search term
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub items: Vec<Entity>,
    pub cursor: Option<PageCursor>,
    pub view: ViewState,
    pub fetch_pending: bool,
    pub error: Option<UserFacingError>,
    pub load_more_error: Option<UserFacingError>,
}

/// Result of one [`QueryController::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Debounce fired but the search term was too short to send
    SearchTooShort,
    FetchStarted { seq: u64, page: u32, mode: FetchMode },
    Replaced { seq: u64, count: usize, total: u64 },
    Appended { seq: u64, page: u32, count: usize },
    StaleDiscarded { seq: u64 },
    Failed { seq: u64, mode: FetchMode, kind: FailureKind },
}

#[derive(Debug, Clone, Copy)]
struct ActiveFetch {
    seq: u64,
    mode: FetchMode,
}

enum Wake {
    Fired,
    Completed(PageCompletion),
}

pub struct QueryController<S: CatalogSource> {
    filters: FilterSet,
    sort: SortSpec,
    items: Vec<Entity>,
    cursor: Option<PageCursor>,
    /// Key the accumulated items belong to
    applied_key: Option<QueryKey>,
    /// The one request whose response will be applied
    active: Option<ActiveFetch>,
    view: ViewState,
    error: Option<UserFacingError>,
    load_more_error: Option<UserFacingError>,
    retry: Option<FetchMode>,
    gate: DebounceGate,
    pager: IncrementalPager<S>,
    manufacturers: ManufacturerDirectory,
    events: Option<EventBus>,
}

impl<S: CatalogSource> QueryController<S> {
    pub fn new(source: Arc<S>, manufacturers: ManufacturerDirectory, options: ControllerOptions) -> Self {
        Self {
            filters: FilterSet::default(),
            sort: SortSpec::default(),
            items: Vec::new(),
            cursor: None,
            applied_key: None,
            active: None,
            view: ViewState::Idle,
            error: None,
            load_more_error: None,
            retry: None,
            gate: DebounceGate::new(options.debounce),
            pager: IncrementalPager::with_page_size(source, options.page_size),
            manufacturers,
            events: None,
        }
    }

    /// Publish state transitions on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Schedule the initial fetch for the default state
    pub fn mount(&mut self) {
        self.schedule();
    }

    /// Cancel the pending debounce timer; in-flight responses will be ignored
    pub fn shutdown(&mut self) {
        self.gate.cancel();
        self.active = None;
        debug!("Query controller shut down");
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(&self.filters, self.sort)
    }

    /// Merge a filter update; returns whether a fetch was scheduled
    pub fn set_filters(&mut self, patch: FilterPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let before = self.query_key();
        self.filters.apply(patch);
        self.schedule_if_changed(before)
    }

    /// Replace the sort order; returns whether a fetch was scheduled
    pub fn set_sort(&mut self, sort: SortSpec) -> bool {
        let before = self.query_key();
        self.sort = sort;
        self.schedule_if_changed(before)
    }

    /// Request the next page under the current query
    ///
    /// A no-op (returns `false`) while any fetch is in flight or scheduled,
    /// when the last page reported no successor, or while a replace error is
    /// shown.
    pub fn load_more(&mut self) -> bool {
        if self.active.is_some() {
            debug!("Load more ignored: fetch in flight");
            return false;
        }
        if self.gate.is_pending() {
            debug!("Load more ignored: query change pending");
            return false;
        }
        if self.error.is_some() {
            debug!("Load more ignored: list blocked by error");
            return false;
        }

        let key = self.query_key();
        if self.applied_key.as_ref() != Some(&key) {
            debug!("Load more ignored: no results for current query");
            return false;
        }
        let Some(page) = self.cursor.and_then(|c| c.next_page()) else {
            debug!("Load more ignored: results exhausted");
            return false;
        };

        self.load_more_error = None;
        self.start_fetch(key, page, FetchMode::LoadMore);
        true
    }

    /// Re-issue the last failed fetch
    ///
    /// A failed replace is retried immediately with the current state,
    /// bypassing the debounce delay; a failed load-more requests the same
    /// page again.
    pub fn retry(&mut self) -> bool {
        match self.retry {
            None => false,
            Some(_) if self.active.is_some() => false,
            Some(FetchMode::Replace) => {
                self.gate.cancel();
                self.fire_replace();
                true
            }
            Some(FetchMode::LoadMore) => {
                self.load_more_error = None;
                self.load_more()
            }
        }
    }

    /// Restore default filters and sort and clear all results
    ///
    /// Results are cleared and the pending timer cancelled before the
    /// default listing is scheduled, so nothing scheduled earlier can land.
    pub fn reset(&mut self) {
        self.gate.cancel();
        if let Some(active) = self.active.take() {
            debug!(seq = active.seq, mode = ?active.mode, "In-flight fetch abandoned by reset");
        }

        self.filters = FilterSet::default();
        self.sort = SortSpec::default();
        self.items.clear();
        self.cursor = None;
        self.applied_key = None;
        self.error = None;
        self.load_more_error = None;
        self.retry = None;
        self.view = ViewState::Idle;

        info!("Catalog filters reset");
        self.emit(CatalogEvent::FiltersReset {
            timestamp: chrono::Utc::now(),
        });
        self.schedule();
    }

    /// Wait for the next timer fire or fetch completion and apply it
    ///
    /// Returns `None` immediately when nothing is scheduled or outstanding.
    pub async fn step(&mut self) -> Option<Update> {
        if !self.gate.is_pending() && !self.pager.has_outstanding() {
            return None;
        }

        let wake = tokio::select! {
            _ = self.gate.fired() => Wake::Fired,
            done = self.pager.next_completion() => Wake::Completed(done),
        };

        Some(match wake {
            Wake::Fired => self.fire_replace(),
            Wake::Completed(done) => self.handle_completion(done),
        })
    }

    /// Step until nothing is scheduled or outstanding
    pub async fn settle(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Some(update) = self.step().await {
            updates.push(update);
        }
        updates
    }

    /// Manufacturer list for the dropdown, cached across calls
    pub async fn manufacturers(&self) -> Result<Arc<Vec<Manufacturer>>, UserFacingError> {
        self.manufacturers
            .get_or_load(self.pager.source().as_ref())
            .await
            .map_err(|e| UserFacingError::from(&e))
    }

    pub fn manufacturer_directory(&self) -> &ManufacturerDirectory {
        &self.manufacturers
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursor
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn error(&self) -> Option<&UserFacingError> {
        self.error.as_ref()
    }

    pub fn load_more_error(&self) -> Option<&UserFacingError> {
        self.load_more_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_fetch_pending(&self) -> bool {
        self.gate.is_pending()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            filters: self.filters.clone(),
            sort: self.sort,
            items: self.items.clone(),
            cursor: self.cursor,
            view: self.view,
            fetch_pending: self.gate.is_pending(),
            error: self.error.clone(),
            load_more_error: self.load_more_error.clone(),
        }
    }

    fn schedule_if_changed(&mut self, before: QueryKey) -> bool {
        let after = self.query_key();
        if after == before {
            debug!(key = %after, "Query unchanged, no fetch scheduled");
            return false;
        }
        self.schedule();
        true
    }

    fn schedule(&mut self) {
        self.gate.trigger();
        debug!(delay_ms = self.gate.delay().as_millis() as u64, "Catalog fetch scheduled");
        self.emit(CatalogEvent::FetchScheduled {
            timestamp: chrono::Utc::now(),
        });
    }

    fn fire_replace(&mut self) -> Update {
        let key = self.query_key();

        if key.is_suppressed() {
            if let Some(active) = self.active.take() {
                debug!(seq = active.seq, "In-flight fetch superseded by too-short search");
            }
            self.view = ViewState::SearchTooShort;
            debug!("Search term too short, request suppressed");
            self.emit(CatalogEvent::SearchTooShort {
                timestamp: chrono::Utc::now(),
            });
            return Update::SearchTooShort;
        }

        self.start_fetch(key, 0, FetchMode::Replace)
    }

    fn start_fetch(&mut self, key: QueryKey, page: u32, mode: FetchMode) -> Update {
        let seq = self.pager.start(key, page, mode).seq();
        self.active = Some(ActiveFetch { seq, mode });
        self.view = match mode {
            FetchMode::Replace => ViewState::Loading,
            FetchMode::LoadMore => ViewState::LoadingMore,
        };

        self.emit(CatalogEvent::FetchStarted {
            seq,
            page,
            mode,
            timestamp: chrono::Utc::now(),
        });
        Update::FetchStarted { seq, page, mode }
    }

    fn handle_completion(&mut self, done: PageCompletion) -> Update {
        let PageCompletion { request, result } = done;
        let seq = request.seq;
        let is_active = self.active.map(|a| a.seq) == Some(seq);

        if !is_active || request.key != self.query_key() {
            if is_active {
                // query changed while in flight; the pending timer takes over
                self.active = None;
                self.view = if self.gate.is_pending() {
                    ViewState::Loading
                } else {
                    self.settled_view()
                };
            }
            debug!(seq, page = request.page, "Discarding stale catalog response");
            self.emit(CatalogEvent::StaleResponseDiscarded {
                seq,
                timestamp: chrono::Utc::now(),
            });
            return Update::StaleDiscarded { seq };
        }

        self.active = None;
        match result {
            Ok(page) => self.apply_page(request, page),
            Err(err) => self.apply_failure(request, err),
        }
    }

    fn apply_page(&mut self, request: PageRequest, page: ResultPage) -> Update {
        let seq = request.seq;
        let count = page.items.len();

        let update = match request.mode {
            FetchMode::Replace => {
                self.items = page.items;
                self.applied_key = Some(request.key);
                self.cursor = Some(PageCursor {
                    page: request.page,
                    has_next: page.has_next,
                    total_elements: page.total_elements,
                });

                info!(seq, count, total = page.total_elements, "Catalog results replaced");
                self.emit(CatalogEvent::ResultsReplaced {
                    seq,
                    count,
                    total: page.total_elements,
                    timestamp: chrono::Utc::now(),
                });
                Update::Replaced {
                    seq,
                    count,
                    total: page.total_elements,
                }
            }
            FetchMode::LoadMore => {
                let expected = self.cursor.and_then(|c| c.next_page());
                if expected != Some(request.page) {
                    warn!(seq, page = request.page, ?expected, "Out-of-order page dropped");
                    self.view = self.settled_view();
                    return Update::StaleDiscarded { seq };
                }

                self.items.extend(page.items);
                self.cursor = Some(PageCursor {
                    page: request.page,
                    has_next: page.has_next,
                    total_elements: page.total_elements,
                });

                info!(seq, page = request.page, count, "Catalog page appended");
                self.emit(CatalogEvent::PageAppended {
                    seq,
                    page: request.page,
                    count,
                    timestamp: chrono::Utc::now(),
                });
                Update::Appended {
                    seq,
                    page: request.page,
                    count,
                }
            }
        };

        self.error = None;
        self.load_more_error = None;
        self.retry = None;
        self.view = self.settled_view();
        update
    }

    fn apply_failure(&mut self, request: PageRequest, err: FetchError) -> Update {
        let seq = request.seq;
        let kind = err.kind();
        warn!(seq, page = request.page, kind = %kind, error = %err, "Catalog fetch failed");

        let user_error = UserFacingError::from(&err);
        match request.mode {
            FetchMode::Replace => {
                self.error = Some(user_error);
                self.view = ViewState::Error;
            }
            FetchMode::LoadMore => {
                self.load_more_error = Some(user_error);
                self.view = self.settled_view();
            }
        }
        self.retry = Some(request.mode);

        self.emit(CatalogEvent::FetchFailed {
            seq,
            mode: request.mode,
            kind,
            message: err.message().to_string(),
            timestamp: chrono::Utc::now(),
        });
        Update::Failed {
            seq,
            mode: request.mode,
            kind,
        }
    }

    /// View state with nothing in flight
    fn settled_view(&self) -> ViewState {
        if self.error.is_some() {
            ViewState::Error
        } else if self.query_key().is_suppressed() {
            ViewState::SearchTooShort
        } else if self.applied_key.is_none() {
            ViewState::Idle
        } else if self.items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Ready
        }
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SortDirection, SortField};
    use async_trait::async_trait;
    use serde_json::json;

    /// Every page answers after 50ms with two items and one successor page
    struct TwoPageSource;

    #[async_trait]
    impl CatalogSource for TwoPageSource {
        async fn fetch_page(
            &self,
            _key: &QueryKey,
            page: u32,
            _page_size: u32,
        ) -> Result<ResultPage, FetchError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let items = (0..2)
                .map(|i| serde_json::from_value(json!({"id": page * 10 + i})).unwrap())
                .collect();
            Ok(ResultPage {
                items,
                total_elements: 4,
                has_next: page == 0,
            })
        }

        async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn controller() -> QueryController<TwoPageSource> {
        QueryController::new(
            Arc::new(TwoPageSource),
            ManufacturerDirectory::new(),
            ControllerOptions::default(),
        )
    }

    #[test]
    fn test_defaults() {
        let c = controller();
        assert_eq!(c.filters(), &FilterSet::default());
        assert_eq!(c.sort(), SortSpec::new(SortField::Name, SortDirection::Asc));
        assert_eq!(c.view(), ViewState::Idle);
        assert!(c.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_patch_schedules_nothing() {
        let mut c = controller();
        assert!(!c.set_filters(FilterPatch::new()));
        assert!(!c.set_sort(SortSpec::default()));
        assert!(!c.is_fetch_pending());
        assert!(c.step().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_then_load_more_until_exhausted() {
        let mut c = controller();
        c.mount();
        c.settle().await;
        assert_eq!(c.view(), ViewState::Ready);
        assert_eq!(c.items().len(), 2);

        assert!(c.load_more());
        // serialized: a second call while in flight is ignored
        assert!(!c.load_more());
        assert_eq!(c.view(), ViewState::LoadingMore);
        c.settle().await;

        assert_eq!(c.items().len(), 4);
        assert_eq!(c.cursor().map(|cur| cur.page), Some(1));
        assert!(!c.load_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_blocked_while_query_change_pending() {
        let mut c = controller();
        c.mount();
        c.settle().await;

        c.set_filters(FilterPatch::new().only_active(true));
        assert!(!c.load_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_scheduled_fetch() {
        let mut c = controller();
        c.mount();
        c.shutdown();
        assert!(c.step().await.is_none());
        assert_eq!(c.view(), ViewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_published() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        let mut c = controller().with_event_bus(bus);

        c.mount();
        c.settle().await;

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.event_type());
        }
        assert_eq!(types, vec!["FetchScheduled", "FetchStarted", "ResultsReplaced"]);
    }
}
