//! Incremental paging over the catalog source
//!
//! The pager issues page requests and hands completions back; it never
//! accumulates items itself. It does guarantee that the same
//! `(query, page)` pair is never outstanding twice.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::FetchError;
use crate::manufacturers::Manufacturer;
use crate::model::{QueryKey, ResultPage};
use aerodex_common::events::FetchMode;

/// Page size constant for all catalog requests
pub const PAGE_SIZE: u32 = 20;

/// Remote catalog the pager reads from
#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch one zero-indexed page of results for `key`
    async fn fetch_page(
        &self,
        key: &QueryKey,
        page: u32,
        page_size: u32,
    ) -> Result<ResultPage, FetchError>;

    /// Fetch the full manufacturer list
    async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, FetchError>;
}

/// Paging position within one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Index of the last page applied
    pub page: u32,
    pub has_next: bool,
    pub total_elements: u64,
}

impl PageCursor {
    /// Index the next load-more should request, if any remain
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then_some(self.page + 1)
    }
}

/// A request as issued, tagged for matching its response on arrival
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Monotonically increasing issue number
    pub seq: u64,
    pub key: QueryKey,
    pub page: u32,
    pub mode: FetchMode,
}

/// A finished request and its outcome
#[derive(Debug)]
pub struct PageCompletion {
    pub request: PageRequest,
    pub result: Result<ResultPage, FetchError>,
}

/// Outcome of asking the pager for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStart {
    /// A new request went out under this sequence number
    Started(u64),
    /// The same query and page is already outstanding under this sequence number
    AlreadyInFlight(u64),
}

impl PageStart {
    pub fn seq(self) -> u64 {
        match self {
            PageStart::Started(seq) | PageStart::AlreadyInFlight(seq) => seq,
        }
    }
}

/// Issues page requests as tokio tasks and collects their completions
pub struct IncrementalPager<S: CatalogSource> {
    source: Arc<S>,
    page_size: u32,
    next_seq: u64,
    outstanding: HashMap<u64, (QueryKey, u32)>,
    tx: mpsc::UnboundedSender<PageCompletion>,
    rx: mpsc::UnboundedReceiver<PageCompletion>,
}

impl<S: CatalogSource> IncrementalPager<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_page_size(source, PAGE_SIZE)
    }

    pub fn with_page_size(source: Arc<S>, page_size: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            page_size,
            next_seq: 1,
            outstanding: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Request `page` of `key`
    ///
    /// If that exact page is still outstanding (for example a superseded
    /// request for the same query that has not returned yet) no second
    /// request goes out and the existing sequence number is returned.
    pub fn start(&mut self, key: QueryKey, page: u32, mode: FetchMode) -> PageStart {
        if let Some(seq) = self.outstanding_seq(&key, page) {
            debug!(seq, page, "Page already in flight, reusing request");
            return PageStart::AlreadyInFlight(seq);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.outstanding.insert(seq, (key.clone(), page));

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let page_size = self.page_size;
        let request = PageRequest {
            seq,
            key,
            page,
            mode,
        };

        debug!(seq, page, ?mode, key = %request.key, "Requesting catalog page");
        tokio::spawn(async move {
            let result = source.fetch_page(&request.key, request.page, page_size).await;
            let _ = tx.send(PageCompletion { request, result });
        });

        PageStart::Started(seq)
    }

    /// Whether any request has not yet completed
    pub fn has_outstanding(&self) -> bool {
        !self.outstanding.is_empty()
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Wait for the next request to complete
    ///
    /// Never resolves while nothing is outstanding. Cancel-safe.
    pub async fn next_completion(&mut self) -> PageCompletion {
        loop {
            if self.outstanding.is_empty() {
                std::future::pending::<()>().await;
            }
            if let Some(completion) = self.rx.recv().await {
                self.outstanding.remove(&completion.request.seq);
                return completion;
            }
        }
    }

    fn outstanding_seq(&self, key: &QueryKey, page: u32) -> Option<u64> {
        self.outstanding
            .iter()
            .find(|(_, (k, p))| k == key && *p == page)
            .map(|(seq, _)| *seq)
    }
}
