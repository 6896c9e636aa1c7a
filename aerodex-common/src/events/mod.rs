//! Event types for the Aerodex event system
//!
//! Provides shared event definitions and the EventBus used by catalog views.

mod fetch_types;

pub use fetch_types::{FailureKind, FetchMode};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Catalog view events
///
/// Broadcast via EventBus and serializable for transport to a UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A query change was accepted and a debounced fetch is pending
    FetchScheduled {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A request left for the catalog service
    FetchStarted {
        /// Request sequence number
        seq: u64,
        /// Zero-based page index
        page: u32,
        mode: FetchMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Page 0 of a new query replaced the accumulated results
    ResultsReplaced {
        seq: u64,
        /// Items now held
        count: usize,
        /// Total elements reported by the catalog
        total: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A further page was appended
    PageAppended {
        seq: u64,
        page: u32,
        /// Items in the appended page
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A response arrived for a superseded query and was dropped
    StaleResponseDiscarded {
        seq: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The search term is one character long; request suppressed
    SearchTooShort {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fetch failed; accumulated results were kept
    FetchFailed {
        seq: u64,
        mode: FetchMode,
        kind: FailureKind,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Filters and sort restored to defaults
    FiltersReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CatalogEvent {
    /// Event type name as serialized in the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::FetchScheduled { .. } => "FetchScheduled",
            CatalogEvent::FetchStarted { .. } => "FetchStarted",
            CatalogEvent::ResultsReplaced { .. } => "ResultsReplaced",
            CatalogEvent::PageAppended { .. } => "PageAppended",
            CatalogEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
            CatalogEvent::SearchTooShort { .. } => "SearchTooShort",
            CatalogEvent::FetchFailed { .. } => "FetchFailed",
            CatalogEvent::FiltersReset { .. } => "FiltersReset",
        }
    }
}

/// Broadcast bus for catalog events
///
/// Cloning the bus is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers
    ///   start dropping the oldest ones
    ///
    /// # Examples
    ///
    /// ```
    /// use aerodex_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// # Examples
    ///
    /// ```
    /// use aerodex_common::events::{CatalogEvent, EventBus};
    ///
    /// let event_bus = EventBus::new(16);
    /// event_bus.emit_lossy(CatalogEvent::FiltersReset {
    ///     timestamp: chrono::Utc::now(),
    /// });
    /// ```
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
