//! aerodex-catalog - Aircraft catalog browsing core
//!
//! Filter, sort and page through a remote aircraft catalog without ever
//! showing results that belong to an older query, and match catalog display
//! names to locally curated content.

pub mod client;
pub mod content;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod manufacturers;
pub mod model;
pub mod pagination;
pub mod resolver;

pub use client::CatalogClient;
pub use content::{ContentRecord, ContentTable};
pub use controller::{ControllerOptions, QueryController, Snapshot, Update, ViewState};
pub use error::{Affordance, FetchError, UserFacingError};
pub use manufacturers::{Manufacturer, ManufacturerDirectory};
pub use model::{Entity, FilterPatch, FilterSet, QueryKey, ResultPage, SearchQuery, SortDirection, SortField, SortSpec};
pub use pagination::{CatalogSource, PageCursor, PAGE_SIZE};
pub use resolver::{CandidateKeySet, IdentityResolver};
