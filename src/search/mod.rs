//! Product search and indexing
//!
//! This module keeps a search index in step with the product catalog and
//! answers storefront queries against it:
//!
//! - **Full-Text Search**: Multi-field matching over name, description, brand and SKU
//! - **Filtering & Sorting**: Category, status, brand, color, size, price range, stock
//! - **Faceted Search**: Value counts per brand, color, size, status and price bucket
//! - **Suggestions**: Case-insensitive prefix completion on product names
//! - **Synchronization**: Catalog mutations pushed to the index in the background
//! - **Degraded Mode**: Catalog-backed answers whenever the backend fails
//! - **Reconciliation**: Scheduled or on-demand full rebuilds from the catalog
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              SearchService                       │
//! ├─────────────────────────────────────────────────┤
//! │  - search()          - suggest()                 │
//! │  - validation        - query timeout             │
//! └─────────────────────────────────────────────────┘
//!          │                          │ on failure
//!          ▼                          ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │   dyn SearchIndex    │  │ FallbackCoordinator  │
//! ├──────────────────────┤  ├──────────────────────┤
//! │ InMemoryIndex        │  │ CatalogStore listing │
//! │ EngineBackedIndex ───┼──┼─▶ QueryTranslator    │
//! └──────────────────────┘  └──────────────────────┘
//!          ▲
//!          │ upsert / delete / bulk
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │  IndexSynchronizer   │  │  ReconciliationJob   │
//! │  (catalog hook)      │  │  (cron / on demand)  │
//! └──────────────────────┘  └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::catalog::InMemoryCatalog;
//! use catalog_search::search::{InMemoryIndex, SearchConfig, SearchRequest, SearchService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = Arc::new(InMemoryIndex::new());
//!     let catalog = Arc::new(InMemoryCatalog::new());
//!     let service = SearchService::new(SearchConfig::default(), index, catalog)?;
//!
//!     let response = service.search(&SearchRequest::text("red shirt")).await?;
//!     println!("Found {} products", response.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod index;
pub mod memory;
pub mod query;
pub mod reconcile;
pub mod response;
pub mod service;
pub mod sync;
pub mod translator;

pub use config::{EngineConfig, SearchBackend, SearchConfig, SearchConfigBuilder};
pub use engine::EngineBackedIndex;
pub use error::{SearchError, SearchResult};
pub use factory::{create_search_index, SearchSystem};
pub use fallback::FallbackCoordinator;
pub use index::{BulkFailure, BulkIndexSummary, SearchIndex};
pub use memory::InMemoryIndex;
pub use query::{
    FacetField, Page, PriceBucket, SearchFilter, SearchRequest, SortField, SortOrder, SortSpec,
    DEFAULT_PAGE_SIZE, PRICE_BUCKETS,
};
pub use reconcile::{ReconciliationConfig, ReconciliationJob, ReconciliationReport};
pub use response::{FacetValue, SearchResponse, MAX_FACET_VALUES};
pub use service::SearchService;
pub use sync::{IndexOperation, IndexSynchronizer, IndexTask};
pub use translator::QueryTranslator;
