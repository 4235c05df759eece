//! Catalog store boundary.
//!
//! The relational catalog is the system of record for products; this crate
//! only consumes two of its capabilities:
//!
//! - a filtered, paged product listing ([`CatalogStore`]) used by the
//!   degraded-mode search path and by reconciliation
//! - a post-commit mutation hook ([`CatalogMutationHook`]) used to keep the
//!   search index in step with writes
//!
//! [`InMemoryCatalog`] is a reference store for tests and the CLI.

mod memory;

pub use memory::InMemoryCatalog;

use crate::error::Result;
use crate::models::ProductDocument;
use crate::search::{SearchFilter, SortField, SortSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Filtered listing request understood by the catalog store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Same recognized filter keys as a search request
    pub filters: Vec<SearchFilter>,

    /// Case-insensitive substring over name and description
    pub text: Option<String>,

    pub sort: Vec<SortSpec>,

    pub offset: usize,

    pub limit: usize,

    /// Keyset cursor: only products whose id sorts after this one.
    /// Pair it with an ascending id sort.
    #[serde(default)]
    pub after_id: Option<String>,
}

impl CatalogQuery {
    /// Unfiltered page of the whole catalog
    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }

    /// Next page of an id-ordered scan of the whole catalog.
    ///
    /// Unlike offset paging, rows deleted behind the cursor cannot shift
    /// later products out of the scan.
    pub fn scan(after_id: Option<String>, limit: usize) -> Self {
        Self {
            sort: vec![SortSpec::asc(SortField::Id)],
            limit,
            after_id,
            ..Default::default()
        }
    }
}

/// One page of a catalog listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    pub products: Vec<ProductDocument>,

    /// Matches across all pages
    pub total: u64,

    /// Whether a further page exists after this one
    pub has_more: bool,
}

/// Read capabilities of the authoritative catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// List products matching the query's filters and text, one page at a time
    async fn list_products(&self, query: &CatalogQuery) -> Result<CatalogPage>;

    /// Fetch specific products; unknown ids are skipped
    async fn get_products(&self, ids: &[String]) -> Result<Vec<ProductDocument>>;
}

/// Invoked after a catalog write has committed.
///
/// Hooks cannot fail the mutation that triggered them.
#[async_trait]
pub trait CatalogMutationHook: Send + Sync {
    async fn on_product_saved(&self, product: &ProductDocument);

    async fn on_product_deleted(&self, product_id: &str);
}
