//! Search response model and facet normalization

use crate::models::ProductDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of values returned per facet
pub const MAX_FACET_VALUES: usize = 20;

/// A single facet bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

impl FacetValue {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Order facet values by count descending (ties by value), drop empty
/// buckets and cap the list at [`MAX_FACET_VALUES`].
pub fn normalize_facet_values(mut values: Vec<FacetValue>) -> Vec<FacetValue> {
    values.retain(|v| v.count > 0);
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values.truncate(MAX_FACET_VALUES);
    values
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matched documents for the requested page
    pub documents: Vec<ProductDocument>,

    /// Number of documents matching the full filtered request, independent of paging
    pub total: u64,

    /// Facet name to ordered values (empty when unsupported or degraded)
    #[serde(default)]
    pub facets: BTreeMap<String, Vec<FacetValue>>,

    /// Free text the response answers, if any
    #[serde(default)]
    pub query: Option<String>,

    pub offset: usize,

    pub size: usize,

    /// Wall-clock time spent answering (milliseconds)
    #[serde(default)]
    pub search_time_ms: u64,
}

impl SearchResponse {
    /// An empty page for the given window
    pub fn empty(offset: usize, size: usize) -> Self {
        Self {
            documents: Vec::new(),
            total: 0,
            facets: BTreeMap::new(),
            query: None,
            offset,
            size,
            search_time_ms: 0,
        }
    }

    /// Ids of the returned documents, in order
    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    /// Whether a further page exists
    pub fn has_more(&self) -> bool {
        ((self.offset + self.documents.len()) as u64) < self.total
    }
}
