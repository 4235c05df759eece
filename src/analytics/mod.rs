//! Search analytics
//!
//! Every search with free text produces an append-only [`AnalyticsRecord`]
//! (query text, optional user, result count, timestamp). Recording is always
//! detached from the search that produced it and can never fail or slow a
//! response:
//!
//! - **Recording**: [`AnalyticsRecorder`] queues records on a bounded
//!   dispatcher and drops them when the queue is full
//! - **Storage**: [`AnalyticsStore`] is the durable append-only sink
//! - **Aggregation**: [`AnalyticsSummary`] computes total searches, average
//!   results, zero-result rate and the top search terms over a date range
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::analytics::{AnalyticsConfig, AnalyticsRecorder, InMemoryAnalyticsStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryAnalyticsStore::new());
//!     let recorder = AnalyticsRecorder::new(&AnalyticsConfig::default(), store);
//!
//!     recorder.record("red shirt", None, 12);
//!     recorder.flush().await;
//! }
//! ```

mod error;
mod recorder;
mod store;
mod summary;

pub use error::{AnalyticsError, AnalyticsResult};
pub use recorder::{AnalyticsConfig, AnalyticsRecorder};
pub use store::{AnalyticsStore, InMemoryAnalyticsStore};
pub use summary::{AnalyticsSummary, TermCount};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded search. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub query: String,
    pub user_id: Option<String>,
    pub result_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsRecord {
    pub fn new(query: impl Into<String>, user_id: Option<String>, result_count: u64) -> Self {
        Self {
            query: query.into(),
            user_id,
            result_count,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
