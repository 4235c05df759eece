use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::AnalyticsRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Durable append-only sink for search analytics
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn append(&self, record: AnalyticsRecord) -> AnalyticsResult<()>;

    /// Records with `start <= timestamp <= end`, oldest first
    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<AnalyticsRecord>>;
}

/// In-memory analytics store (for testing and the CLI)
#[derive(Default)]
pub struct InMemoryAnalyticsStore {
    records: RwLock<Vec<AnalyticsRecord>>,
}

impl InMemoryAnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryAnalyticsStore {
    async fn append(&self, record: AnalyticsRecord) -> AnalyticsResult<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<AnalyticsRecord>> {
        if start > end {
            return Err(AnalyticsError::InvalidDateRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let mut records: Vec<AnalyticsRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);

        Ok(records)
    }
}
