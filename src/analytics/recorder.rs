use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::store::AnalyticsStore;
use crate::analytics::summary::AnalyticsSummary;
use crate::analytics::AnalyticsRecord;
use crate::dispatch::{BoundedDispatcher, DispatchConfig, TaskHandler};
use crate::metrics::ANALYTICS_RECORDS_TOTAL;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Analytics recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Background queue; recording never waits for capacity
    #[serde(default)]
    pub queue: DispatchConfig,

    /// Default number of top terms in a summary
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_top_terms() -> usize {
    10
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            queue: DispatchConfig::default(),
            top_terms: default_top_terms(),
        }
    }
}

struct AnalyticsWriter {
    store: Arc<dyn AnalyticsStore>,
}

#[async_trait]
impl TaskHandler<AnalyticsRecord> for AnalyticsWriter {
    async fn handle(&self, record: AnalyticsRecord) {
        match self.store.append(record).await {
            Ok(()) => ANALYTICS_RECORDS_TOTAL.with_label_values(&["recorded"]).inc(),
            Err(e) => {
                ANALYTICS_RECORDS_TOTAL.with_label_values(&["failed"]).inc();
                warn!(error = %e, "Failed to store search analytics record");
            }
        }
    }
}

/// Non-blocking recorder of search analytics
pub struct AnalyticsRecorder {
    store: Arc<dyn AnalyticsStore>,
    dispatcher: Option<BoundedDispatcher<AnalyticsRecord>>,
    top_terms: usize,
}

impl AnalyticsRecorder {
    /// Create a recorder; spawns its workers when enabled
    pub fn new(config: &AnalyticsConfig, store: Arc<dyn AnalyticsStore>) -> Self {
        let dispatcher = config.enabled.then(|| {
            let writer: Arc<dyn TaskHandler<AnalyticsRecord>> = Arc::new(AnalyticsWriter {
                store: store.clone(),
            });
            BoundedDispatcher::spawn("analytics", &config.queue, writer)
        });

        Self {
            store,
            dispatcher,
            top_terms: config.top_terms,
        }
    }

    /// Queue a record for a search. Returns whether it was queued.
    ///
    /// Never waits: searches without free text are skipped and a full queue drops the record.
    pub fn record(&self, query: &str, user_id: Option<String>, result_count: u64) -> bool {
        let Some(dispatcher) = &self.dispatcher else {
            return false;
        };

        let query = query.trim();
        if query.is_empty() {
            ANALYTICS_RECORDS_TOTAL.with_label_values(&["skipped"]).inc();
            debug!("Skipping analytics for search without text");
            return false;
        }

        dispatcher
            .try_submit(AnalyticsRecord::new(query, user_id, result_count))
            .is_queued()
    }

    /// Wait for queued records to be written
    pub async fn flush(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.wait_idle().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Aggregate records in `[start, end]`; `limit` overrides the configured top-term count
    pub async fn summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> AnalyticsResult<AnalyticsSummary> {
        let limit = limit.unwrap_or(self.top_terms);
        if limit == 0 {
            return Err(AnalyticsError::InvalidConfiguration(
                "limit must be greater than zero".to_string(),
            ));
        }

        let records = self.store.records_between(start, end).await?;
        Ok(AnalyticsSummary::from_records(&records, limit))
    }
}
