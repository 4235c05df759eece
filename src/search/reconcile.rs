//! Full and partial index rebuilds from the catalog store.
//!
//! Every write is an upsert keyed by product id, so a run can be repeated at
//! any time and may overlap live traffic. Readers can observe a mix of stale
//! and reconciled documents while it runs.

use crate::catalog::{CatalogQuery, CatalogStore};
use crate::metrics::{RECONCILIATION_DOCUMENTS_TOTAL, RECONCILIATION_RUNS_TOTAL};
use crate::models::ProductDocument;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::SearchIndex;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Catalog page size per bulk request
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Cron expression (with seconds) for periodic runs
    #[serde(default)]
    pub schedule: Option<String>,

    /// Run once when the process starts
    #[serde(default)]
    pub run_on_startup: bool,
}

fn default_page_size() -> usize {
    100
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            schedule: None,
            run_on_startup: false,
        }
    }
}

/// Outcome of a reconciliation or reindex run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub pages: usize,
    /// Documents read from the catalog
    pub processed: usize,
    pub indexed: usize,
    pub failed: usize,
    /// Indexed documents no longer in the catalog, removed from the index
    pub removed: usize,
    pub duration_ms: u64,
}

/// Rebuilds the index from the catalog
pub struct ReconciliationJob {
    catalog: Arc<dyn CatalogStore>,
    index: Arc<dyn SearchIndex>,
    page_size: usize,
}

impl ReconciliationJob {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        index: Arc<dyn SearchIndex>,
        config: &ReconciliationConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            page_size: config.page_size.max(1),
        }
    }

    /// Re-index the whole catalog page by page, then remove indexed
    /// documents whose product is gone from the catalog.
    ///
    /// A failing page is counted and skipped; only a catalog read failure aborts the run.
    pub async fn run(&self) -> SearchResult<ReconciliationReport> {
        let start = Instant::now();
        let mut report = ReconciliationReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut after: Option<String> = None;

        info!(page_size = self.page_size, "Reconciliation started");

        loop {
            let page = match self
                .catalog
                .list_products(&CatalogQuery::scan(after.take(), self.page_size))
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    RECONCILIATION_RUNS_TOTAL.with_label_values(&["failed"]).inc();
                    error!(pages = report.pages, error = %e, "Reconciliation aborted: catalog read failed");
                    return Err(SearchError::Catalog(e.to_string()));
                }
            };

            let Some(last) = page.products.last() else {
                break;
            };

            report.pages += 1;
            after = Some(last.id.clone());
            seen.extend(page.products.iter().map(|p| p.id.clone()));
            self.index_batch(&page.products, &mut report).await;

            if !page.has_more {
                break;
            }
        }

        self.remove_orphans(&seen, &mut report).await;

        report.duration_ms = start.elapsed().as_millis() as u64;
        RECONCILIATION_RUNS_TOTAL.with_label_values(&["completed"]).inc();
        info!(
            pages = report.pages,
            processed = report.processed,
            indexed = report.indexed,
            removed = report.removed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Reconciliation completed"
        );

        Ok(report)
    }

    /// Re-index specific products, or everything when `ids` is `None`
    pub async fn reindex(&self, ids: Option<&[String]>) -> SearchResult<ReconciliationReport> {
        let Some(ids) = ids else {
            return self.run().await;
        };

        let start = Instant::now();
        let mut report = ReconciliationReport::default();

        for chunk in ids.chunks(self.page_size) {
            let products = self
                .catalog
                .get_products(chunk)
                .await
                .map_err(|e| SearchError::Catalog(e.to_string()))?;

            report.pages += 1;

            let found: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
            let missing: Vec<&String> = chunk
                .iter()
                .filter(|id| !found.contains(id.as_str()))
                .collect();
            self.delete_stale(&missing, &mut report).await;

            self.index_batch(&products, &mut report).await;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            requested = ids.len(),
            indexed = report.indexed,
            removed = report.removed,
            failed = report.failed,
            "Reindex completed"
        );

        Ok(report)
    }

    /// Delete indexed documents missing from the scan that the catalog
    /// confirms are gone. Products created mid-run are kept.
    async fn remove_orphans(&self, seen: &HashSet<String>, report: &mut ReconciliationReport) {
        let indexed = match self.index.document_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Could not list indexed documents; orphan removal skipped");
                return;
            }
        };

        let unseen: Vec<String> = indexed.into_iter().filter(|id| !seen.contains(id)).collect();

        for chunk in unseen.chunks(self.page_size) {
            let present: HashSet<String> = match self.catalog.get_products(chunk).await {
                Ok(products) => products.into_iter().map(|p| p.id).collect(),
                Err(e) => {
                    warn!(error = %e, "Catalog lookup failed; orphan removal skipped");
                    return;
                }
            };

            let orphans: Vec<&String> = chunk.iter().filter(|id| !present.contains(*id)).collect();
            self.delete_stale(&orphans, report).await;
        }
    }

    async fn delete_stale(&self, ids: &[&String], report: &mut ReconciliationReport) {
        if ids.is_empty() {
            return;
        }

        let deletions = join_all(ids.iter().map(|id| self.index.delete(id))).await;
        let mut removed = 0;
        for (id, result) in ids.iter().zip(deletions) {
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(product_id = %id, error = %e, "Failed to remove stale document");
                }
            }
        }

        report.removed += removed;
        RECONCILIATION_DOCUMENTS_TOTAL
            .with_label_values(&["removed"])
            .inc_by(removed as f64);
    }

    async fn index_batch(&self, products: &[ProductDocument], report: &mut ReconciliationReport) {
        if products.is_empty() {
            return;
        }
        report.processed += products.len();

        match self.index.bulk_index(products).await {
            Ok(summary) => {
                report.indexed += summary.succeeded;
                report.failed += summary.failed;
                RECONCILIATION_DOCUMENTS_TOTAL
                    .with_label_values(&["indexed"])
                    .inc_by(summary.succeeded as f64);
                RECONCILIATION_DOCUMENTS_TOTAL
                    .with_label_values(&["failed"])
                    .inc_by(summary.failed as f64);

                for failure in summary.failures.iter().take(10) {
                    warn!(product_id = %failure.id, reason = %failure.reason, "Document failed to index");
                }
            }
            Err(e) => {
                report.failed += products.len();
                RECONCILIATION_DOCUMENTS_TOTAL
                    .with_label_values(&["failed"])
                    .inc_by(products.len() as f64);
                warn!(documents = products.len(), error = %e, "Bulk index failed for page");
            }
        }
    }

    /// Run on a cron schedule. The returned scheduler is already started.
    pub async fn schedule(self: Arc<Self>, cron: &str) -> SearchResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;

        let job = self.clone();
        let cron_job = Job::new_async(cron, move |_uuid, _lock| {
            let job = job.clone();
            Box::pin(async move {
                if let Err(e) = job.run().await {
                    error!(error = %e, "Scheduled reconciliation failed");
                }
            })
        })
        .map_err(|e| {
            SearchError::InvalidConfiguration(format!("invalid reconciliation schedule '{}': {}", cron, e))
        })?;

        scheduler
            .add(cron_job)
            .await
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;

        info!(schedule = cron, "Reconciliation scheduled");
        Ok(scheduler)
    }
}
