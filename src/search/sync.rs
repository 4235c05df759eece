//! Write-path synchronization from catalog mutations to the index.
//!
//! The catalog is the system of record and the index is rebuildable, so a
//! failed index write is logged and counted but never reported back to the
//! mutation that caused it.

use crate::catalog::CatalogMutationHook;
use crate::dispatch::{BoundedDispatcher, DispatchConfig, DispatchOutcome, TaskHandler};
use crate::metrics::record_index_operation;
use crate::models::ProductDocument;
use crate::search::index::SearchIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Change to apply to the index
#[derive(Debug, Clone)]
pub enum IndexOperation {
    Upsert(ProductDocument),
    Delete(String),
}

/// A queued index change with its correlation id
#[derive(Debug, Clone)]
pub struct IndexTask {
    pub correlation_id: Uuid,
    pub operation: IndexOperation,
}

impl IndexTask {
    pub fn new(operation: IndexOperation) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            operation,
        }
    }

    pub fn product_id(&self) -> &str {
        match &self.operation {
            IndexOperation::Upsert(doc) => &doc.id,
            IndexOperation::Delete(id) => id,
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self.operation {
            IndexOperation::Upsert(_) => "index",
            IndexOperation::Delete(_) => "delete",
        }
    }
}

struct IndexWriter {
    index: Arc<dyn SearchIndex>,
}

#[async_trait]
impl TaskHandler<IndexTask> for IndexWriter {
    async fn handle(&self, task: IndexTask) {
        let result = match &task.operation {
            IndexOperation::Upsert(doc) => self.index.index(doc).await,
            IndexOperation::Delete(id) => self.index.delete(id).await,
        };

        record_index_operation(self.index.backend_name(), task.operation_name(), result.is_ok());

        match result {
            Ok(()) => debug!(
                product_id = %task.product_id(),
                operation = task.operation_name(),
                correlation_id = %task.correlation_id,
                "Index synchronized"
            ),
            Err(e) => error!(
                product_id = %task.product_id(),
                operation = task.operation_name(),
                correlation_id = %task.correlation_id,
                error = %e,
                "Index synchronization failed"
            ),
        }
    }
}

/// Pushes catalog changes to the index in the background.
///
/// Changes to the same product are applied in the order they were committed.
pub struct IndexSynchronizer {
    dispatcher: BoundedDispatcher<IndexTask>,
}

impl IndexSynchronizer {
    /// Spawn the background writers
    pub fn new(index: Arc<dyn SearchIndex>, config: &DispatchConfig) -> Self {
        let writer: Arc<dyn TaskHandler<IndexTask>> = Arc::new(IndexWriter { index });
        Self {
            dispatcher: BoundedDispatcher::spawn("index_sync", config, writer),
        }
    }

    /// Queue an upsert for a saved product
    pub async fn product_saved(&self, product: &ProductDocument) -> DispatchOutcome {
        self.enqueue(IndexTask::new(IndexOperation::Upsert(product.clone())))
            .await
    }

    /// Queue a delete for a removed product
    pub async fn product_deleted(&self, product_id: &str) -> DispatchOutcome {
        self.enqueue(IndexTask::new(IndexOperation::Delete(product_id.to_string())))
            .await
    }

    async fn enqueue(&self, task: IndexTask) -> DispatchOutcome {
        let product_id = task.product_id().to_string();
        let operation = task.operation_name();
        let correlation_id = task.correlation_id;

        let outcome = self.dispatcher.submit_keyed(&product_id, task).await;
        if outcome.is_queued() {
            debug!(product_id = %product_id, operation, correlation_id = %correlation_id, "Index task queued");
        } else {
            error!(
                product_id = %product_id,
                operation,
                correlation_id = %correlation_id,
                outcome = ?outcome,
                "Index task not queued; reconciliation will repair the index"
            );
        }
        outcome
    }

    /// Tasks queued or in flight
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Wait for every queued change to be applied
    pub async fn flush(&self) {
        self.dispatcher.wait_idle().await;
    }
}

#[async_trait]
impl CatalogMutationHook for IndexSynchronizer {
    async fn on_product_saved(&self, product: &ProductDocument) {
        self.product_saved(product).await;
    }

    async fn on_product_deleted(&self, product_id: &str) {
        self.product_deleted(product_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::memory::InMemoryIndex;

    #[tokio::test]
    async fn test_saves_and_deletes_reach_index() {
        let index = Arc::new(InMemoryIndex::new());
        let sync = IndexSynchronizer::new(index.clone(), &DispatchConfig::default());

        let product = ProductDocument::new("p-1", "SKU-1", "Red Shirt", "clothing", 20.0);
        assert!(sync.product_saved(&product).await.is_queued());
        sync.flush().await;
        assert!(index.get("p-1").is_some());

        assert!(sync.product_deleted("p-1").await.is_queued());
        sync.flush().await;
        assert!(index.is_empty());
    }

    #[test]
    fn test_task_correlation_ids_are_unique() {
        let a = IndexTask::new(IndexOperation::Delete("p-1".into()));
        let b = IndexTask::new(IndexOperation::Delete("p-1".into()));
        assert_ne!(a.correlation_id, b.correlation_id);
        assert_eq!(a.product_id(), "p-1");
        assert_eq!(a.operation_name(), "delete");
    }
}
