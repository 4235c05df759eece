//! End-to-end tests for the search read and write paths

mod common;

use catalog_search::analytics::{AnalyticsConfig, AnalyticsRecorder, InMemoryAnalyticsStore};
use catalog_search::catalog::InMemoryCatalog;
use catalog_search::dispatch::DispatchConfig;
use catalog_search::models::ProductDocument;
use catalog_search::search::*;
use common::*;
use std::sync::Arc;
use std::time::Duration;

async fn service_over(products: &[ProductDocument]) -> SearchService {
    SearchService::new(
        SearchConfig::default(),
        seeded_index(products).await,
        seeded_catalog(products.to_vec()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_indexed_document_is_retrievable_by_id() {
    let index = InMemoryIndex::new();
    for doc in wardrobe() {
        index.index(&doc).await.unwrap();
    }

    let request = SearchRequest::new().with_filter(SearchFilter::Ids(vec!["p-2".to_string()]));
    let response = index.query(&request).await.unwrap();

    assert_eq!(response.ids(), vec!["p-2"]);
    assert_eq!(response.documents[0].name, "Blue Jeans");
}

#[tokio::test]
async fn test_delete_then_query_yields_nothing() {
    let index = seeded_index(&wardrobe()).await;

    index.delete("p-1").await.unwrap();
    let request = SearchRequest::new().with_filter(SearchFilter::Ids(vec!["p-1".to_string()]));
    let response = index.query(&request).await.unwrap();
    assert_eq!(response.total, 0);
    assert!(response.documents.is_empty());

    // Unknown ids, and deleting twice, are both fine
    index.delete("p-1").await.unwrap();
    index.delete("never-existed").await.unwrap();
}

#[tokio::test]
async fn test_result_length_never_exceeds_size() {
    let service = service_over(&bulk_products(30)).await;

    for size in [1, 2, 7, 20, 50] {
        let response = service
            .search(&SearchRequest::new().with_size(size))
            .await
            .unwrap();
        assert!(response.documents.len() <= size as usize);
        assert_eq!(response.total, 30);
    }
}

#[tokio::test]
async fn test_total_is_pagination_invariant() {
    let service = service_over(&bulk_products(9)).await;
    let base = SearchRequest::new().with_filter(SearchFilter::Category("even".to_string()));

    let first = service
        .search(&base.clone().with_offset(0).with_size(2))
        .await
        .unwrap();
    let second = service
        .search(&base.clone().with_offset(2).with_size(2))
        .await
        .unwrap();

    assert_eq!(first.total, 5);
    assert_eq!(first.total, second.total);
    assert_eq!(first.documents.len(), 2);
    assert_eq!(second.documents.len(), 2);
    assert!(first.has_more());

    let first_ids = first.ids();
    assert!(second.ids().iter().all(|id| !first_ids.contains(id)));
}

#[test]
fn test_facet_values_capped_and_sorted() {
    let values = (0..30u64)
        .map(|i| FacetValue::new(format!("brand-{:02}", i), i + 1))
        .collect();
    let normalized = response::normalize_facet_values(values);

    assert_eq!(normalized.len(), MAX_FACET_VALUES);
    assert!(normalized.windows(2).all(|w| w[0].count >= w[1].count));
    assert_eq!(normalized[0].value, "brand-29");
}

#[tokio::test]
async fn test_free_text_matches_only_shirt() {
    let service = service_over(&wardrobe()).await;

    let response = service.search(&SearchRequest::text("shirt")).await.unwrap();
    assert_eq!(response.ids(), vec!["p-1"]);
    assert_eq!(response.total, 1);
    assert_eq!(response.query.as_deref(), Some("shirt"));
}

#[tokio::test]
async fn test_category_filter() {
    let service = service_over(&wardrobe()).await;

    let request = SearchRequest::from_pairs([("category_id", "clothing")]).unwrap();
    let response = service.search(&request).await.unwrap();

    assert_eq!(response.documents.len(), 2);
    assert!(response.documents.iter().all(|d| d.category_id == "clothing"));
}

#[tokio::test]
async fn test_suggestions_for_prefix() {
    let products = vec![
        product("s-1", "Red Shirt", "clothing", 20.0),
        product("s-2", "Red Shoes", "footwear", 80.0),
        product("s-3", "Blue Jeans", "clothing", 60.0),
    ];
    let service = service_over(&products).await;

    let mut suggestions = service.suggest("Red", 10).await.unwrap();
    suggestions.sort();
    assert_eq!(suggestions, vec!["Red Shirt", "Red Shoes"]);
}

#[tokio::test]
async fn test_reconciliation_twice_leaves_one_document_per_product() {
    let catalog = seeded_catalog(bulk_products(23));
    let index = Arc::new(InMemoryIndex::new());
    let job = ReconciliationJob::new(
        catalog,
        index.clone(),
        &ReconciliationConfig {
            page_size: 5,
            ..Default::default()
        },
    );

    let first = job.run().await.unwrap();
    let second = job.run().await.unwrap();

    assert_eq!(first.pages, 5);
    assert_eq!(first.indexed, 23);
    assert_eq!(second.indexed, 23);
    assert_eq!(index.len(), 23);
}

#[tokio::test]
async fn test_reconciliation_counts_failed_pages_and_continues() {
    let catalog = seeded_catalog(bulk_products(4));
    let job = ReconciliationJob::new(
        catalog,
        Arc::new(FailingIndex::new()),
        &ReconciliationConfig {
            page_size: 2,
            ..Default::default()
        },
    );

    let report = job.run().await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.processed, 4);
    assert_eq!(report.failed, 4);
    assert_eq!(report.indexed, 0);
}

#[tokio::test]
async fn test_reconciliation_aborts_when_catalog_unavailable() {
    let job = ReconciliationJob::new(
        Arc::new(FailingCatalog),
        Arc::new(InMemoryIndex::new()),
        &ReconciliationConfig::default(),
    );

    assert!(matches!(job.run().await, Err(SearchError::Catalog(_))));
}

#[tokio::test]
async fn test_failing_index_falls_back_to_catalog() {
    let index = Arc::new(FailingIndex::new());
    let service = SearchService::new(
        SearchConfig::default(),
        index.clone(),
        seeded_catalog(wardrobe()),
    )
    .unwrap();

    let request = SearchRequest::text("shirt").with_facet(FacetField::Brand);
    let response = service.search(&request).await.unwrap();

    assert_eq!(index.query_count(), 1);
    assert_eq!(response.ids(), vec!["p-1"]);
    assert_eq!(response.total, 1);
    assert!(response.facets.is_empty());
}

#[tokio::test]
async fn test_zero_results_do_not_trigger_fallback() {
    // Catalog holds a match the index does not, so a fallback would be visible
    let service = SearchService::new(
        SearchConfig::default(),
        Arc::new(InMemoryIndex::new()),
        seeded_catalog(wardrobe()),
    )
    .unwrap();

    let response = service.search(&SearchRequest::text("shirt")).await.unwrap();
    assert_eq!(response.total, 0);
    assert!(response.documents.is_empty());
}

#[tokio::test]
async fn test_slow_index_times_out_into_fallback() {
    let slow = SlowIndex::new(seeded_index(&[]).await, Duration::from_secs(5));
    let config = SearchConfigBuilder::new().query_timeout_ms(50).build();
    let service = SearchService::new(config, Arc::new(slow), seeded_catalog(wardrobe())).unwrap();

    let started = std::time::Instant::now();
    let response = service.search(&SearchRequest::text("hat")).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(response.ids(), vec!["p-3"]);
}

#[tokio::test]
async fn test_both_backends_down_is_unavailable() {
    let service = SearchService::new(
        SearchConfig::default(),
        Arc::new(FailingIndex::new()),
        Arc::new(FailingCatalog),
    )
    .unwrap();

    let result = service.search(&SearchRequest::text("shirt")).await;
    assert!(matches!(result, Err(SearchError::Unavailable(_))));
}

#[tokio::test]
async fn test_validation_errors_never_reach_backend() {
    let index = Arc::new(FailingIndex::new());
    let service =
        SearchService::new(SearchConfig::default(), index.clone(), seeded_catalog(wardrobe()))
            .unwrap();

    for request in [
        SearchRequest::new().with_size(0),
        SearchRequest::new().with_size(-3),
        SearchRequest::new().with_offset(-1),
    ] {
        let result = service.search(&request).await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
    }
    assert_eq!(index.query_count(), 0);

    assert!(SearchRequest::from_pairs([("colour", "red")]).is_err());
    assert!(SearchRequest::from_pairs([("price_min", "cheap")]).is_err());
}

#[tokio::test]
async fn test_suggest_degrades_to_empty_on_failure() {
    let service = SearchService::new(
        SearchConfig::default(),
        Arc::new(FailingIndex::new()),
        seeded_catalog(wardrobe()),
    )
    .unwrap();

    assert!(service.suggest("Red", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_mutations_reach_index_through_hook() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let index = Arc::new(InMemoryIndex::new());
    let synchronizer = Arc::new(IndexSynchronizer::new(index.clone(), &DispatchConfig::default()));
    catalog.register_hook(synchronizer.clone());

    for doc in wardrobe() {
        catalog.save_product(doc).await.unwrap();
    }
    synchronizer.flush().await;
    assert_eq!(index.len(), 3);

    let renamed = product("p-1", "Crimson Shirt", "clothing", 19.99);
    catalog.save_product(renamed).await.unwrap();
    catalog.delete_product("p-3").await.unwrap();
    synchronizer.flush().await;

    assert_eq!(index.len(), 2);
    assert_eq!(index.get("p-1").map(|d| d.name), Some("Crimson Shirt".to_string()));
    assert!(index.get("p-3").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_successive_saves_of_one_product_apply_in_order() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let index = Arc::new(InMemoryIndex::new());
    let lagging = Arc::new(LaggingWriteIndex::new(
        index.clone(),
        "Shirt v1",
        Duration::from_millis(50),
    ));
    let synchronizer = Arc::new(IndexSynchronizer::new(lagging, &DispatchConfig::default()));
    catalog.register_hook(synchronizer.clone());

    catalog
        .save_product(product("p-1", "Shirt v1", "clothing", 10.0))
        .await
        .unwrap();
    catalog
        .save_product(product("p-1", "Shirt v2", "clothing", 12.0))
        .await
        .unwrap();
    synchronizer.flush().await;

    assert_eq!(catalog.get_product("p-1").map(|d| d.name), Some("Shirt v2".to_string()));
    assert_eq!(index.get("p-1").map(|d| d.name), Some("Shirt v2".to_string()));
}

#[tokio::test]
async fn test_reconciliation_removes_documents_deleted_while_index_was_down() {
    let catalog = seeded_catalog(wardrobe());
    let index = seeded_index(&wardrobe()).await;

    // The delete never reached the index
    let synchronizer = Arc::new(IndexSynchronizer::new(
        Arc::new(FailingIndex::new()),
        &DispatchConfig::default(),
    ));
    catalog.register_hook(synchronizer.clone());
    catalog.delete_product("p-2").await.unwrap();
    synchronizer.flush().await;
    assert!(index.get("p-2").is_some());

    let job = ReconciliationJob::new(catalog, index.clone(), &ReconciliationConfig::default());
    let report = job.run().await.unwrap();

    assert_eq!(report.removed, 1);
    assert!(index.get("p-2").is_none());
    let response = index.query(&SearchRequest::text("jeans")).await.unwrap();
    assert_eq!(response.total, 0);

    let report = job.run().await.unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(index.len(), 2);
}

#[tokio::test]
async fn test_catalog_writes_succeed_while_index_is_down() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let synchronizer = Arc::new(IndexSynchronizer::new(
        Arc::new(FailingIndex::new()),
        &DispatchConfig::default(),
    ));
    catalog.register_hook(synchronizer.clone());

    for doc in wardrobe() {
        catalog.save_product(doc).await.unwrap();
    }
    catalog.delete_product("p-2").await.unwrap();
    synchronizer.flush().await;

    assert_eq!(catalog.len(), 2);
}

#[tokio::test]
async fn test_reindex_by_ids() {
    let catalog = seeded_catalog(wardrobe());
    let index = Arc::new(InMemoryIndex::new());
    let job = ReconciliationJob::new(catalog, index.clone(), &ReconciliationConfig::default());

    let ids = vec!["p-1".to_string(), "p-3".to_string()];
    let report = job.reindex(Some(&ids)).await.unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(index.len(), 2);

    let report = job.reindex(None).await.unwrap();
    assert_eq!(report.indexed, 3);
    assert_eq!(index.len(), 3);
}

#[tokio::test]
async fn test_text_searches_are_recorded_for_analytics() {
    let store = Arc::new(InMemoryAnalyticsStore::new());
    let recorder = Arc::new(AnalyticsRecorder::new(&AnalyticsConfig::default(), store.clone()));
    let service = service_over(&wardrobe()).await.with_analytics(recorder.clone());

    service.search(&SearchRequest::text("shirt")).await.unwrap();
    service
        .search_for_user(&SearchRequest::text("socks"), Some("u-1".to_string()))
        .await
        .unwrap();
    // No free text: nothing to record
    service.search(&SearchRequest::new()).await.unwrap();
    recorder.flush().await;

    assert_eq!(store.len(), 2);

    let now = chrono::Utc::now();
    let summary = recorder
        .summary(now - chrono::Duration::hours(1), now + chrono::Duration::hours(1), None)
        .await
        .unwrap();
    assert_eq!(summary.total_searches, 2);
    assert!((summary.zero_result_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_search_system_wiring() {
    let config = catalog_search::Config::default();
    let catalog = seeded_catalog(wardrobe());
    let system = SearchSystem::build(&config, catalog.clone(), Arc::new(InMemoryAnalyticsStore::new()))
        .await
        .unwrap();
    catalog.register_hook(system.synchronizer.clone());

    system.reconciliation.run().await.unwrap();
    let response = system.service.search(&SearchRequest::text("hat")).await.unwrap();
    assert_eq!(response.ids(), vec!["p-3"]);

    catalog
        .save_product(product("p-4", "Straw Hat", "accessories", 30.0))
        .await
        .unwrap();
    system.synchronizer.flush().await;

    let response = system.service.search(&SearchRequest::text("hat")).await.unwrap();
    assert_eq!(response.total, 2);
}
