//! Engine-backed index against a mock Elasticsearch-compatible REST API

mod common;

use catalog_search::search::*;
use common::*;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;

fn engine_config(url: &str) -> SearchConfig {
    SearchConfigBuilder::new()
        .backend(SearchBackend::Engine)
        .engine_url(url)
        .index_name("products")
        .request_timeout_ms(1_000)
        .build()
}

fn engine(server: &Server) -> EngineBackedIndex {
    EngineBackedIndex::new(&engine_config(&server.url())).unwrap()
}

fn hits_body(products: &[catalog_search::models::ProductDocument], total: u64) -> serde_json::Value {
    let hits: Vec<serde_json::Value> = products
        .iter()
        .map(|p| json!({ "_id": p.id, "_score": 1.0, "_source": p }))
        .collect();
    json!({
        "took": 3,
        "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits }
    })
}

#[tokio::test]
async fn test_initialize_existing_index_is_noop() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", "/products")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let put = server.mock("PUT", "/products").expect(0).create_async().await;

    let index = engine(&server);
    index.initialize().await.unwrap();
    index.initialize().await.unwrap();

    head.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_initialize_creates_missing_index() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(404)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/products")
        .match_body(Matcher::PartialJson(json!({ "mappings": { "dynamic": "strict" } })))
        .with_status(200)
        .with_body(r#"{"acknowledged":true}"#)
        .expect(1)
        .create_async()
        .await;

    engine(&server).initialize().await.unwrap();
    put.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_index_creation_is_success() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("PUT", "/products")
        .with_status(400)
        .with_body(r#"{"error":{"type":"resource_already_exists_exception"},"status":400}"#)
        .create_async()
        .await;

    assert!(engine(&server).initialize().await.is_ok());
}

#[tokio::test]
async fn test_initialize_failure_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(500)
        .create_async()
        .await;

    assert!(matches!(
        engine(&server).initialize().await,
        Err(SearchError::IndexInitFailed(_))
    ));
}

#[tokio::test]
async fn test_query_decodes_hits_total_and_facets() {
    let mut server = Server::new_async().await;
    let products = wardrobe();
    let mut body = hits_body(&products[..1], 7);
    body["aggregations"] = json!({
        "facets": {
            "doc_count": 3,
            "filtered": {
                "doc_count": 3,
                "brand": {
                    "buckets": [
                        { "key": "Denimco", "doc_count": 1 },
                        { "key": "Acme", "doc_count": 2 }
                    ]
                }
            }
        }
    });

    let search = server
        .mock("POST", "/products/_search")
        .match_body(Matcher::PartialJson(json!({
            "from": 0,
            "size": 1,
            "track_total_hits": true
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let request = SearchRequest::text("shirt")
        .with_size(1)
        .with_facet(FacetField::Brand);
    let response = engine(&server).query(&request).await.unwrap();

    search.assert_async().await;
    assert_eq!(response.total, 7);
    assert_eq!(response.ids(), vec!["p-1"]);
    assert_eq!(
        response.facets["brand"],
        vec![FacetValue::new("Acme", 2), FacetValue::new("Denimco", 1)]
    );
}

#[tokio::test]
async fn test_missing_facet_aggregation_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/products/_search")
        .with_status(200)
        .with_body(hits_body(&wardrobe(), 3).to_string())
        .create_async()
        .await;

    let request = SearchRequest::new().with_facet(FacetField::Color);
    assert!(matches!(
        engine(&server).query(&request).await,
        Err(SearchError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_engine_outage_served_from_catalog() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/products/_search")
        .with_status(503)
        .with_body("unavailable")
        .create_async()
        .await;

    let config = engine_config(&server.url());
    let index = Arc::new(EngineBackedIndex::new(&config).unwrap());
    let service = SearchService::new(config, index, seeded_catalog(wardrobe())).unwrap();

    let request = SearchRequest::text("jeans").with_facet(FacetField::Brand);
    let response = service.search(&request).await.unwrap();

    assert_eq!(response.ids(), vec!["p-2"]);
    assert!(response.facets.is_empty());
}

#[tokio::test]
async fn test_undecodable_payload_served_from_catalog() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/products/_search")
        .with_status(200)
        .with_body("<html>proxy error</html>")
        .create_async()
        .await;

    let config = engine_config(&server.url());
    let index = Arc::new(EngineBackedIndex::new(&config).unwrap());
    let service = SearchService::new(config, index, seeded_catalog(wardrobe())).unwrap();

    let response = service.search(&SearchRequest::text("hat")).await.unwrap();
    assert_eq!(response.ids(), vec!["p-3"]);
}

#[tokio::test]
async fn test_index_document_initializes_then_puts() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/products/_doc/p-1")
        .match_body(Matcher::PartialJson(json!({ "id": "p-1", "name": "Red Shirt" })))
        .with_status(201)
        .with_body(r#"{"result":"created"}"#)
        .expect(2)
        .create_async()
        .await;

    let index = engine(&server);
    let doc = wardrobe().remove(0);
    index.index(&doc).await.unwrap();
    index.index(&doc).await.unwrap();

    put.assert_async().await;
}

#[tokio::test]
async fn test_delete_missing_document_is_success() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/products/_doc/gone")
        .with_status(404)
        .with_body(r#"{"result":"not_found"}"#)
        .create_async()
        .await;
    server
        .mock("DELETE", "/products/_doc/p-1")
        .with_status(500)
        .create_async()
        .await;

    let index = engine(&server);
    assert!(index.delete("gone").await.is_ok());
    assert!(matches!(
        index.delete("p-1").await,
        Err(SearchError::DeletionFailed(_))
    ));
}

#[tokio::test]
async fn test_bulk_index_reports_per_document_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(200)
        .create_async()
        .await;
    let bulk = server
        .mock("POST", "/_bulk")
        .match_header("content-type", "application/x-ndjson")
        .with_status(200)
        .with_body(
            json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "p-1", "status": 201 } },
                    { "index": { "_id": "p-2", "status": 400, "error": {
                        "type": "mapper_parsing_exception",
                        "reason": "failed to parse field [price]"
                    } } },
                    { "index": { "_id": "p-3", "status": 200 } }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let summary = engine(&server).bulk_index(&wardrobe()).await.unwrap();

    bulk.assert_async().await;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].id, "p-2");
    assert!(summary.failures[0].reason.contains("mapper_parsing_exception"));
}

#[tokio::test]
async fn test_suggest_collapses_duplicate_names() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/products/_search")
        .match_body(Matcher::PartialJson(json!({ "size": 5 })))
        .with_status(200)
        .with_body(
            json!({
                "hits": { "hits": [
                    { "_source": { "name": "Red Shirt" } },
                    { "_source": { "name": "Red Shirt" } },
                    { "_source": { "name": "Red Shoes" } }
                ] }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let suggestions = engine(&server).suggest("red", 5).await.unwrap();
    assert_eq!(suggestions, vec!["Red Shirt", "Red Shoes"]);
}

#[tokio::test]
async fn test_facet_values_capped_and_ordered_by_count() {
    let mut server = Server::new_async().await;

    // 25 colors in key order, counts cycling 1..=5 so ties need the value tiebreak
    let buckets: Vec<serde_json::Value> = (0..25)
        .map(|i| json!({ "key": format!("color-{:02}", i), "doc_count": i % 5 + 1 }))
        .collect();
    let mut body = hits_body(&[], 75);
    body["aggregations"] = json!({
        "facets": {
            "doc_count": 75,
            "filtered": { "doc_count": 75, "color": { "buckets": buckets } }
        }
    });
    server
        .mock("POST", "/products/_search")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let request = SearchRequest::new().with_facet(FacetField::Color);
    let response = engine(&server).query(&request).await.unwrap();
    let colors = &response.facets["color"];

    assert_eq!(colors.len(), MAX_FACET_VALUES);
    assert!(colors
        .windows(2)
        .all(|w| w[0].count > w[1].count || (w[0].count == w[1].count && w[0].value < w[1].value)));
    assert_eq!(colors[0], FacetValue::new("color-04", 5));
    // The five count-1 buckets are the ones cut
    assert!(colors.iter().all(|v| v.count > 1));
}

#[tokio::test]
async fn test_document_ids_scans_index() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/products")
        .with_status(200)
        .create_async()
        .await;
    let scan = server
        .mock("POST", "/products/_search")
        .match_body(Matcher::PartialJson(json!({
            "_source": false,
            "sort": [{ "id": "asc" }]
        })))
        .with_status(200)
        .with_body(
            json!({ "hits": { "hits": [
                { "_id": "p-1", "sort": ["p-1"] },
                { "_id": "p-2", "sort": ["p-2"] }
            ] } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let ids = engine(&server).document_ids().await.unwrap();

    scan.assert_async().await;
    assert_eq!(ids, vec!["p-1", "p-2"]);
}
