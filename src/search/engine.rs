//! `SearchIndex` backed by an external Elasticsearch-compatible engine.

use crate::models::ProductDocument;
use crate::search::config::{EngineConfig, SearchConfig};
use crate::search::document::product_index_mapping;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{BulkIndexSummary, SearchIndex};
use crate::search::query::SearchRequest;
use crate::search::response::SearchResponse;
use crate::search::translator::{build_bulk_body, decode_bulk_response, QueryTranslator};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Ids fetched per page when listing the whole index
const ID_SCAN_PAGE_SIZE: usize = 1_000;

/// Engine-backed search index
pub struct EngineBackedIndex {
    client: Client,
    config: EngineConfig,
    translator: QueryTranslator,
    initialized: OnceCell<()>,
}

impl EngineBackedIndex {
    /// Create a client for the configured engine. No request is made until first use.
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.engine.request_timeout_ms))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Url::parse(&config.engine.url).map_err(|e| {
            SearchError::InvalidConfiguration(format!("invalid engine url '{}': {}", config.engine.url, e))
        })?;

        Ok(Self {
            client,
            config: config.engine.clone(),
            translator: QueryTranslator::new(config.fuzziness.clone(), config.enable_facets),
            initialized: OnceCell::new(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.config.index_name
    }

    fn endpoint(&self, segments: &[&str]) -> SearchResult<Url> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|e| SearchError::InvalidConfiguration(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                SearchError::InvalidConfiguration(format!(
                    "engine url '{}' cannot be a base",
                    self.config.url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn write_endpoint(&self, segments: &[&str]) -> SearchResult<Url> {
        let mut url = self.endpoint(segments)?;
        if self.config.refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(username) => builder.basic_auth(username, self.config.password()),
            None => builder,
        }
    }

    async fn ensure_initialized(&self) -> SearchResult<()> {
        self.initialized
            .get_or_try_init(|| self.create_index_if_missing())
            .await
            .map(|_| ())
    }

    async fn create_index_if_missing(&self) -> SearchResult<()> {
        let index = self.config.index_name.as_str();
        let url = self.endpoint(&[index])?;

        let exists = self
            .request(Method::HEAD, url.clone())
            .send()
            .await
            .map_err(|e| SearchError::IndexInitFailed(e.to_string()))?;

        match exists.status() {
            status if status.is_success() => {
                debug!(index, "Index already exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            status => {
                return Err(SearchError::IndexInitFailed(format!(
                    "checking index {} returned status {}",
                    index, status
                )))
            }
        }

        let response = self
            .request(Method::PUT, url)
            .json(&product_index_mapping(&self.config))
            .send()
            .await
            .map_err(|e| SearchError::IndexInitFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(index, "Created search index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("resource_already_exists_exception") {
            debug!(index, "Index created concurrently");
            return Ok(());
        }

        Err(SearchError::IndexInitFailed(format!(
            "creating index {} returned status {}: {}",
            index, status, body
        )))
    }

    /// Require a 2xx status and decode the JSON body
    async fn read_json(response: Response) -> SearchResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendUnavailable(format!(
                "engine returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json::<Value>().await?)
    }

    async fn search_body(&self, body: &Value) -> SearchResult<Value> {
        let url = self.endpoint(&[self.config.index_name.as_str(), "_search"])?;
        let response = self.request(Method::POST, url).json(body).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl SearchIndex for EngineBackedIndex {
    async fn initialize(&self) -> SearchResult<()> {
        self.ensure_initialized().await
    }

    async fn index(&self, doc: &ProductDocument) -> SearchResult<()> {
        self.ensure_initialized().await?;

        let url = self.write_endpoint(&[self.config.index_name.as_str(), "_doc", doc.id.as_str()])?;
        let response = self.request(Method::PUT, url).json(doc).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::IndexingFailed(format!(
                "document {}: status {}: {}",
                doc.id, status, body
            )));
        }

        debug!(product_id = %doc.id, "Document indexed");
        Ok(())
    }

    async fn bulk_index(&self, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
        if docs.is_empty() {
            return Ok(BulkIndexSummary::default());
        }
        self.ensure_initialized().await?;

        let body = build_bulk_body(&self.config.index_name, docs)?;
        let url = self.write_endpoint(&["_bulk"])?;
        let response = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::IndexingFailed(format!(
                "bulk request returned status {}: {}",
                status, body
            )));
        }

        let summary = decode_bulk_response(response.json::<Value>().await?, docs)?;
        if summary.failed > 0 {
            warn!(
                total = summary.total,
                failed = summary.failed,
                "Bulk index completed with failures"
            );
        } else {
            debug!(total = summary.total, "Bulk index completed");
        }

        Ok(summary)
    }

    async fn delete(&self, id: &str) -> SearchResult<()> {
        let url = self.write_endpoint(&[self.config.index_name.as_str(), "_doc", id])?;
        let response = self.request(Method::DELETE, url).send().await?;

        match response.status() {
            status if status.is_success() => {
                debug!(product_id = %id, "Document deleted");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                debug!(product_id = %id, "Document already absent");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::DeletionFailed(format!(
                    "document {}: status {}: {}",
                    id, status, body
                )))
            }
        }
    }

    async fn query(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let page = request.page()?;
        let body = self.translator.build_search(request, page);
        let response = self.search_body(&body).await?;
        self.translator.decode_search(response, request, page)
    }

    async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() || size == 0 {
            return Ok(Vec::new());
        }

        let body = self.translator.build_suggest(prefix, size);
        let response = self.search_body(&body).await?;
        self.translator.decode_suggest(response, size)
    }

    async fn document_ids(&self) -> SearchResult<Vec<String>> {
        self.ensure_initialized().await?;

        let mut ids: Vec<String> = Vec::new();
        loop {
            let body = self
                .translator
                .build_id_scan(ID_SCAN_PAGE_SIZE, ids.last().map(String::as_str));
            let page = self.translator.decode_id_scan(self.search_body(&body).await?)?;

            let last_page = page.len() < ID_SCAN_PAGE_SIZE;
            ids.extend(page);
            if last_page {
                break;
            }
        }

        debug!(documents = ids.len(), "Listed indexed document ids");
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "engine"
    }
}
