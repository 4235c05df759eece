//! Translation between search requests and the engine's query DSL.
//!
//! Structured filters always land in a non-scoring `bool.filter` clause so
//! they narrow candidates without changing relevance. Facets are computed
//! under a `global` aggregation re-applying only those filters, which makes
//! facet counts describe everything matching the filters regardless of the
//! free-text score.

use crate::models::ProductDocument;
use crate::search::document::{self, TEXT_FIELDS};
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::BulkIndexSummary;
use crate::search::query::{FacetField, Page, SearchFilter, SearchRequest, SortOrder, PRICE_BUCKETS};
use crate::search::response::{normalize_facet_values, FacetValue, SearchResponse, MAX_FACET_VALUES};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

const FACETS_AGG: &str = "facets";
const FILTERED_AGG: &str = "filtered";

/// Builds engine request bodies and decodes engine responses
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    fuzziness: String,
    facets_enabled: bool,
}

impl QueryTranslator {
    pub fn new(fuzziness: impl Into<String>, facets_enabled: bool) -> Self {
        Self {
            fuzziness: fuzziness.into(),
            facets_enabled,
        }
    }

    /// Build a `_search` body for a validated request
    pub fn build_search(&self, request: &SearchRequest, page: Page) -> Value {
        let must = match request.text_query() {
            Some(text) => json!({
                "multi_match": {
                    "query": text,
                    "type": "best_fields",
                    "fields": TEXT_FIELDS,
                    "fuzziness": self.fuzziness,
                }
            }),
            None => json!({ "match_all": {} }),
        };

        let mut body = json!({
            "query": {
                "bool": {
                    "must": [must],
                    "filter": filter_clauses(&request.filters),
                }
            },
            "sort": sort_clauses(request),
            "from": page.offset,
            "size": page.size,
            "track_total_hits": true,
        });

        if self.facets_enabled && !request.facets.is_empty() {
            body["aggs"] = facet_aggregations(&request.filters, &request.facets);
        }

        body
    }

    /// Decode a `_search` response into a domain response
    pub fn decode_search(
        &self,
        body: Value,
        request: &SearchRequest,
        page: Page,
    ) -> SearchResult<SearchResponse> {
        let decoded: SearchBody = serde_json::from_value(body)?;

        let total = match decoded.hits.total {
            Some(TotalHits::Object { value }) | Some(TotalHits::Count(value)) => value,
            None => decoded.hits.hits.len() as u64,
        };

        let documents = decoded.hits.hits.into_iter().map(|hit| hit.source).collect();

        let facets = if self.facets_enabled && !request.facets.is_empty() {
            decode_facets(decoded.aggregations.as_ref(), &request.facets)?
        } else {
            BTreeMap::new()
        };

        Ok(SearchResponse {
            documents,
            total,
            facets,
            query: request.text_query().map(String::from),
            offset: page.offset,
            size: page.size,
            search_time_ms: decoded.took.unwrap_or(0),
        })
    }

    /// Build a prefix-suggestion body over product names
    pub fn build_suggest(&self, prefix: &str, size: usize) -> Value {
        json!({
            "size": size,
            "_source": [document::NAME],
            "query": {
                "prefix": {
                    (document::NAME_KEYWORD): {
                        "value": prefix,
                        "case_insensitive": true
                    }
                }
            },
            "collapse": { "field": document::NAME_KEYWORD },
            "sort": [{ (document::NAME_KEYWORD): "asc" }]
        })
    }

    /// Decode suggestion hits into distinct names
    pub fn decode_suggest(&self, body: Value, size: usize) -> SearchResult<Vec<String>> {
        let decoded: SuggestBody = serde_json::from_value(body)?;

        let mut seen = BTreeSet::new();
        let names = decoded
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.name)
            .filter(|name| seen.insert(name.clone()))
            .take(size)
            .collect();

        Ok(names)
    }

    /// Build one page of an id scan, resuming after `after`
    pub fn build_id_scan(&self, size: usize, after: Option<&str>) -> Value {
        let mut body = json!({
            "size": size,
            "_source": false,
            "query": { "match_all": {} },
            "sort": [{ (document::ID): "asc" }],
        });
        if let Some(after) = after {
            body["search_after"] = json!([after]);
        }
        body
    }

    /// Decode the ids of one id-scan page
    pub fn decode_id_scan(&self, body: Value) -> SearchResult<Vec<String>> {
        let decoded: IdScanBody = serde_json::from_value(body)?;
        Ok(decoded.hits.hits.into_iter().map(|hit| hit.id).collect())
    }
}

/// Non-scoring clauses for structured filters
pub fn filter_clauses(filters: &[SearchFilter]) -> Vec<Value> {
    filters.iter().map(filter_clause).collect()
}

fn filter_clause(filter: &SearchFilter) -> Value {
    match filter {
        SearchFilter::Ids(ids) => json!({ "ids": { "values": ids } }),
        SearchFilter::Category(category) => json!({ "term": { (document::CATEGORY): category } }),
        SearchFilter::Status(status) => {
            json!({ "term": { (document::STATUS): status.to_string() } })
        }
        SearchFilter::Brand(brand) => json!({ "term": { (document::BRAND_KEYWORD): brand } }),
        SearchFilter::Color(color) => json!({ "term": { (document::COLOR): color } }),
        SearchFilter::Size(size) => json!({ "term": { (document::SIZE): size } }),
        SearchFilter::PriceMin(min) => json!({ "range": { (document::PRICE): { "gte": min } } }),
        SearchFilter::PriceMax(max) => json!({ "range": { (document::PRICE): { "lte": max } } }),
        SearchFilter::InStock(true) => json!({ "range": { (document::STOCK): { "gt": 0 } } }),
        SearchFilter::InStock(false) => json!({ "range": { (document::STOCK): { "lte": 0 } } }),
        SearchFilter::Featured(featured) => {
            json!({ "term": { (document::FEATURED): featured } })
        }
    }
}

/// Explicit sort keys (or relevance), then newest, then id.
///
/// The trailing keys give the same total order the in-memory index uses.
fn sort_clauses(request: &SearchRequest) -> Value {
    let mut clauses: Vec<Value> = if request.sort.is_empty() {
        vec![json!({ "_score": { "order": "desc" } })]
    } else {
        request
            .sort
            .iter()
            .map(|spec| {
                let order = match spec.order {
                    SortOrder::Ascending => "asc",
                    SortOrder::Descending => "desc",
                };
                json!({ (document::sort_field(spec.field)): { "order": order } })
            })
            .collect()
    };

    clauses.push(json!({ (document::CREATED_AT): { "order": "desc" } }));
    clauses.push(json!({ (document::ID): { "order": "asc" } }));

    json!(clauses)
}

/// `global` > `filter` > per-facet aggregations
fn facet_aggregations(filters: &[SearchFilter], facets: &[FacetField]) -> Value {
    let scope = if filters.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "filter": filter_clauses(filters) } })
    };

    let mut aggs = serde_json::Map::new();
    for facet in facets {
        let agg = match facet {
            FacetField::PriceRange => {
                let ranges: Vec<Value> = PRICE_BUCKETS
                    .iter()
                    .map(|bucket| {
                        let mut range = json!({ "key": bucket.key });
                        if let Some(from) = bucket.from {
                            range["from"] = json!(from);
                        }
                        if let Some(to) = bucket.to {
                            range["to"] = json!(to);
                        }
                        range
                    })
                    .collect();
                json!({ "range": { "field": document::PRICE, "ranges": ranges } })
            }
            other => json!({
                "terms": {
                    "field": document::facet_field(*other),
                    "size": MAX_FACET_VALUES,
                    "order": [{ "_count": "desc" }, { "_key": "asc" }]
                }
            }),
        };
        aggs.insert(facet.name().to_string(), agg);
    }

    json!({
        FACETS_AGG: {
            "global": {},
            "aggs": {
                FILTERED_AGG: {
                    "filter": scope,
                    "aggs": aggs
                }
            }
        }
    })
}

fn decode_facets(
    aggregations: Option<&Value>,
    facets: &[FacetField],
) -> SearchResult<BTreeMap<String, Vec<FacetValue>>> {
    let scope = aggregations
        .and_then(|aggs| aggs.get(FACETS_AGG))
        .and_then(|agg| agg.get(FILTERED_AGG))
        .ok_or_else(|| {
            SearchError::MalformedResponse("facet aggregations missing from response".to_string())
        })?;

    let mut decoded = BTreeMap::new();
    for facet in facets {
        let buckets = match scope.get(facet.name()).and_then(|agg| agg.get("buckets")) {
            Some(buckets) => Vec::<Bucket>::deserialize(buckets)?,
            None => {
                return Err(SearchError::MalformedResponse(format!(
                    "aggregation '{}' missing from response",
                    facet.name()
                )))
            }
        };

        let values = buckets
            .into_iter()
            .map(|bucket| FacetValue::new(bucket.label(), bucket.doc_count))
            .collect();
        decoded.insert(facet.name().to_string(), normalize_facet_values(values));
    }

    Ok(decoded)
}

/// NDJSON body for `POST /_bulk`
pub fn build_bulk_body(index: &str, docs: &[ProductDocument]) -> SearchResult<String> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

/// Per-item outcome of a bulk response. Items the engine did not report are failures.
pub fn decode_bulk_response(body: Value, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
    let decoded: BulkBody = serde_json::from_value(body)?;
    let mut summary = BulkIndexSummary::new(docs.len());

    for (position, doc) in docs.iter().enumerate() {
        match decoded.items.get(position).map(|item| &item.index) {
            Some(item) if (200..300).contains(&item.status) && item.error.is_none() => {
                summary.record_success()
            }
            Some(item) => {
                let reason = item
                    .error
                    .as_ref()
                    .map(BulkError::describe)
                    .unwrap_or_else(|| format!("status {}", item.status));
                summary.record_failure(doc.id.clone(), reason);
            }
            None => summary.record_failure(doc.id.clone(), "missing from bulk response"),
        }
    }

    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    took: Option<u64>,
    hits: Hits<ProductDocument>,
    #[serde(default)]
    aggregations: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SuggestBody {
    hits: Hits<NameOnly>,
}

#[derive(Debug, Deserialize)]
struct IdScanBody {
    hits: IdHits,
}

#[derive(Debug, Deserialize)]
struct IdHits {
    hits: Vec<IdHit>,
}

#[derive(Debug, Deserialize)]
struct IdHit {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    #[serde(default)]
    total: Option<TotalHits>,
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_source")]
    source: T,
}

#[derive(Debug, Deserialize)]
struct NameOnly {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: Value,
    doc_count: u64,
}

impl Bucket {
    fn label(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkBody {
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(alias = "create", alias = "update")]
    index: BulkItemResult,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    status: u16,
    #[serde(default)]
    error: Option<BulkError>,
}

#[derive(Debug, Deserialize)]
struct BulkError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    reason: String,
}

impl BulkError {
    fn describe(&self) -> String {
        format!("{}: {}", self.kind, self.reason)
    }
}
