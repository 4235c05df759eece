//! Search request model: structured filters, sorting, pagination and facets

use crate::models::{ProductDocument, ProductStatus};
use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use strum::{Display, EnumString};
use validator::Validate;

/// Default number of documents per page
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Sort order for search results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    #[strum(serialize = "asc", serialize = "ascending")]
    Ascending,
    #[serde(rename = "desc")]
    #[strum(serialize = "desc", serialize = "descending")]
    Descending,
}

/// Field to sort by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortField {
    Relevance,
    Price,
    Name,
    CreatedAt,
    UpdatedAt,
    Stock,
    Id,
}

impl SortField {
    /// Direction used when a sort is requested without one
    pub fn default_order(&self) -> SortOrder {
        match self {
            SortField::Relevance | SortField::CreatedAt | SortField::UpdatedAt => {
                SortOrder::Descending
            }
            SortField::Price | SortField::Name | SortField::Stock | SortField::Id => {
                SortOrder::Ascending
            }
        }
    }
}

/// A single sort key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortOrder::Ascending)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortOrder::Descending)
    }

    /// Parse `field` or `field:direction` (e.g. `price:asc`)
    pub fn parse(raw: &str) -> SearchResult<Self> {
        let (field, order) = match raw.split_once(':') {
            Some((field, order)) => (field.trim(), Some(order.trim())),
            None => (raw.trim(), None),
        };

        let field = SortField::from_str(field)
            .map_err(|_| SearchError::Validation(format!("unrecognized sort field '{}'", field)))?;
        let order = match order {
            Some(order) => SortOrder::from_str(order).map_err(|_| {
                SearchError::Validation(format!("unrecognized sort direction '{}'", order))
            })?,
            None => field.default_order(),
        };

        Ok(Self { field, order })
    }
}

/// Facets that can be requested alongside a search
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FacetField {
    Brand,
    Color,
    Size,
    Status,
    PriceRange,
}

impl FacetField {
    pub const ALL: [FacetField; 5] = [
        FacetField::Brand,
        FacetField::Color,
        FacetField::Size,
        FacetField::Status,
        FacetField::PriceRange,
    ];

    /// Key under which this facet appears in a response
    pub fn name(&self) -> &'static str {
        match self {
            FacetField::Brand => "brand",
            FacetField::Color => "color",
            FacetField::Size => "size",
            FacetField::Status => "status",
            FacetField::PriceRange => "price_range",
        }
    }
}

/// Fixed price-range bucket (lower bound inclusive, upper bound exclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBucket {
    pub key: &'static str,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

impl PriceBucket {
    pub fn contains(&self, price: f64) -> bool {
        self.from.map_or(true, |from| price >= from) && self.to.map_or(true, |to| price < to)
    }
}

/// Buckets used by the `price_range` facet
pub const PRICE_BUCKETS: [PriceBucket; 5] = [
    PriceBucket { key: "<25", from: None, to: Some(25.0) },
    PriceBucket { key: "25-50", from: Some(25.0), to: Some(50.0) },
    PriceBucket { key: "50-100", from: Some(50.0), to: Some(100.0) },
    PriceBucket { key: "100-200", from: Some(100.0), to: Some(200.0) },
    PriceBucket { key: "200+", from: Some(200.0), to: None },
];

/// Structured search filter.
///
/// Only the keys below are recognized; anything else is rejected when a
/// request is parsed rather than being silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SearchFilter {
    /// Restrict to specific product ids
    Ids(Vec<String>),
    #[serde(alias = "category_id")]
    Category(String),
    Status(ProductStatus),
    Brand(String),
    Color(String),
    Size(String),
    PriceMin(f64),
    PriceMax(f64),
    InStock(bool),
    Featured(bool),
}

impl SearchFilter {
    /// Parse a raw key/value pair (as found in a query string)
    pub fn parse(key: &str, value: &str) -> SearchResult<Self> {
        let key = key.trim();
        let value = value.trim();

        let filter = match key {
            "ids" | "id" => SearchFilter::Ids(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            "category" | "category_id" => SearchFilter::Category(non_empty(key, value)?),
            "status" => SearchFilter::Status(
                ProductStatus::from_str(value).map_err(|_| invalid_value(key, value))?,
            ),
            "brand" => SearchFilter::Brand(non_empty(key, value)?),
            "color" => SearchFilter::Color(non_empty(key, value)?),
            "size" => SearchFilter::Size(non_empty(key, value)?),
            "price_min" => SearchFilter::PriceMin(parse_price(key, value)?),
            "price_max" => SearchFilter::PriceMax(parse_price(key, value)?),
            "in_stock" => SearchFilter::InStock(parse_bool(key, value)?),
            "featured" => SearchFilter::Featured(parse_bool(key, value)?),
            other => {
                return Err(SearchError::Validation(format!(
                    "unrecognized filter key '{}'",
                    other
                )))
            }
        };

        filter.check()?;
        Ok(filter)
    }

    /// Canonical key of this filter
    pub fn key(&self) -> &'static str {
        match self {
            SearchFilter::Ids(_) => "ids",
            SearchFilter::Category(_) => "category",
            SearchFilter::Status(_) => "status",
            SearchFilter::Brand(_) => "brand",
            SearchFilter::Color(_) => "color",
            SearchFilter::Size(_) => "size",
            SearchFilter::PriceMin(_) => "price_min",
            SearchFilter::PriceMax(_) => "price_max",
            SearchFilter::InStock(_) => "in_stock",
            SearchFilter::Featured(_) => "featured",
        }
    }

    /// Reference predicate: does the document satisfy this filter?
    pub fn matches(&self, doc: &ProductDocument) -> bool {
        match self {
            SearchFilter::Ids(ids) => ids.iter().any(|id| *id == doc.id),
            SearchFilter::Category(category) => doc.category_id == *category,
            SearchFilter::Status(status) => doc.status == *status,
            SearchFilter::Brand(brand) => doc.brand.as_deref() == Some(brand.as_str()),
            SearchFilter::Color(color) => doc.color.as_deref() == Some(color.as_str()),
            SearchFilter::Size(size) => doc.size.as_deref() == Some(size.as_str()),
            SearchFilter::PriceMin(min) => doc.price >= *min,
            SearchFilter::PriceMax(max) => doc.price <= *max,
            SearchFilter::InStock(in_stock) => doc.is_in_stock() == *in_stock,
            SearchFilter::Featured(featured) => doc.featured == *featured,
        }
    }

    fn check(&self) -> SearchResult<()> {
        match self {
            SearchFilter::Ids(ids) if ids.is_empty() => Err(SearchError::Validation(
                "filter 'ids' requires at least one id".to_string(),
            )),
            SearchFilter::PriceMin(price) | SearchFilter::PriceMax(price)
                if !price.is_finite() || *price < 0.0 =>
            {
                Err(SearchError::Validation(format!(
                    "filter '{}' must be a non-negative number",
                    self.key()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Check a whole filter set: every filter individually, then price bounds together
pub fn validate_filters(filters: &[SearchFilter]) -> SearchResult<()> {
    for filter in filters {
        filter.check()?;
    }

    let min = filters.iter().find_map(|f| match f {
        SearchFilter::PriceMin(min) => Some(*min),
        _ => None,
    });
    let max = filters.iter().find_map(|f| match f {
        SearchFilter::PriceMax(max) => Some(*max),
        _ => None,
    });

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(SearchError::Validation(format!(
                "price_min ({}) exceeds price_max ({})",
                min, max
            )));
        }
    }

    Ok(())
}

/// Check whether a document satisfies every filter
pub fn matches_all(filters: &[SearchFilter], doc: &ProductDocument) -> bool {
    filters.iter().all(|filter| filter.matches(doc))
}

/// Case-insensitive substring match over name and description
pub fn matches_text(text: &str, doc: &ProductDocument) -> bool {
    let needle = text.to_lowercase();
    doc.name.to_lowercase().contains(&needle) || doc.description.to_lowercase().contains(&needle)
}

/// Order documents by the requested sort keys.
///
/// Relevance is not meaningful without a scoring engine and compares equal.
/// Remaining ties are broken by newest first, then id, so the order is total.
pub fn sort_documents(docs: &mut [ProductDocument], sort: &[SortSpec]) {
    docs.sort_by(|a, b| {
        for spec in sort {
            let ordering = match spec.field {
                SortField::Relevance => Ordering::Equal,
                SortField::Price => a.price.total_cmp(&b.price),
                SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Stock => a.stock.cmp(&b.stock),
                SortField::Id => a.id.cmp(&b.id),
            };
            let ordering = match spec.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn non_empty(key: &str, value: &str) -> SearchResult<String> {
    if value.is_empty() {
        Err(invalid_value(key, value))
    } else {
        Ok(value.to_string())
    }
}

fn parse_price(key: &str, value: &str) -> SearchResult<f64> {
    value.parse::<f64>().map_err(|_| invalid_value(key, value))
}

fn parse_bool(key: &str, value: &str) -> SearchResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid_value(key, value)),
    }
}

fn invalid_value(key: &str, value: &str) -> SearchError {
    SearchError::Validation(format!("invalid value '{}' for filter '{}'", value, key))
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub size: usize,
}

/// Main search request structure
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    /// Optional free-text query
    #[serde(default)]
    #[validate(length(max = 512))]
    pub query: Option<String>,

    /// Structured filters, all of which must match
    #[serde(default)]
    pub filters: Vec<SearchFilter>,

    /// Sort keys in priority order (empty means relevance, then newest)
    #[serde(default)]
    pub sort: Vec<SortSpec>,

    /// Offset for pagination
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offset: i64,

    /// Number of results to return
    #[serde(default = "default_size")]
    #[validate(range(min = 1))]
    pub size: i64,

    /// Facets to compute
    #[serde(default)]
    pub facets: Vec<FacetField>,
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            filters: Vec::new(),
            sort: Vec::new(),
            offset: 0,
            size: DEFAULT_PAGE_SIZE,
            facets: Vec::new(),
        }
    }
}

impl SearchRequest {
    /// Create a request matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a free-text request
    pub fn text(query: impl Into<String>) -> Self {
        Self::new().with_query(query)
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn with_facet(mut self, facet: FacetField) -> Self {
        if !self.facets.contains(&facet) {
            self.facets.push(facet);
        }
        self
    }

    /// Build a request from raw query-string pairs.
    ///
    /// `q`, `offset`, `limit`, `sort` and `facets` are request parameters; every
    /// other key must be a recognized filter. `size` is the product size filter,
    /// so the page size is spelled `limit` (or `page_size`).
    pub fn from_pairs<I, K, V>(pairs: I) -> SearchResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref().trim(), value.as_ref().trim());
            match key {
                "q" | "query" => request.query = Some(value.to_string()),
                "offset" => request.offset = parse_int(key, value)?,
                "limit" | "page_size" => request.size = parse_int(key, value)?,
                "sort" => {
                    for raw in value.split(',').filter(|s| !s.trim().is_empty()) {
                        request.sort.push(SortSpec::parse(raw)?);
                    }
                }
                "facets" => {
                    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        let facet = FacetField::from_str(raw).map_err(|_| {
                            SearchError::Validation(format!("unrecognized facet '{}'", raw))
                        })?;
                        request = request.with_facet(facet);
                    }
                }
                _ => request.filters.push(SearchFilter::parse(key, value)?),
            }
        }

        Ok(request)
    }

    /// Free text, if any non-blank text was supplied
    pub fn text_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Validate the request shape and return its pagination window
    pub fn page(&self) -> SearchResult<Page> {
        Validate::validate(self)?;
        validate_filters(&self.filters)?;

        let offset = usize::try_from(self.offset)
            .map_err(|_| SearchError::Validation("offset must be non-negative".to_string()))?;
        let size = usize::try_from(self.size)
            .map_err(|_| SearchError::Validation("size must be positive".to_string()))?;

        Ok(Page { offset, size })
    }
}

fn parse_int(key: &str, value: &str) -> SearchResult<i64> {
    value
        .parse::<i64>()
        .map_err(|_| SearchError::Validation(format!("'{}' must be an integer, got '{}'", key, value)))
}
