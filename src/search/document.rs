//! Engine index layout: field names and the product mapping

use crate::search::config::EngineConfig;
use crate::search::query::{FacetField, SortField};
use serde_json::{json, Value};

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const NAME_KEYWORD: &str = "name.keyword";
pub const CATEGORY: &str = "category_id";
pub const STATUS: &str = "status";
pub const BRAND_KEYWORD: &str = "brand.keyword";
pub const COLOR: &str = "color";
pub const SIZE: &str = "size";
pub const PRICE: &str = "price";
pub const STOCK: &str = "stock";
pub const FEATURED: &str = "featured";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Free-text fields with their relevance boosts (name 3x, description 2x)
pub const TEXT_FIELDS: [&str; 4] = ["name^3", "description^2", "brand", "sku"];

/// Field a facet aggregates over
pub fn facet_field(facet: FacetField) -> &'static str {
    match facet {
        FacetField::Brand => BRAND_KEYWORD,
        FacetField::Color => COLOR,
        FacetField::Size => SIZE,
        FacetField::Status => STATUS,
        FacetField::PriceRange => PRICE,
    }
}

/// Field a sort key orders by
pub fn sort_field(field: SortField) -> &'static str {
    match field {
        SortField::Relevance => "_score",
        SortField::Price => PRICE,
        SortField::Name => NAME_KEYWORD,
        SortField::CreatedAt => CREATED_AT,
        SortField::UpdatedAt => UPDATED_AT,
        SortField::Stock => STOCK,
        SortField::Id => ID,
    }
}

/// Index settings and mapping for product documents.
///
/// - keyword: category, status, color, size (and `brand.keyword`, `sku.keyword`, `name.keyword`)
/// - text: name, description, brand, sku
/// - numeric: price, stock, weight
/// - `attributes` and `images` are stored but not indexed
pub fn product_index_mapping(config: &EngineConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.shards,
            "number_of_replicas": config.replicas
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "sku": {
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword" } }
                },
                "name": {
                    "type": "text",
                    "analyzer": "standard",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
                },
                "description": { "type": "text", "analyzer": "standard" },
                "category_id": { "type": "keyword" },
                "price": { "type": "double" },
                "currency": { "type": "keyword" },
                "stock": { "type": "long" },
                "status": { "type": "keyword" },
                "brand": {
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
                },
                "color": { "type": "keyword" },
                "size": { "type": "keyword" },
                "weight": { "type": "double" },
                "attributes": { "type": "object", "enabled": false },
                "featured": { "type": "boolean" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" },
                "images": { "type": "keyword", "index": false }
            }
        }
    })
}
