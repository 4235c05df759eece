use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};
use validator::Validate;

/// Denormalized, search-optimized projection of a catalog product.
///
/// The `id` is the catalog product id; the index holds at most one live
/// document per id and every write for an id replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProductDocument {
    /// Catalog product id
    #[validate(length(min = 1, max = 128))]
    pub id: String,

    /// Stock keeping unit
    pub sku: String,

    /// Display name
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    /// Long-form description
    #[serde(default)]
    pub description: String,

    /// Owning category
    pub category_id: String,

    /// Unit price
    #[validate(range(min = 0.0))]
    pub price: f64,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Units on hand
    #[serde(default)]
    pub stock: i64,

    /// Lifecycle status
    #[serde(default)]
    pub status: ProductStatus,

    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    /// Shipping weight
    #[serde(default)]
    pub weight: Option<f64>,

    /// Free-form custom attributes
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Merchandising flag
    #[serde(default)]
    pub featured: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Image references (URLs or storage keys)
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ProductDocument {
    /// Create a new active product document with no stock
    pub fn new(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        category_id: impl Into<String>,
        price: f64,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: id.into(),
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            category_id: category_id.into(),
            price,
            currency: default_currency(),
            stock: 0,
            status: ProductStatus::Active,
            brand: None,
            color: None,
            size: None,
            weight: None,
            attributes: HashMap::new(),
            featured: false,
            created_at: now,
            updated_at: now,
            images: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = self.updated_at.max(created_at);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Check whether any units are available
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Product lifecycle status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProductStatus {
    Draft,
    #[default]
    Active,
    Inactive,
    Archived,
}
