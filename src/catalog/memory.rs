use super::{CatalogMutationHook, CatalogPage, CatalogQuery, CatalogStore};
use crate::error::{AppError, Result};
use crate::models::ProductDocument;
use crate::search::query::{matches_all, matches_text, sort_documents};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// In-memory catalog store
pub struct InMemoryCatalog {
    products: DashMap<String, ProductDocument>,
    hooks: RwLock<Vec<Arc<dyn CatalogMutationHook>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Create a catalog pre-populated with products (no hooks run)
    pub fn with_products(products: impl IntoIterator<Item = ProductDocument>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.products.insert(product.id.clone(), product);
        }
        catalog
    }

    /// Load a JSON array of products
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let products: Vec<ProductDocument> = serde_json::from_str(&raw)?;

        for product in &products {
            product.validate()?;
        }

        info!(
            path = %path.display(),
            products = products.len(),
            "Loaded catalog fixture"
        );

        Ok(Self::with_products(products))
    }

    /// Register a hook to run after every committed mutation
    pub fn register_hook(&self, hook: Arc<dyn CatalogMutationHook>) {
        self.hooks.write().push(hook);
    }

    fn hooks(&self) -> Vec<Arc<dyn CatalogMutationHook>> {
        self.hooks.read().clone()
    }

    /// Create or update a product, then notify hooks
    pub async fn save_product(&self, mut product: ProductDocument) -> Result<ProductDocument> {
        product.validate()?;

        if let Some(existing) = self.products.get(&product.id) {
            product.created_at = existing.created_at;
        }
        product.updated_at = Utc::now().max(product.created_at);

        self.products.insert(product.id.clone(), product.clone());
        debug!(product_id = %product.id, "Product saved");

        for hook in self.hooks() {
            hook.on_product_saved(&product).await;
        }

        Ok(product)
    }

    /// Delete a product, then notify hooks
    pub async fn delete_product(&self, id: &str) -> Result<()> {
        if self.products.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Product {} not found", id)));
        }
        debug!(product_id = %id, "Product deleted");

        for hook in self.hooks() {
            hook.on_product_deleted(id).await;
        }

        Ok(())
    }

    pub fn get_product(&self, id: &str) -> Option<ProductDocument> {
        self.products.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn list_products(&self, query: &CatalogQuery) -> Result<CatalogPage> {
        let text = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let mut matched: Vec<ProductDocument> = self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| matches_all(&query.filters, p))
            .filter(|p| text.map_or(true, |t| matches_text(t, p)))
            .filter(|p| {
                query
                    .after_id
                    .as_deref()
                    .map_or(true, |after| p.id.as_str() > after)
            })
            .collect();

        sort_documents(&mut matched, &query.sort);

        let total = matched.len();
        let products: Vec<ProductDocument> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        let has_more = query.offset + products.len() < total;

        Ok(CatalogPage {
            products,
            total: total as u64,
            has_more,
        })
    }

    async fn get_products(&self, ids: &[String]) -> Result<Vec<ProductDocument>> {
        Ok(ids.iter().filter_map(|id| self.get_product(id)).collect())
    }
}
