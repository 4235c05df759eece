//! Catalog Search
//!
//! Product search and indexing for the e-commerce catalog: a pluggable search
//! index, background synchronization from catalog writes, degraded-mode
//! fallback to the catalog, search analytics and index reconciliation.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;

pub use config::Config;
pub use error::{AppError, Result};
