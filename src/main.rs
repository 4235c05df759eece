use anyhow::{Context, Result};
use catalog_search::{
    analytics::{AnalyticsRecord, AnalyticsRecorder, AnalyticsStore, InMemoryAnalyticsStore},
    catalog::InMemoryCatalog,
    config::{Config, ObservabilityConfig},
    metrics::{gather_metrics, init_metrics},
    search::{SearchBackend, SearchRequest, SearchSystem},
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Product catalog search and indexing", version, long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "CATALOG_SEARCH_CONFIG")]
    config: Option<String>,

    /// Product fixture (JSON array) overriding catalog.fixture_path
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the search index if it does not exist
    Init,

    /// Run a search
    Search {
        /// Free-text query
        #[arg(short, long)]
        query: Option<String>,

        /// Structured filter, repeatable (e.g. brand=acme, price_min=10)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Sort key, repeatable (e.g. price:asc)
        #[arg(short, long)]
        sort: Vec<String>,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        #[arg(long, default_value_t = 20)]
        size: i64,

        /// Facet to compute, repeatable (brand, color, size, status, price_range)
        #[arg(long = "facet")]
        facets: Vec<String>,

        /// User recorded with the search analytics
        #[arg(long)]
        user: Option<String>,
    },

    /// Suggest product names for a prefix
    Suggest {
        #[arg(value_name = "PREFIX")]
        prefix: String,

        #[arg(short = 'n', long, default_value_t = 10)]
        size: usize,
    },

    /// Rebuild the index from the catalog
    Reindex {
        /// Only these product ids (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "follow")]
        ids: Option<Vec<String>>,

        /// Keep running and repeat on reconciliation.schedule until Ctrl-C
        #[arg(long)]
        follow: bool,
    },

    /// Summarize exported search analytics records
    Analytics {
        /// JSON array of analytics records
        #[arg(long, value_name = "PATH")]
        records: PathBuf,

        /// Look-back window in days
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Number of top terms
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.observability);

    if config.observability.prometheus_enabled {
        if let Err(e) = init_metrics() {
            tracing::warn!(error = %e, "Failed to initialize metrics, continuing without them");
        }
    }

    tracing::info!(
        service = %config.observability.service_name,
        backend = ?config.search.backend,
        "Starting catalog-search v{}",
        env!("CARGO_PKG_VERSION")
    );

    let catalog = Arc::new(match cli.catalog.as_ref().or(config.catalog.fixture_path.as_ref()) {
        Some(path) => InMemoryCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
        None => InMemoryCatalog::new(),
    });

    let system = SearchSystem::build(&config, catalog.clone(), Arc::new(InMemoryAnalyticsStore::new()))
        .await
        .context("Failed to build search system")?;
    catalog.register_hook(system.synchronizer.clone());

    match cli.command {
        Commands::Init => {
            system
                .index
                .initialize()
                .await
                .context("Failed to initialize search index")?;
            print_json(&serde_json::json!({
                "backend": system.index.backend_name(),
                "initialized": true,
            }))?;
        }

        Commands::Search {
            query,
            filters,
            sort,
            offset,
            size,
            facets,
            user,
        } => {
            warm_up(&system, &config).await?;

            let mut pairs: Vec<(String, String)> = vec![
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), size.to_string()),
            ];
            if let Some(query) = query {
                pairs.push(("q".to_string(), query));
            }
            for raw in &filters {
                let (key, value) = raw
                    .split_once('=')
                    .with_context(|| format!("Filter '{}' must be KEY=VALUE", raw))?;
                pairs.push((key.to_string(), value.to_string()));
            }
            if !sort.is_empty() {
                pairs.push(("sort".to_string(), sort.join(",")));
            }
            if !facets.is_empty() {
                pairs.push(("facets".to_string(), facets.join(",")));
            }

            let request = SearchRequest::from_pairs(pairs)?;
            let response = system.service.search_for_user(&request, user).await?;
            system.analytics.flush().await;
            print_json(&response)?;
        }

        Commands::Suggest { prefix, size } => {
            warm_up(&system, &config).await?;
            let suggestions = system.service.suggest(&prefix, size).await?;
            print_json(&suggestions)?;
        }

        Commands::Reindex { ids, follow } => {
            let report = system.reconciliation.reindex(ids.as_deref()).await?;
            print_json(&report)?;

            if follow {
                let cron = config
                    .reconciliation
                    .schedule
                    .as_deref()
                    .context("--follow requires reconciliation.schedule")?;
                let mut scheduler = system.reconciliation.clone().schedule(cron).await?;

                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for shutdown signal")?;
                tracing::info!("Shutting down reconciliation schedule");
                scheduler
                    .shutdown()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to stop scheduler: {}", e))?;
            }
        }

        Commands::Analytics {
            records,
            days,
            limit,
        } => {
            let raw = std::fs::read_to_string(&records)
                .with_context(|| format!("Failed to read {}", records.display()))?;
            let records: Vec<AnalyticsRecord> =
                serde_json::from_str(&raw).context("Invalid analytics records")?;

            let store = Arc::new(InMemoryAnalyticsStore::new());
            for record in records {
                store.append(record).await?;
            }

            let recorder = AnalyticsRecorder::new(&config.analytics, store);
            let end = Utc::now();
            let summary = recorder
                .summary(end - Duration::days(days), end, limit)
                .await?;
            print_json(&summary)?;
        }
    }

    system.synchronizer.flush().await;

    if cli.metrics {
        eprintln!("{}", gather_metrics());
    }

    Ok(())
}

/// Load the catalog into an index that does not persist between runs
async fn warm_up(system: &SearchSystem, config: &Config) -> Result<()> {
    if config.search.backend == SearchBackend::Memory || config.reconciliation.run_on_startup {
        let report = system
            .reconciliation
            .run()
            .await
            .context("Failed to populate search index")?;
        tracing::debug!(indexed = report.indexed, "Search index populated from catalog");
    }
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("catalog_search={}", observability.log_level).into());

    // stdout carries command output
    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
