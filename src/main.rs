use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planner::api::router;
use planner::catalog::{CatalogCache, CatalogSource, FileCatalogSource, HttpCatalogSource};
use planner::config::AppConfig;
use planner::services::PlannerService;
use planner::state::AppState;
use planner::store::SqliteBlobStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "planner=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(SqliteBlobStore::new(pool.clone()));
    let planner = Arc::new(PlannerService::open(store).await?);

    let source: Arc<dyn CatalogSource> = match &config.catalog_base_url {
        Some(url) => {
            info!("Loading catalogs from {}", url);
            Arc::new(HttpCatalogSource::new(url.clone())?)
        }
        None => {
            info!("Loading catalogs from {}", config.catalog_dir.display());
            Arc::new(FileCatalogSource::new(config.catalog_dir.clone()))
        }
    };
    let catalog = Arc::new(CatalogCache::new(source));

    // the UI starts on the default college; a missing file is not fatal
    if let Err(e) = catalog.select(config.default_college).await {
        warn!("Initial catalog load for {} failed: {}", config.default_college.name, e);
    }

    let state = AppState { planner, catalog };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
