use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elearning::config::{AppConfig, IdentitySource};
use elearning::identity::{HttpIdentityProvider, IdentityProvider, StaticIdentityProvider};
use elearning::services::CatalogService;
use elearning::storage::{BlobStore, HttpBlobStore, MemoryBlobStore};
use elearning::{AppState, app, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "elearning=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url, config.db_max_connections).await?;

    let identity: Arc<dyn IdentityProvider> = match config.identity_source() {
        IdentitySource::Remote(url) => {
            info!("using identity provider at {}", url);
            Arc::new(HttpIdentityProvider::new(url)?)
        }
        IdentitySource::DevTokens => {
            warn!("ALLOW_DEV_TOKENS is set, accepting self-asserted tokens (role:user_id)");
            Arc::new(StaticIdentityProvider::with_dev_tokens())
        }
        IdentitySource::Disabled => {
            warn!("IDENTITY_URL not set, every authenticated request will be refused");
            Arc::new(StaticIdentityProvider::new())
        }
    };

    let storage: Arc<dyn BlobStore> = match (&config.blob_storage_url, &config.blob_public_url) {
        (Some(upload), Some(public)) => Arc::new(HttpBlobStore::new(upload.clone(), public.clone())?),
        _ => {
            info!("BLOB_STORAGE_URL not set, documents are kept in memory");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let state = AppState {
        db: pool.clone(),
        identity,
        storage,
    };

    if config.seed_categories {
        CatalogService::new(pool.clone(), state.storage.clone())
            .seed_default_categories()
            .await?;
    }

    let app = app(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
