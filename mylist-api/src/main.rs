//! MyList API Server Entry Point
//!
//! Loads configuration, wires the membership store, content lookup and
//! cache backend selected by the environment, then serves the Axum router.

use std::sync::Arc;

use mylist_api::jobs::{cache_sweep_task, CacheSweepConfig};
use mylist_api::telemetry::{init_tracing, PrometheusCacheObserver, TelemetryConfig};
use mylist_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, CacheBackendKind, DbConfig, ListService,
    PgContentLookup, PgMembershipStore, StoreBackendKind,
};
use mylist_core::ContentLookup;
use mylist_storage::{
    CacheBackend, InMemoryCacheBackend, InMemoryCatalog, InMemoryMembershipStore, ListCache,
    LmdbCacheBackend, MembershipStore,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    api_config.validate()?;

    let (store, lookup) = build_store(&api_config).await?;
    let backend = build_cache_backend(&api_config)?;
    let cache = backend.clone().map(|backend| {
        ListCache::new(backend, &api_config.mylist, Arc::new(PrometheusCacheObserver))
    });

    let service = ListService::new(store, lookup, cache, api_config.mylist.clone());
    let app = create_api_router(service, &api_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = backend.map(|backend| {
        tokio::spawn(cache_sweep_task(
            backend,
            CacheSweepConfig::from(&api_config),
            shutdown_rx,
        ))
    });

    let addr = api_config.bind_addr()?;
    tracing::info!(
        %addr,
        store = ?api_config.store_backend,
        cache = ?api_config.cache_backend,
        "Starting MyList API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    Ok(())
}

async fn build_store(
    config: &ApiConfig,
) -> ApiResult<(Arc<dyn MembershipStore>, Arc<dyn ContentLookup>)> {
    match config.store_backend {
        StoreBackendKind::Memory => {
            let catalog = match &config.catalog_path {
                Some(path) => {
                    let catalog = InMemoryCatalog::load(path).map_err(|e| {
                        ApiError::internal_error(format!(
                            "Failed to load catalog {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    tracing::info!(path = %path.display(), "Loaded catalog fixture");
                    catalog
                }
                None => {
                    tracing::warn!("No MYLIST_CATALOG_PATH set, starting with an empty catalog");
                    InMemoryCatalog::new()
                }
            };
            let store: Arc<dyn MembershipStore> = Arc::new(InMemoryMembershipStore::new());
            let lookup: Arc<dyn ContentLookup> = Arc::new(catalog);
            Ok((store, lookup))
        }
        StoreBackendKind::Postgres => {
            let pool = DbConfig::from_env().create_pool()?;
            let pg_store = PgMembershipStore::new(pool.clone());
            pg_store.ensure_schema().await?;
            let store: Arc<dyn MembershipStore> = Arc::new(pg_store);
            let lookup: Arc<dyn ContentLookup> = Arc::new(PgContentLookup::new(pool));
            Ok((store, lookup))
        }
    }
}

fn build_cache_backend(config: &ApiConfig) -> ApiResult<Option<Arc<dyn CacheBackend>>> {
    match config.cache_backend {
        CacheBackendKind::Memory => Ok(Some(Arc::new(InMemoryCacheBackend::new()))),
        CacheBackendKind::Lmdb => {
            let backend = LmdbCacheBackend::new(&config.lmdb_path, config.lmdb_map_size_mb)
                .map_err(|e| {
                    ApiError::internal_error(format!("Failed to open LMDB cache: {}", e))
                })?;
            Ok(Some(Arc::new(backend)))
        }
        CacheBackendKind::Disabled => {
            tracing::warn!("List cache disabled, every read goes to the store");
            Ok(None)
        }
    }
}
