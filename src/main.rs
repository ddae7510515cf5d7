use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use filestore::application::ports::document_store::DocumentStore;
use filestore::application::ports::object_store::ObjectStore;
use filestore::bootstrap::app_context::{AppContext, AppServices};
use filestore::bootstrap::config::{Config, DocumentBackend, ObjectBackend};
use filestore::infrastructure::appwrite::AppwriteClient;
use filestore::infrastructure::memory::{MemoryDocumentStore, MemoryObjectStore};
use filestore::infrastructure::revalidation::BroadcastRevalidator;
use filestore::infrastructure::users::DocumentUserDirectory;

fn build_cors(cfg: &Config) -> CorsLayer {
    let methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::DELETE,
        http::Method::PATCH,
        http::Method::OPTIONS,
    ];
    let headers = [http::header::CONTENT_TYPE, http::header::AUTHORIZATION];
    match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
        // Production requires FRONTEND_URL (checked by Config); deny everything otherwise
        _ if cfg.is_production => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
                "http://invalid",
            )))
            .allow_methods(methods)
            .allow_headers(headers),
        // Development convenience
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "filestore=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        document_backend = ?cfg.document_backend,
        object_backend = ?cfg.object_backend,
        api_port = cfg.api_port,
        "Starting file storage backend"
    );
    if cfg.storage_quota_bytes != cfg.display_quota_bytes {
        warn!(
            storage_quota_bytes = cfg.storage_quota_bytes,
            display_quota_bytes = cfg.display_quota_bytes,
            "storage_quota_differs_from_display_quota"
        );
    }

    let appwrite = match (cfg.document_backend, cfg.object_backend) {
        (DocumentBackend::Appwrite, _) | (_, ObjectBackend::Appwrite) => {
            Some(Arc::new(AppwriteClient::from_config(&cfg)?))
        }
        _ => None,
    };

    let document_store: Arc<dyn DocumentStore> = match cfg.document_backend {
        DocumentBackend::Appwrite => match &appwrite {
            Some(client) => client.clone(),
            None => anyhow::bail!("Appwrite client not configured"),
        },
        DocumentBackend::Postgres => {
            let database_url = cfg
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
            let pool = filestore::infrastructure::db::connect_pool(database_url).await?;
            filestore::infrastructure::db::migrate(&pool).await?;
            Arc::new(
                filestore::infrastructure::db::repositories::document_store_sqlx::SqlxDocumentStore::new(
                    pool,
                ),
            )
        }
        DocumentBackend::Memory => {
            warn!("memory_document_store_in_use");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let object_store: Arc<dyn ObjectStore> = match cfg.object_backend {
        ObjectBackend::Appwrite => match &appwrite {
            Some(client) => client.clone(),
            None => anyhow::bail!("Appwrite client not configured"),
        },
        ObjectBackend::S3 => {
            Arc::new(filestore::infrastructure::storage::s3_object_store::S3ObjectStore::new(&cfg).await?)
        }
        ObjectBackend::Memory => {
            warn!("memory_object_store_in_use");
            Arc::new(MemoryObjectStore::new(format!(
                "http://localhost:{}/objects",
                cfg.api_port
            )))
        }
    };

    let (revalidation_tx, _) = broadcast::channel(256);
    let user_directory = Arc::new(DocumentUserDirectory::new(document_store.clone()));
    let revalidator = Arc::new(BroadcastRevalidator::new(revalidation_tx.clone()));

    let services = AppServices::new(
        document_store,
        object_store,
        user_directory,
        revalidator,
        revalidation_tx,
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let app = filestore::presentation::http::api_router(ctx)
        .layer(build_cors(&cfg))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;

    let api_handle: JoinHandle<anyhow::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(?e, "shutdown_signal_failed");
                }
            })
            .await?;
        Ok(())
    });

    match api_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(?e, "API server task failed"),
        Err(e) => error!(?e, "API server task panicked"),
    }
    Ok(())
}
