use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use attachments_api::application::ports::blob_storage::BlobStorage;
use attachments_api::application::services::attachments::AttachmentResolver;
use attachments_api::bootstrap::app_context::{AppContext, AppServices};
use attachments_api::bootstrap::config::{Config, StorageBackend};
use attachments_api::presentation::http::health::HealthState;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            attachments_api::presentation::http::attachments::upload_files,
            attachments_api::presentation::http::attachments::upload_files_pending,
            attachments_api::presentation::http::attachments::replace_files,
            attachments_api::presentation::http::attachments::upload_from_url,
            attachments_api::presentation::http::attachments::list_files,
            attachments_api::presentation::http::attachments::resolve_url,
            attachments_api::presentation::http::attachments::resolve_all_urls,
            attachments_api::presentation::http::attachments::delete_files,
            attachments_api::presentation::http::health::health,
        ),
        components(schemas(
            attachments_api::presentation::http::attachments::FileRecordResponse,
            attachments_api::presentation::http::attachments::FileListResponse,
            attachments_api::presentation::http::attachments::UploadFilesMultipart,
            attachments_api::presentation::http::attachments::UploadFromUrlBody,
            attachments_api::presentation::http::attachments::UrlResponse,
            attachments_api::presentation::http::attachments::UrlsResponse,
            attachments_api::presentation::http::attachments::DeleteFilesResponse,
            attachments_api::presentation::http::health::HealthResp,
        )),
        tags(
            (name = "Attachments", description = "Files attached to owner records"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "attachments_api=debug,axum=info,tower_http=info,sqlx=warn".into()
        }))
        .init();

    let cfg = Config::from_env()?;
    info!(
        port = cfg.api_port,
        backend = ?cfg.storage_backend,
        uploads_dir = %cfg.uploads_dir,
        max_id_fallback = cfg.allow_max_id_fallback,
        "Starting attachments service"
    );

    // Database
    let pool =
        attachments_api::infrastructure::db::connect_pool(&cfg.database_url, cfg.db_max_connections)
            .await?;
    attachments_api::infrastructure::db::migrate(&pool).await?;

    let blob_storage: Arc<dyn BlobStorage> = match cfg.storage_backend {
        StorageBackend::Filesystem => {
            // Ensure uploads dir exists
            if let Err(e) = tokio::fs::create_dir_all(&cfg.uploads_dir).await {
                tracing::warn!(error=?e, dir=%cfg.uploads_dir, "Failed to create uploads dir");
            }
            Arc::new(
                attachments_api::infrastructure::storage::fs::FsBlobStorage::new(
                    &cfg.uploads_dir,
                ),
            )
        }
        StorageBackend::S3 => Arc::new(
            attachments_api::infrastructure::storage::s3::S3BlobStorage::new(&cfg).await?,
        ),
    };
    let records = Arc::new(
        attachments_api::infrastructure::db::repositories::file_record_repository_sqlx::SqlxFileRecordRepository::new(
            pool.clone(),
        ),
    );
    let fetcher = Arc::new(
        attachments_api::infrastructure::fetch::file_fetcher_reqwest::ReqwestFileFetcher::new(
            Duration::from_secs(cfg.fetch_timeout_secs),
        )?,
    );
    let urls = Arc::new(
        attachments_api::infrastructure::urls::configured_url_builder::ConfiguredUrlBuilder::new(
            cfg.public_base_url.clone(),
            cfg.default_assets.clone(),
            cfg.default_asset.clone(),
        ),
    );

    let mut resolver = AttachmentResolver::new(records, blob_storage.clone(), fetcher, urls);
    if cfg.allow_max_id_fallback {
        tracing::warn!("max_id_fallback_enabled");
        resolver = resolver.with_owner_id_probe(Arc::new(
            attachments_api::infrastructure::db::repositories::owner_id_probe_sqlx::SqlxOwnerIdProbe::new(
                pool.clone(),
            ),
        ));
    }

    let services = AppServices::new(resolver, blob_storage.clone());
    let ctx = AppContext::new(cfg.clone(), services);

    let methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::DELETE,
        http::Method::OPTIONS,
    ];
    let headers = [http::header::CONTENT_TYPE, http::header::AUTHORIZATION];
    let cors = match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
        // Production requires FRONTEND_URL, so this is development only
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true),
    };

    let health_state = HealthState {
        pool: pool.clone(),
        storage: blob_storage,
    };

    let app = Router::new()
        .nest(
            "/api",
            attachments_api::presentation::http::health::routes(health_state),
        )
        .nest(
            "/api",
            attachments_api::presentation::http::attachments::routes(ctx.clone()),
        )
        .nest(
            "/api/uploads",
            attachments_api::presentation::http::uploads::routes(ctx.clone()),
        )
        .nest_service("/api/assets", ServeDir::new(&cfg.assets_dir))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        // Global body size limit for uploads (configurable)
        .layer(DefaultBodyLimit::max(cfg.upload_max_bytes))
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
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "shutdown_signal_failed");
    }
    info!("shutting_down");
}
