use axum::{
    Router,
    extract::{Path as AxumPath, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::bootstrap::app_context::AppContext;
use crate::infrastructure::storage::normalize_relative;

/// GET /api/uploads/{*path}: stored attachment bytes, whatever the backend.
pub async fn serve_upload(
    State(ctx): State<AppContext>,
    AxumPath(path): AxumPath<String>,
) -> Result<Response, StatusCode> {
    let rel = normalize_relative(&path).map_err(|_| StatusCode::FORBIDDEN)?;
    let storage = ctx.blob_storage();
    if !storage.exists(&rel).await.unwrap_or(false) {
        return Err(StatusCode::NOT_FOUND);
    }
    let data = storage.read(&rel).await.map_err(|err| {
        tracing::warn!(error = ?err, path = %rel, "serve_upload_read_failed");
        StatusCode::NOT_FOUND
    })?;

    // Determine content type from extension using mime_guess (fallback to octet-stream)
    let guessed = mime_guess::from_path(&rel).first_or_octet_stream();
    let content_type = guessed.essence_str().to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        axum::http::header::HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );

    Ok((headers, data).into_response())
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/*path", get(serve_upload))
        .with_state(ctx)
}
