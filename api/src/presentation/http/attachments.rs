use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::dto::attachments::{
    IncomingFile, IncomingFiles, ResolveOptions, UploadOptions,
};
use crate::application::services::attachments::AttachmentError;
use crate::bootstrap::app_context::AppContext;
use crate::domain::attachments::{FileRecord, OwnerRef};

#[derive(Debug, Serialize, ToSchema)]
pub struct FileRecordResponse {
    pub id: Uuid,
    pub object_type: String,
    pub object_id: i64,
    pub file_name: String,
    pub url: String,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub items: Vec<FileRecordResponse>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadFilesMultipart {
    /// Any number of file fields; the field name is free-form
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadFromUrlBody {
    pub url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    /// Default-asset category (defaults to the owner type)
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    /// Fall back to the default asset when no file resolves (default true)
    pub default: Option<bool>,
}

impl From<ResolveQuery> for ResolveOptions {
    fn from(q: ResolveQuery) -> Self {
        ResolveOptions {
            use_default: q.default.unwrap_or(true),
            asset_type: q.asset_type.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UrlsResponse {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFilesResponse {
    pub deleted: bool,
}

fn to_response(ctx: &AppContext, r: FileRecord) -> FileRecordResponse {
    let url = ctx.attachments().url_of(&r);
    FileRecordResponse {
        id: r.id,
        object_type: r.object_type,
        object_id: r.object_id,
        file_name: r.file_name,
        url,
        original_name: r.original_name,
        content_type: r.content_type,
        size: r.size,
        created_at: r.created_at,
    }
}

fn to_list(ctx: &AppContext, records: Vec<FileRecord>) -> FileListResponse {
    FileListResponse {
        items: records.into_iter().map(|r| to_response(ctx, r)).collect(),
    }
}

fn upload_options(ctx: &AppContext) -> UploadOptions {
    UploadOptions {
        max_bytes: Some(ctx.cfg.upload_max_bytes),
        allowed_extensions: ctx.cfg.allowed_extensions.clone(),
    }
}

fn error_status(err: AttachmentError) -> StatusCode {
    match err {
        AttachmentError::InvalidOwner(_) | AttachmentError::Rejected(_) => StatusCode::BAD_REQUEST,
        AttachmentError::UnresolvedOwner(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AttachmentError::Fetch(_) => StatusCode::BAD_GATEWAY,
        AttachmentError::Storage(e) | AttachmentError::Persist(e) => {
            tracing::error!(error = ?e, "attachment_request_failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Collects every field that carries a filename; text fields are skipped.
async fn read_files(ctx: &AppContext, mut multipart: Multipart) -> Result<IncomingFiles, StatusCode> {
    let mut incoming = IncomingFiles::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        if data.len() > ctx.cfg.upload_max_bytes {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
        // Browsers send an empty part for untouched file inputs
        if file_name.is_empty() && data.is_empty() {
            continue;
        }
        incoming.push(
            &name,
            IncomingFile {
                file_name: Some(file_name),
                content_type,
                bytes: data.to_vec(),
            },
        );
    }
    Ok(incoming)
}

/// POST /api/attachments/{object_type}/{object_id} (multipart/form-data)
#[utoipa::path(
    post,
    path = "/api/attachments/{object_type}/{object_id}",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
    ),
    request_body(content = UploadFilesMultipart, content_type = "multipart/form-data"),
    responses((status = 201, description = "Files attached", body = FileListResponse))
)]
pub async fn upload_files(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileListResponse>), StatusCode> {
    let incoming = read_files(&ctx, multipart).await?;
    let owner = OwnerRef::new(object_type, object_id);
    let created = ctx
        .attachments()
        .upload_files(&owner, &incoming, &upload_options(&ctx))
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(to_list(&ctx, created))))
}

/// POST /api/attachments/{object_type} for owners that have no id yet
#[utoipa::path(
    post,
    path = "/api/attachments/{object_type}",
    tag = "Attachments",
    params(("object_type" = String, Path, description = "Owner type")),
    request_body(content = UploadFilesMultipart, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Files attached to the newest owner", body = FileListResponse),
        (status = 422, description = "Owner id cannot be resolved")
    )
)]
pub async fn upload_files_pending(
    State(ctx): State<AppContext>,
    Path(object_type): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileListResponse>), StatusCode> {
    let incoming = read_files(&ctx, multipart).await?;
    let owner = OwnerRef::pending(object_type);
    let created = ctx
        .attachments()
        .upload_files(&owner, &incoming, &upload_options(&ctx))
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(to_list(&ctx, created))))
}

#[utoipa::path(
    put,
    path = "/api/attachments/{object_type}/{object_id}",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
    ),
    request_body(content = UploadFilesMultipart, content_type = "multipart/form-data"),
    responses((status = 200, description = "Attachments replaced (empty when no files were sent)", body = FileListResponse))
)]
pub async fn replace_files(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
    multipart: Multipart,
) -> Result<Json<FileListResponse>, StatusCode> {
    let incoming = read_files(&ctx, multipart).await?;
    let owner = OwnerRef::new(object_type, object_id);
    let created = ctx
        .attachments()
        .replace_files(&owner, &incoming, &upload_options(&ctx))
        .await
        .map_err(error_status)?;
    Ok(Json(to_list(&ctx, created)))
}

#[utoipa::path(
    post,
    path = "/api/attachments/{object_type}/{object_id}/from-url",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
    ),
    request_body = UploadFromUrlBody,
    responses(
        (status = 201, description = "Remote file attached", body = FileRecordResponse),
        (status = 502, description = "Remote fetch failed")
    )
)]
pub async fn upload_from_url(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
    Json(body): Json<UploadFromUrlBody>,
) -> Result<(StatusCode, Json<FileRecordResponse>), StatusCode> {
    let url = body.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let owner = OwnerRef::new(object_type, object_id);
    let record = ctx
        .attachments()
        .upload_from_url(&owner, url, &upload_options(&ctx))
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(to_response(&ctx, record))))
}

#[utoipa::path(
    get,
    path = "/api/attachments/{object_type}/{object_id}",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
    ),
    responses((status = 200, body = FileListResponse))
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
) -> Result<Json<FileListResponse>, StatusCode> {
    let owner = OwnerRef::new(object_type, object_id);
    let records = ctx
        .attachments()
        .list_files(&owner)
        .await
        .map_err(error_status)?;
    Ok(Json(to_list(&ctx, records)))
}

#[utoipa::path(
    get,
    path = "/api/attachments/{object_type}/{object_id}/url",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
        ResolveQuery
    ),
    responses((status = 200, body = UrlResponse))
)]
pub async fn resolve_url(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
    Query(q): Query<ResolveQuery>,
) -> Json<UrlResponse> {
    let owner = OwnerRef::new(object_type, object_id);
    let url = ctx.attachments().resolve_url(&owner, &q.into()).await;
    Json(UrlResponse { url })
}

#[utoipa::path(
    get,
    path = "/api/attachments/{object_type}/{object_id}/urls",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
        ResolveQuery
    ),
    responses((status = 200, body = UrlsResponse))
)]
pub async fn resolve_all_urls(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
    Query(q): Query<ResolveQuery>,
) -> Json<UrlsResponse> {
    let owner = OwnerRef::new(object_type, object_id);
    let urls = ctx.attachments().resolve_all_urls(&owner, &q.into()).await;
    Json(UrlsResponse { urls })
}

#[utoipa::path(
    delete,
    path = "/api/attachments/{object_type}/{object_id}",
    tag = "Attachments",
    params(
        ("object_type" = String, Path, description = "Owner type"),
        ("object_id" = i64, Path, description = "Owner id"),
    ),
    responses((status = 200, body = DeleteFilesResponse))
)]
pub async fn delete_files(
    State(ctx): State<AppContext>,
    Path((object_type, object_id)): Path<(String, i64)>,
) -> Result<Json<DeleteFilesResponse>, StatusCode> {
    let owner = OwnerRef::new(object_type, object_id);
    let deleted = ctx
        .attachments()
        .delete_files(&owner)
        .await
        .map_err(error_status)?;
    Ok(Json(DeleteFilesResponse { deleted }))
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/attachments/:object_type", post(upload_files_pending))
        .route(
            "/attachments/:object_type/:object_id",
            post(upload_files)
                .put(replace_files)
                .get(list_files)
                .delete(delete_files),
        )
        .route(
            "/attachments/:object_type/:object_id/from-url",
            post(upload_from_url),
        )
        .route("/attachments/:object_type/:object_id/url", get(resolve_url))
        .route(
            "/attachments/:object_type/:object_id/urls",
            get(resolve_all_urls),
        )
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_query_defaults_to_fallback_on() {
        let opts: ResolveOptions = ResolveQuery {
            asset_type: None,
            default: None,
        }
        .into();
        assert!(opts.use_default);
        assert!(opts.asset_type.is_none());

        let opts: ResolveOptions = ResolveQuery {
            asset_type: Some("avatar".into()),
            default: Some(false),
        }
        .into();
        assert!(!opts.use_default);
        assert_eq!(opts.asset_type.as_deref(), Some("avatar"));
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            error_status(AttachmentError::Rejected("too big".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(AttachmentError::UnresolvedOwner("posts".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            error_status(AttachmentError::Fetch(anyhow::anyhow!("timeout"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(AttachmentError::Storage(anyhow::anyhow!("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
