use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::application::ports::blob_storage::BlobStorage;

#[derive(Clone)]
pub struct HealthState {
    pub pool: PgPool,
    pub storage: Arc<dyn BlobStorage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResp {
    pub status: &'static str,
    pub database: bool,
    pub storage: bool,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, body = HealthResp))
)]
pub async fn health(State(state): State<HealthState>) -> Json<HealthResp> {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    // A reachable backend answers the probe, present or not
    let storage = state.storage.exists(".health").await.is_ok();
    let status = if database && storage { "ok" } else { "degraded" };
    Json(HealthResp {
        status,
        database,
        storage,
    })
}

pub fn routes(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
