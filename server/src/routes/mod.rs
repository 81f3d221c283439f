use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

mod batch;
mod projects;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/bridge/batch-upload", post(batch::batch_upload))
        .route("/api/bridge/batch-jobs", get(batch::list_batch_jobs))
        .route("/api/bridge/batch-jobs/:id", get(batch::get_batch_job))
        .route(
            "/api/bridge/batch-jobs/:id/process",
            post(batch::process_batch_job),
        )
        .route(
            "/api/bridge/batch-jobs/:id/export",
            get(batch::export_batch_job),
        )
        .route("/api/bridge/download/:id", get(batch::download_batch_job))
        .route(
            "/api/bridge/projects",
            get(projects::list_bridge_projects).post(projects::create_bridge_project),
        )
        .route("/api/bridge/projects/:id", get(projects::get_bridge_project))
        .route(
            "/api/projects",
            get(projects::list_design_projects).post(projects::create_design_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::get_design_project)
                .patch(projects::update_design_project)
                .delete(projects::delete_design_project),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Runs store work on the blocking pool so SQLite calls never stall the
/// async workers.
pub(crate) async fn blocking<F, T>(state: &Arc<AppState>, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppState) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            tracing::error!("Blocking task failed: {}", e);
            ApiError::Internal("Internal server error".to_string())
        })?
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
