use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use gadbatch::export::{archive_file_name, build_archive, export_manifest, ExportManifest};
use gadbatch::model::{BatchJob, BatchJobFile};
use gadbatch::{BatchUpload, UploadedFile};

use crate::error::{ApiError, ApiResult};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct BatchUploadResponse {
    #[serde(flatten)]
    pub upload: BatchUpload,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchJobDetail {
    pub job: BatchJob,
    pub files: Vec<BatchJobFile>,
}

fn find_job(state: &AppState, id: &str) -> ApiResult<BatchJob> {
    state
        .store
        .get_batch_job(id)?
        .ok_or_else(|| ApiError::not_found("Batch job not found"))
}

fn job_detail(state: &AppState, id: &str) -> ApiResult<BatchJobDetail> {
    let job = find_job(state, id)?;
    let files = state.store.list_batch_job_files(&job.id)?;
    Ok(BatchJobDetail { job, files })
}

// POST /api/bridge/batch-upload
pub async fn batch_upload(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchUploadRequest>, JsonRejection>,
) -> ApiResult<Json<BatchUploadResponse>> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("Rejected batch upload body: {}", e);
        ApiError::bad_request("Invalid batch upload data")
    })?;

    let upload = blocking(&state, move |state| {
        Ok(state.coordinator.upload(request.files)?)
    })
    .await?;
    Ok(Json(BatchUploadResponse {
        upload,
        success: true,
    }))
}

// GET /api/bridge/batch-jobs
pub async fn list_batch_jobs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<BatchJob>>> {
    let mut jobs = blocking(&state, |state| {
        Ok(state.store.list_batch_jobs(&state.default_user_id)?)
    })
    .await?;
    // Stored in creation order.
    jobs.reverse();
    Ok(Json(jobs))
}

// GET /api/bridge/batch-jobs/:id
pub async fn get_batch_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchJobDetail>> {
    let detail = blocking(&state, move |state| job_detail(state, &id)).await?;
    Ok(Json(detail))
}

// POST /api/bridge/batch-jobs/:id/process
pub async fn process_batch_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let job_id = id.clone();
    let queued = blocking(&state, move |state| {
        Ok(state.coordinator.start_processing(&job_id)?)
    })
    .await?;
    if !queued {
        tracing::info!("Job {} is already queued", id);
    }
    Ok(Json(json!({
        "success": true,
        "message": "Batch processing started",
    })))
}

// GET /api/bridge/batch-jobs/:id/export
pub async fn export_batch_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExportManifest>> {
    let detail = blocking(&state, move |state| job_detail(state, &id)).await?;
    Ok(Json(export_manifest(&detail.job, &detail.files)))
}

// GET /api/bridge/download/:id
pub async fn download_batch_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (job_id, archive) = blocking(&state, move |state| {
        let detail = job_detail(state, &id)?;
        let archive = build_archive(&detail.job, &detail.files)?;
        Ok((detail.job.id, archive))
    })
    .await?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", archive_file_name(&job_id)),
        ),
    ];
    Ok((headers, archive).into_response())
}
