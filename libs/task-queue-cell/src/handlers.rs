use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{CallerIdentity, Role};
use shared_models::error::AppError;

use crate::{EnqueueJobRequest, Job, JobKind, JobQueue};

pub struct JobState {
    pub config: Arc<AppConfig>,
    pub queue: Arc<dyn JobQueue>,
}

fn accepted(job: Job) -> (StatusCode, Json<Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Job queued",
            "job_id": job.job_id,
            "kind": job.kind,
            "status": job.status
        })),
    )
}

/// Queue an export of the caller's own treatment history.
#[axum::debug_handler]
pub async fn request_export(
    State(state): State<Arc<JobState>>,
    caller: CallerIdentity,
) -> Result<(StatusCode, Json<Value>), AppError> {
    caller.require(Role::Patient)?;

    let job = state
        .queue
        .enqueue(
            JobKind::ExportTreatmentHistory,
            json!({ "patient_id": caller.profile_id }),
        )
        .await?;

    Ok(accepted(job))
}

#[axum::debug_handler]
pub async fn enqueue_job(
    State(state): State<Arc<JobState>>,
    caller: CallerIdentity,
    Json(request): Json<EnqueueJobRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    caller.require(Role::Admin)?;

    let job = state.queue.enqueue(request.kind, request.payload).await?;
    Ok(accepted(job))
}

#[axum::debug_handler]
pub async fn get_job(
    State(state): State<Arc<JobState>>,
    caller: CallerIdentity,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Admin)?;

    let job = state
        .queue
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    Ok(Json(json!(job)))
}
