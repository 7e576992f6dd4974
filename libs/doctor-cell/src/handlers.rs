use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{CallerIdentity, Role};
use shared_models::error::AppError;

use crate::models::{
    AvailabilityError, DirectoryError, DoctorListingQuery, DoctorStatusUpdate, UpsertAvailabilityRequest,
};
use crate::services::{AvailabilityService, DoctorListingService};

/// Shared state of the doctor routes.
pub struct DoctorState {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
    pub listing: Arc<DoctorListingService>,
}

// ==============================================================================
// DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Query(query): Query<DoctorListingQuery>,
) -> Result<Json<Value>, AppError> {
    caller.require_any(&[Role::Patient, Role::Admin])?;

    let doctors = state.listing.list(&query).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require_any(&[Role::Patient, Role::Admin])?;

    let doctor = state.listing.get_public(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn set_doctor_status(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Path(doctor_id): Path<i64>,
    Json(update): Json<DoctorStatusUpdate>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Admin)?;

    if update.is_active.is_none() && update.is_verified.is_none() {
        return Err(AppError::ValidationError(
            "Provide is_active and/or is_verified".to_string(),
        ));
    }

    let doctor = state.listing.set_status(doctor_id, update).await?;
    Ok(Json(json!(doctor)))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_availability(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Doctor)?;

    let today = Utc::now().date_naive();
    let schedule = state
        .availability
        .weekly_schedule(caller.profile_id, today)
        .await?;

    Ok(Json(json!({
        "doctor_id": caller.profile_id,
        "days": schedule
    })))
}

#[axum::debug_handler]
pub async fn upsert_my_availability(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Json(request): Json<UpsertAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Doctor)?;

    let window = state.availability.upsert(caller.profile_id, request).await?;
    Ok(Json(json!(window)))
}

#[axum::debug_handler]
pub async fn delete_my_availability(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Path(window_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Doctor)?;

    state.availability.delete(caller.profile_id, window_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability window deleted"
    })))
}

#[axum::debug_handler]
pub async fn upsert_doctor_availability(
    State(state): State<Arc<DoctorState>>,
    caller: CallerIdentity,
    Path(doctor_id): Path<i64>,
    Json(request): Json<UpsertAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Admin)?;

    let doctor = state
        .listing
        .directory()
        .get_doctor(doctor_id)
        .await
        .map_err(DirectoryError::from)?;
    if doctor.is_none() {
        return Err(AvailabilityError::DoctorNotFound(doctor_id).into());
    }

    let window = state.availability.upsert(doctor_id, request).await?;
    Ok(Json(json!(window)))
}
