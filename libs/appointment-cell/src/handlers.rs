use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{CallerIdentity, Role};
use shared_models::error::AppError;

use crate::models::{
    AdminStatusRequest, AppointmentListParams, AppointmentStatus, BookAppointmentRequest, RecordFields,
    UpdateAppointmentRequest,
};
use crate::services::{AppointmentHistoryService, BookingEngine, MedicalRecordService};

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingEngine>,
    pub history: Arc<AppointmentHistoryService>,
    pub records: Arc<MedicalRecordService>,
}

// ==============================================================================
// SLOTS & BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn list_open_slots(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require_any(&[Role::Patient, Role::Admin])?;

    let today = Utc::now().date_naive();
    let slots = state.booking.list_open_slots_from(doctor_id, today).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "from": today,
        "to": today + Duration::days(state.config.booking_horizon_days),
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    caller.require(Role::Patient)?;

    let appointment = state
        .booking
        .book(request.doctor_id, caller.profile_id, &request.date, &request.time)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked",
            "appointment_id": appointment.id,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Patient)?;

    let appointment = state.booking.cancel(appointment_id, caller.profile_id).await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Doctor)?;

    let status = request
        .status
        .as_deref()
        .map(str::parse::<AppointmentStatus>)
        .transpose()?;

    let appointment = state
        .booking
        .update_by_doctor(appointment_id, caller.profile_id, status, request.notes)
        .await?;

    Ok(Json(json!({
        "message": "Appointment updated",
        "appointment": appointment
    })))
}

// ==============================================================================
// MODERATION
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_update_status(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
    Json(request): Json<AdminStatusRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Admin)?;

    let status: AppointmentStatus = request.status.parse()?;
    let appointment = state.booking.admin_update_status(appointment_id, status).await?;

    Ok(Json(json!({
        "message": "Appointment status updated",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn admin_cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Admin)?;

    let appointment = state.booking.admin_cancel(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

/// History for patients, agenda for doctors, everything for admins.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Query(params): Query<AppointmentListParams>,
) -> Result<Json<Value>, AppError> {
    let appointments = match caller.role {
        Role::Patient => state.history.patient_history(caller.profile_id).await?,
        Role::Doctor => state.history.doctor_agenda(caller.profile_id, &params).await?,
        Role::Admin => state.history.admin_listing(params.status.as_deref()).await?,
    };

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_for_caller(appointment_id, &caller).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn patient_dashboard(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Patient)?;

    let dashboard = state
        .history
        .patient_dashboard(caller.profile_id, Utc::now().date_naive())
        .await?;
    Ok(Json(json!(dashboard)))
}

// ==============================================================================
// MEDICAL RECORDS
// ==============================================================================

#[axum::debug_handler]
pub async fn upsert_record(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
    Json(fields): Json<RecordFields>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    caller.require(Role::Doctor)?;

    let result = state
        .records
        .upsert_record(caller.profile_id, appointment_id, fields)
        .await?;

    let status = if result.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "message": if result.created { "Medical record created" } else { "Medical record updated" },
            "record": result.record
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_record(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Doctor)?;

    let record = state
        .records
        .record_for_doctor(caller.profile_id, appointment_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No medical record for appointment {}", appointment_id))
        })?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn patient_records(
    State(state): State<Arc<AppointmentState>>,
    caller: CallerIdentity,
) -> Result<Json<Value>, AppError> {
    caller.require(Role::Patient)?;

    let records = state.records.records_for_patient(caller.profile_id).await?;

    Ok(Json(json!({
        "records": records,
        "total": records.len()
    })))
}
