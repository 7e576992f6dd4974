use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::time_format::hhmm;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True while the appointment still holds its slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn slot_key(&self) -> (i64, NaiveDate, NaiveTime) {
        (self.doctor_id, self.date, self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Completed and cancelled appointments accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::Validation(format!("Invalid status '{}'", other))),
        }
    }
}

/// Row written by a successful booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: i64,
    pub date: String,
    pub time: String,
}

/// Doctor-side edit. Either field may be omitted; an empty body is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListParams {
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Patient(i64),
    Doctor(i64),
    Anyone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Store-level appointment filter. Results are ordered by date then time.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentQuery {
    pub participant: Participant,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub exclude_cancelled: bool,
    pub order: SortOrder,
}

impl AppointmentQuery {
    pub fn for_participant(participant: Participant) -> Self {
        Self {
            participant,
            date_from: None,
            date_to: None,
            status: None,
            exclude_cancelled: false,
            order: SortOrder::Ascending,
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.exclude_cancelled = true;
        self
    }

    pub fn with_status(mut self, status: Option<AppointmentStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        let participant = match self.participant {
            Participant::Patient(id) => appointment.patient_id == id,
            Participant::Doctor(id) => appointment.doctor_id == id,
            Participant::Anyone => true,
        };

        participant
            && self.date_from.map_or(true, |from| appointment.date >= from)
            && self.date_to.map_or(true, |to| appointment.date <= to)
            && self.status.map_or(true, |status| appointment.status == status)
            && !(self.exclude_cancelled && !appointment.occupies_slot())
    }
}

// ==============================================================================
// DASHBOARD & RECORD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub total: usize,
    pub completed: usize,
    pub upcoming: usize,
    pub next_appointment: Option<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub appointment_id: i64,
    #[serde(default)]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub tests_done: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medicines: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    pub visit_type: Option<String>,
    pub tests_done: Option<String>,
    pub diagnosis: Option<String>,
    pub medicines: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordUpsert {
    pub record: MedicalRecord,
    pub created: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),

    #[error("Appointment {0} not found")]
    NotFound(i64),

    #[error("Doctor {0} not found or not available")]
    DoctorNotFound(i64),

    #[error("No open slot for doctor {doctor_id} at {date} {time}")]
    SlotUnavailable {
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Appointment {0} changed concurrently, reload and retry")]
    ConcurrentUpdate(i64),

    #[error("Appointment {0} is already cancelled")]
    AlreadyCancelled(i64),

    #[error("Appointment {id} is {status} and cannot change")]
    TerminalState { id: i64, status: AppointmentStatus },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(_) | AppointmentError::DoctorNotFound(_) => AppError::NotFound(message),
            AppointmentError::SlotUnavailable { .. } => AppError::SlotUnavailable(message),
            AppointmentError::SlotTaken | AppointmentError::ConcurrentUpdate(_) => AppError::Conflict(message),
            AppointmentError::AlreadyCancelled(_) => AppError::AlreadyCancelled(message),
            AppointmentError::TerminalState { .. } => AppError::TerminalState(message),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
