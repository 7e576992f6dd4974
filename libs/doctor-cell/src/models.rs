use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::time_format::{hhmm, option_hhmm};

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// Fixed daily period a window belongs to. Ordering puts morning first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Morning,
    Evening,
}

impl Session {
    pub const ALL: [Session; 2] = [Session::Morning, Session::Evening];

    /// Inclusive clock band as minutes from midnight.
    pub fn band_minutes(&self) -> (u32, u32) {
        match self {
            Session::Morning => (8 * 60, 12 * 60),
            Session::Evening => (14 * 60, 20 * 60),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Morning => write!(f, "morning"),
            Session::Evening => write!(f, "evening"),
        }
    }
}

impl FromStr for Session {
    type Err = AvailabilityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Session::Morning),
            "evening" => Ok(Session::Evening),
            other => Err(AvailabilityError::Validation(format!(
                "Invalid session '{}': expected morning or evening",
                other
            ))),
        }
    }
}

/// A doctor's declared availability for one (date, session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub session: Session,
    pub is_available: bool,
    #[serde(default, with = "option_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "option_hhmm")]
    pub end_time: Option<NaiveTime>,
}

impl AvailabilityWindow {
    /// Start/end bounds if the window is enabled and fully specified.
    pub fn enabled_bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        if !self.is_available {
            return None;
        }
        self.start_time.zip(self.end_time)
    }
}

/// Validated write for the (doctor_id, date, session) row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowUpsert {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub session: Session,
    pub is_available: bool,
    #[serde(with = "option_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "option_hhmm")]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAvailabilityRequest {
    pub date: String,
    pub session: String,
    #[serde(default)]
    pub is_available: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// A bookable start time derived from a window. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BookableSlot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Option<i64>,
    pub session: Session,
    pub is_available: bool,
    #[serde(with = "option_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "option_hhmm")]
    pub end_time: Option<NaiveTime>,
    pub timeslots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub morning: SessionView,
    pub evening: SessionView,
}

// ==============================================================================
// DOCTOR DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub bio: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
}

impl Doctor {
    /// Only active, verified doctors ever surface slots or accept bookings.
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.is_verified
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorStatusUpdate {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctorSort {
    FeesLow,
    FeesHigh,
    ExpHigh,
    ExpLow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorListingQuery {
    pub search: Option<String>,
    pub specialization: Option<String>,
    pub sort: Option<DoctorSort>,
}

impl DoctorListingQuery {
    /// Normalized query shape used as the listing cache key.
    pub fn cache_key(&self) -> String {
        let normalize = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_default()
        };

        format!(
            "doctors:search={}:specialization={}:sort={}",
            normalize(&self.search),
            normalize(&self.specialization),
            self.sort.map(|s| format!("{:?}", s)).unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("{0}")]
    Validation(String),

    #[error("Availability window not found")]
    NotFound,

    #[error("Doctor {0} not found")]
    DoctorNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Doctor {0} not found or not available")]
    DoctorNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::NotFound => AppError::NotFound("Availability window not found".to_string()),
            AvailabilityError::DoctorNotFound(id) => AppError::NotFound(format!("Doctor {} not found", id)),
            AvailabilityError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::DoctorNotFound(_) => AppError::NotFound(err.to_string()),
            DirectoryError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
