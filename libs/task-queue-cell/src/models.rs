use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TaskQueueError;

/// Background work handed to the external worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Payload `{"patient_id": <int>}`.
    ExportTreatmentHistory,
    /// Payload `{"date": "YYYY-MM-DD"}`.
    DailyAppointmentReminder,
    /// Payload `{"month": "YYYY-MM"}`.
    MonthlyDoctorReport,
}

impl JobKind {
    pub fn validate_payload(&self, payload: &Value) -> Result<(), TaskQueueError> {
        match self {
            JobKind::ExportTreatmentHistory => {
                payload
                    .get("patient_id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| invalid("patient_id must be an integer"))?;
            }
            JobKind::DailyAppointmentReminder => {
                let date = string_field(payload, "date")?;
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|_| invalid("date must be YYYY-MM-DD"))?;
            }
            JobKind::MonthlyDoctorReport => {
                let month = string_field(payload, "month")?;
                NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
                    .map_err(|_| invalid("month must be YYYY-MM"))?;
            }
        }
        Ok(())
    }
}

fn string_field<'a>(payload: &'a Value, field: &str) -> Result<&'a str, TaskQueueError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(&format!("{} is required", field)))
}

fn invalid(msg: &str) -> TaskQueueError {
    TaskQueueError::InvalidPayload(msg.to_string())
}

/// `Queued` is written on enqueue; the remaining states belong to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub payload: Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            kind,
            payload,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnqueueJobRequest {
    pub kind: JobKind,
    #[serde(default)]
    pub payload: Value,
}
