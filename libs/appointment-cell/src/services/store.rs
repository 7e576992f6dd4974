use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use shared_database::{DatabaseError, SupabaseClient};
use shared_models::time_format::format_time;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentStatus, MedicalRecord, NewAppointment, Participant,
    RecordFields, RecordUpsert, SortOrder,
};

const APPOINTMENTS: &str = "/rest/v1/appointments";
const MEDICAL_RECORDS: &str = "/rest/v1/medical_records";

/// Persistence for booked appointments.
///
/// Implementations must keep at most one non-cancelled appointment per
/// `(doctor_id, date, time)`, enforced atomically by `insert`.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Fails with `DatabaseError::Conflict` if the slot is already held.
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError>;

    async fn get(&self, appointment_id: i64) -> Result<Option<Appointment>, DatabaseError>;

    /// The non-cancelled appointment holding a slot, if any.
    async fn find_active_at(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Appointment>, DatabaseError>;

    /// Compare-and-set on status. `None` when the row is missing or its
    /// status no longer equals `expected`. `Some` notes are written in the
    /// same update.
    async fn transition_status(
        &self,
        appointment_id: i64,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError>;

    async fn update_notes(
        &self,
        appointment_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError>;

    async fn query(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, DatabaseError>;
}

/// One medical record per appointment.
#[async_trait]
pub trait MedicalRecordStore: Send + Sync {
    async fn get(&self, appointment_id: i64) -> Result<Option<MedicalRecord>, DatabaseError>;

    async fn upsert(
        &self,
        appointment_id: i64,
        fields: RecordFields,
    ) -> Result<RecordUpsert, DatabaseError>;

    async fn list_for_appointments(
        &self,
        appointment_ids: &[i64],
    ) -> Result<Vec<MedicalRecord>, DatabaseError>;
}

// ==============================================================================
// POSTGREST IMPLEMENTATIONS
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn patch(
        &self,
        filter: String,
        body: serde_json::Value,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?{}", APPOINTMENTS, filter);
        let updated: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(updated.into_iter().next())
    }
}

pub(crate) fn query_string(query: &AppointmentQuery) -> String {
    let mut filters = Vec::new();

    match query.participant {
        Participant::Patient(id) => filters.push(format!("patient_id=eq.{}", id)),
        Participant::Doctor(id) => filters.push(format!("doctor_id=eq.{}", id)),
        Participant::Anyone => {}
    }
    if let Some(from) = query.date_from {
        filters.push(format!("date=gte.{}", from));
    }
    if let Some(to) = query.date_to {
        filters.push(format!("date=lte.{}", to));
    }
    if let Some(status) = query.status {
        filters.push(format!("status=eq.{}", status));
    } else if query.exclude_cancelled {
        filters.push("status=neq.cancelled".to_string());
    }

    filters.push(match query.order {
        SortOrder::Ascending => "order=date.asc,time.asc".to_string(),
        SortOrder::Descending => "order=date.desc,time.desc".to_string(),
    });

    filters.join("&")
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError> {
        debug!(
            "Inserting appointment for doctor {} at {} {}",
            appointment.doctor_id, appointment.date, appointment.time
        );

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS,
            None,
            Some(serde_json::to_value(&appointment)?),
            Some(SupabaseClient::return_representation()),
        ).await?;

        result.into_iter().next().ok_or_else(|| {
            DatabaseError::InvalidRequest("Insert returned no appointment row".to_string())
        })
    }

    async fn get(&self, appointment_id: i64) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);
        let result: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(result.into_iter().next())
    }

    async fn find_active_at(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!(
            "{}?doctor_id=eq.{}&date=eq.{}&time=eq.{}&status=neq.cancelled",
            APPOINTMENTS,
            doctor_id,
            date,
            format_time(&time)
        );
        let result: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(result.into_iter().next())
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        debug!("Appointment {}: {} -> {}", appointment_id, expected, new_status);

        let mut body = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339()
        });
        if let Some(notes) = notes {
            body["notes"] = json!(notes);
        }

        self.patch(format!("id=eq.{}&status=eq.{}", appointment_id, expected), body).await
    }

    async fn update_notes(
        &self,
        appointment_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        self.patch(
            format!("id=eq.{}", appointment_id),
            json!({
                "notes": notes,
                "updated_at": Utc::now().to_rfc3339()
            }),
        ).await
    }

    async fn query(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, DatabaseError> {
        let path = format!("{}?{}", APPOINTMENTS, query_string(query));
        self.supabase.request(Method::GET, &path, None, None).await
    }
}

#[derive(Serialize)]
struct RecordRow<'a> {
    appointment_id: i64,
    #[serde(flatten)]
    fields: &'a RecordFields,
    updated_at: String,
}

pub struct SupabaseMedicalRecordStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseMedicalRecordStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl MedicalRecordStore for SupabaseMedicalRecordStore {
    async fn get(&self, appointment_id: i64) -> Result<Option<MedicalRecord>, DatabaseError> {
        let path = format!("{}?appointment_id=eq.{}", MEDICAL_RECORDS, appointment_id);
        let result: Vec<MedicalRecord> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(result.into_iter().next())
    }

    async fn upsert(
        &self,
        appointment_id: i64,
        fields: RecordFields,
    ) -> Result<RecordUpsert, DatabaseError> {
        let created = self.get(appointment_id).await?.is_none();

        let row = RecordRow {
            appointment_id,
            fields: &fields,
            updated_at: Utc::now().to_rfc3339(),
        };
        let path = format!("{}?on_conflict=appointment_id", MEDICAL_RECORDS);
        let result: Vec<MedicalRecord> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            None,
            Some(serde_json::to_value(&row)?),
            Some(SupabaseClient::merge_duplicates()),
        ).await?;

        let record = result.into_iter().next().ok_or_else(|| {
            DatabaseError::InvalidRequest("Upsert returned no medical record".to_string())
        })?;

        Ok(RecordUpsert { record, created })
    }

    async fn list_for_appointments(
        &self,
        appointment_ids: &[i64],
    ) -> Result<Vec<MedicalRecord>, DatabaseError> {
        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = appointment_ids.iter().map(i64::to_string).collect();
        let path = format!("{}?appointment_id=in.({})", MEDICAL_RECORDS, ids.join(","));
        self.supabase.request(Method::GET, &path, None, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_for_doctor_agenda() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let query = AppointmentQuery::for_participant(Participant::Doctor(4))
            .between(date, date)
            .with_status(Some(AppointmentStatus::Confirmed));

        assert_eq!(
            query_string(&query),
            "doctor_id=eq.4&date=gte.2026-10-20&date=lte.2026-10-20&status=eq.confirmed&order=date.asc,time.asc"
        );
    }

    #[test]
    fn query_string_for_active_history() {
        let query = AppointmentQuery::for_participant(Participant::Patient(9))
            .active_only()
            .newest_first();

        assert_eq!(
            query_string(&query),
            "patient_id=eq.9&status=neq.cancelled&order=date.desc,time.desc"
        );
    }
}
