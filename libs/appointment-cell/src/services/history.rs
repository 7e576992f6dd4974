use std::sync::Arc;

use chrono::NaiveDate;

use shared_models::time_format::parse_date;

use crate::models::{
    Appointment, AppointmentError, AppointmentListParams, AppointmentQuery, AppointmentStatus,
    Participant, PatientDashboard,
};
use crate::services::store::AppointmentStore;

/// Read-side listings over the appointment store.
pub struct AppointmentHistoryService {
    appointments: Arc<dyn AppointmentStore>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<AppointmentStatus>, AppointmentError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(str::parse::<AppointmentStatus>)
        .transpose()
}

fn parse_bound(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppointmentError> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| AppointmentError::Validation(format!("Invalid {}, expected YYYY-MM-DD", field))),
        None => Ok(None),
    }
}

impl AppointmentHistoryService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    /// Newest first.
    pub async fn patient_history(&self, patient_id: i64) -> Result<Vec<Appointment>, AppointmentError> {
        let query = AppointmentQuery::for_participant(Participant::Patient(patient_id)).newest_first();
        Ok(self.appointments.query(&query).await?)
    }

    /// Oldest first, optionally narrowed by status and date bounds.
    pub async fn doctor_agenda(
        &self,
        doctor_id: i64,
        params: &AppointmentListParams,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query = AppointmentQuery::for_participant(Participant::Doctor(doctor_id))
            .with_status(parse_status(params.status.as_deref())?);
        query.date_from = parse_bound(params.date_from.as_deref(), "date_from")?;
        query.date_to = parse_bound(params.date_to.as_deref(), "date_to")?;

        Ok(self.appointments.query(&query).await?)
    }

    pub async fn admin_listing(&self, status: Option<&str>) -> Result<Vec<Appointment>, AppointmentError> {
        let query = AppointmentQuery::for_participant(Participant::Anyone)
            .with_status(parse_status(status)?)
            .newest_first();
        Ok(self.appointments.query(&query).await?)
    }

    pub async fn patient_dashboard(
        &self,
        patient_id: i64,
        today: NaiveDate,
    ) -> Result<PatientDashboard, AppointmentError> {
        let query = AppointmentQuery::for_participant(Participant::Patient(patient_id));
        let appointments = self.appointments.query(&query).await?;

        let completed = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed)
            .count();

        // Store order is ascending, so the first upcoming one is the next.
        let upcoming: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.date >= today && !a.status.is_terminal())
            .collect();

        Ok(PatientDashboard {
            total: appointments.len(),
            completed,
            upcoming: upcoming.len(),
            next_appointment: upcoming.first().map(|a| (*a).clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(parse_status(Some("  ")).unwrap(), None);
        assert_eq!(parse_bound(Some(""), "date_from").unwrap(), None);
    }

    #[test]
    fn invalid_filters_are_validation_errors() {
        assert_matches!(parse_status(Some("missed")), Err(AppointmentError::Validation(_)));
        assert_matches!(parse_bound(Some("20-10-2026"), "date_to"), Err(AppointmentError::Validation(_)));
        assert_eq!(
            parse_bound(Some("2026-10-20"), "date_to").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 20)
        );
    }
}
