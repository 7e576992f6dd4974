use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::models::{
    AppointmentError, AppointmentQuery, AppointmentStatus, MedicalRecord, Participant,
    RecordFields, RecordUpsert,
};
use crate::services::store::{AppointmentStore, MedicalRecordStore};

pub struct MedicalRecordService {
    appointments: Arc<dyn AppointmentStore>,
    records: Arc<dyn MedicalRecordStore>,
}

impl MedicalRecordService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, records: Arc<dyn MedicalRecordStore>) -> Self {
        Self { appointments, records }
    }

    /// Write the record of a completed appointment owned by `doctor_id`.
    pub async fn upsert_record(
        &self,
        doctor_id: i64,
        appointment_id: i64,
        fields: RecordFields,
    ) -> Result<RecordUpsert, AppointmentError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .filter(|a| a.doctor_id == doctor_id)
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::Validation(format!(
                "Medical records can only be written for completed appointments (appointment {} is {})",
                appointment_id, appointment.status
            )));
        }

        let result = self.records.upsert(appointment_id, fields).await?;
        info!(
            "Medical record {} {} for appointment {}",
            result.record.id,
            if result.created { "created" } else { "updated" },
            appointment_id
        );
        Ok(result)
    }

    pub async fn record_for_doctor(
        &self,
        doctor_id: i64,
        appointment_id: i64,
    ) -> Result<Option<MedicalRecord>, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .filter(|a| a.doctor_id == doctor_id)
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        Ok(self.records.get(appointment_id).await?)
    }

    /// Records of the patient's appointments, oldest appointment first.
    pub async fn records_for_patient(&self, patient_id: i64) -> Result<Vec<MedicalRecord>, AppointmentError> {
        let appointments = self
            .appointments
            .query(&AppointmentQuery::for_participant(Participant::Patient(patient_id)))
            .await?;

        let position: HashMap<i64, usize> = appointments
            .iter()
            .enumerate()
            .map(|(index, a)| (a.id, index))
            .collect();
        let ids: Vec<i64> = appointments.iter().map(|a| a.id).collect();

        let mut records = self.records.list_for_appointments(&ids).await?;
        records.sort_by_key(|r| position.get(&r.appointment_id).copied().unwrap_or(usize::MAX));
        Ok(records)
    }
}
