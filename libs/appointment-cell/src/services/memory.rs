use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;

use shared_database::DatabaseError;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentStatus, MedicalRecord, NewAppointment, RecordFields,
    RecordUpsert, SortOrder,
};
use crate::services::store::{AppointmentStore, MedicalRecordStore};

/// Process-local appointment store. The slot check and the insert happen
/// under the same write lock, which gives the same guarantee as the
/// partial unique index in Postgres.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    next_id: AtomicI64,
    appointments: RwLock<HashMap<i64, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        let key = (appointment.doctor_id, appointment.date, appointment.time);
        if appointments.values().any(|a| a.occupies_slot() && a.slot_key() == key) {
            return Err(DatabaseError::Conflict(format!(
                "doctor {} already booked at {} {}",
                appointment.doctor_id, appointment.date, appointment.time
            )));
        }

        let now = Utc::now();
        let stored = Appointment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            time: appointment.time,
            status: appointment.status,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        appointments.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn get(&self, appointment_id: i64) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn find_active_at(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .find(|a| a.occupies_slot() && a.slot_key() == (doctor_id, date, time))
            .cloned())
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        Ok(appointments
            .get_mut(&appointment_id)
            .filter(|appointment| appointment.status == expected)
            .map(|appointment| {
                appointment.status = new_status;
                if notes.is_some() {
                    appointment.notes = notes;
                }
                appointment.updated_at = Utc::now();
                appointment.clone()
            }))
    }

    async fn update_notes(
        &self,
        appointment_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.get_mut(&appointment_id).map(|appointment| {
            appointment.notes = notes;
            appointment.updated_at = Utc::now();
            appointment.clone()
        }))
    }

    async fn query(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, DatabaseError> {
        let mut result: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();

        result.sort_by_key(|a| (a.date, a.time, a.id));
        if query.order == SortOrder::Descending {
            result.reverse();
        }
        Ok(result)
    }
}

#[derive(Default)]
pub struct InMemoryMedicalRecordStore {
    next_id: AtomicI64,
    records: RwLock<HashMap<i64, MedicalRecord>>,
}

impl InMemoryMedicalRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MedicalRecordStore for InMemoryMedicalRecordStore {
    async fn get(&self, appointment_id: i64) -> Result<Option<MedicalRecord>, DatabaseError> {
        Ok(self.records.read().await.get(&appointment_id).cloned())
    }

    async fn upsert(
        &self,
        appointment_id: i64,
        fields: RecordFields,
    ) -> Result<RecordUpsert, DatabaseError> {
        let mut records = self.records.write().await;
        let now = Utc::now();

        let created = !records.contains_key(&appointment_id);
        let record = records.entry(appointment_id).or_insert_with(|| MedicalRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            appointment_id,
            visit_type: None,
            tests_done: None,
            diagnosis: None,
            medicines: None,
            prescription: None,
            notes: None,
            created_at: now,
            updated_at: now,
        });

        record.visit_type = fields.visit_type;
        record.tests_done = fields.tests_done;
        record.diagnosis = fields.diagnosis;
        record.medicines = fields.medicines;
        record.prescription = fields.prescription;
        record.notes = fields.notes;
        record.updated_at = now;

        Ok(RecordUpsert {
            record: record.clone(),
            created,
        })
    }

    async fn list_for_appointments(
        &self,
        appointment_ids: &[i64],
    ) -> Result<Vec<MedicalRecord>, DatabaseError> {
        let records = self.records.read().await;
        Ok(appointment_ids
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }
}
