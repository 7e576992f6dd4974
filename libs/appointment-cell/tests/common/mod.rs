#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use appointment_cell::services::{
    AppointmentHistoryService, BookingEngine, InMemoryAppointmentStore, InMemoryMedicalRecordStore,
    MedicalRecordService,
};
use doctor_cell::models::{Doctor, Session, WindowUpsert};
use doctor_cell::services::{AvailabilityStore, InMemoryAvailabilityStore, InMemoryDoctorDirectory};

pub const DOCTOR: i64 = 1;
pub const UNVERIFIED_DOCTOR: i64 = 2;
pub const PATIENT: i64 = 10;
pub const OTHER_PATIENT: i64 = 11;

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn doctor(id: i64, verified: bool) -> Doctor {
    Doctor {
        id,
        full_name: format!("Doctor {}", id),
        specialization: Some("General Practice".to_string()),
        consultation_fee: Some(500.0),
        experience_years: Some(10),
        bio: None,
        is_active: true,
        is_verified: verified,
    }
}

pub struct Harness {
    pub engine: Arc<BookingEngine>,
    pub history: AppointmentHistoryService,
    pub records: MedicalRecordService,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub availability: Arc<InMemoryAvailabilityStore>,
    pub directory: Arc<InMemoryDoctorDirectory>,
}

impl Harness {
    /// Doctor 1 (bookable) and doctor 2 (unverified) each with a 09:00-10:00
    /// morning window on `day()`.
    pub async fn new() -> Self {
        let directory = Arc::new(InMemoryDoctorDirectory::new());
        directory.insert_doctor(doctor(DOCTOR, true)).await;
        directory.insert_doctor(doctor(UNVERIFIED_DOCTOR, false)).await;

        let availability = Arc::new(InMemoryAvailabilityStore::new());
        for doctor_id in [DOCTOR, UNVERIFIED_DOCTOR] {
            open_window(&availability, doctor_id, day(), Session::Morning, t(9, 0), t(10, 0)).await;
        }

        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let records = Arc::new(InMemoryMedicalRecordStore::new());

        Self {
            engine: Arc::new(BookingEngine::new(
                directory.clone(),
                availability.clone(),
                appointments.clone(),
                7,
            )),
            history: AppointmentHistoryService::new(appointments.clone()),
            records: MedicalRecordService::new(appointments.clone(), records),
            appointments,
            availability,
            directory,
        }
    }
}

pub async fn open_window(
    store: &InMemoryAvailabilityStore,
    doctor_id: i64,
    date: NaiveDate,
    session: Session,
    start: NaiveTime,
    end: NaiveTime,
) {
    store
        .upsert(WindowUpsert {
            doctor_id,
            date,
            session,
            is_available: true,
            start_time: Some(start),
            end_time: Some(end),
        })
        .await
        .unwrap();
}
