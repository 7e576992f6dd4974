use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use shared_database::DatabaseError;

use crate::models::{AvailabilityWindow, Doctor, DoctorStatusUpdate, Session, WindowUpsert};
use crate::services::availability::AvailabilityStore;
use crate::services::directory::DoctorDirectory;

/// Process-local availability store used by the memory backend and tests.
#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    next_id: AtomicI64,
    windows: RwLock<HashMap<(i64, NaiveDate, Session), AvailabilityWindow>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn upsert(&self, window: WindowUpsert) -> Result<AvailabilityWindow, DatabaseError> {
        let mut windows = self.windows.write().await;
        let key = (window.doctor_id, window.date, window.session);

        let id = match windows.get(&key) {
            Some(existing) => existing.id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };

        let stored = AvailabilityWindow {
            id,
            doctor_id: window.doctor_id,
            date: window.date,
            session: window.session,
            is_available: window.is_available,
            start_time: window.start_time,
            end_time: window.end_time,
        };
        windows.insert(key, stored.clone());

        Ok(stored)
    }

    async fn list_range(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityWindow>, DatabaseError> {
        let windows = self.windows.read().await;
        let mut result: Vec<AvailabilityWindow> = windows
            .values()
            .filter(|w| w.doctor_id == doctor_id && w.date >= from && w.date <= to)
            .cloned()
            .collect();
        result.sort_by_key(|w| (w.date, w.session));
        Ok(result)
    }

    async fn delete(&self, doctor_id: i64, window_id: i64) -> Result<bool, DatabaseError> {
        let mut windows = self.windows.write().await;
        let key = windows
            .iter()
            .find(|(_, w)| w.id == window_id && w.doctor_id == doctor_id)
            .map(|(key, _)| *key);

        Ok(key.and_then(|key| windows.remove(&key)).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<i64, Doctor>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<Doctor>, DatabaseError> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn list_bookable(&self) -> Result<Vec<Doctor>, DatabaseError> {
        let mut doctors: Vec<Doctor> = self
            .doctors
            .read()
            .await
            .values()
            .filter(|d| d.is_bookable())
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(doctors)
    }

    async fn set_status(
        &self,
        doctor_id: i64,
        update: DoctorStatusUpdate,
    ) -> Result<Option<Doctor>, DatabaseError> {
        let mut doctors = self.doctors.write().await;
        Ok(doctors.get_mut(&doctor_id).map(|doctor| {
            if let Some(active) = update.is_active {
                doctor.is_active = active;
            }
            if let Some(verified) = update.is_verified {
                doctor.is_verified = verified;
            }
            doctor.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn upsert(date: NaiveDate, session: Session, start: u32) -> WindowUpsert {
        WindowUpsert {
            doctor_id: 4,
            date,
            session,
            is_available: true,
            start_time: NaiveTime::from_hms_opt(start, 0, 0),
            end_time: NaiveTime::from_hms_opt(start + 1, 0, 0),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_same_date_and_session() {
        let store = InMemoryAvailabilityStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();

        let first = store.upsert(upsert(date, Session::Morning, 9)).await.unwrap();
        let second = store.upsert(upsert(date, Session::Morning, 10)).await.unwrap();
        store.upsert(upsert(date, Session::Evening, 15)).await.unwrap();

        assert_eq!(first.id, second.id);
        let listed = store.list_range(4, date, date).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].start_time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(listed[1].session, Session::Evening);
    }

    #[tokio::test]
    async fn delete_requires_owner() {
        let store = InMemoryAvailabilityStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let window = store.upsert(upsert(date, Session::Morning, 9)).await.unwrap();

        assert!(!store.delete(99, window.id).await.unwrap());
        assert!(store.delete(4, window.id).await.unwrap());
        assert!(!store.delete(4, window.id).await.unwrap());
    }
}
