use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use doctor_cell::models::{BookableSlot, Doctor};
use doctor_cell::services::{expand_window, AvailabilityStore, DoctorDirectory};
use shared_database::DatabaseError;
use shared_models::auth::{CallerIdentity, Role};
use shared_models::time_format::{parse_date, parse_time};

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, NewAppointment,
    Participant,
};
use crate::services::lifecycle::{AppointmentLifecycleService, TransitionActor};
use crate::services::store::AppointmentStore;

/// Turns availability into open slots and commits bookings and status
/// changes. The slot guarantee rests on `AppointmentStore::insert`; every
/// status change is a compare-and-set against the status read beforehand.
pub struct BookingEngine {
    directory: Arc<dyn DoctorDirectory>,
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    lifecycle: AppointmentLifecycleService,
    horizon_days: i64,
}

impl BookingEngine {
    pub fn new(
        directory: Arc<dyn DoctorDirectory>,
        availability: Arc<dyn AvailabilityStore>,
        appointments: Arc<dyn AppointmentStore>,
        horizon_days: i64,
    ) -> Self {
        Self {
            directory,
            availability,
            appointments,
            lifecycle: AppointmentLifecycleService::new(),
            horizon_days,
        }
    }

    pub fn appointments(&self) -> Arc<dyn AppointmentStore> {
        Arc::clone(&self.appointments)
    }

    async fn bookable_doctor(&self, doctor_id: i64) -> Result<Doctor, AppointmentError> {
        self.directory
            .get_doctor(doctor_id)
            .await?
            .filter(Doctor::is_bookable)
            .ok_or(AppointmentError::DoctorNotFound(doctor_id))
    }

    /// Open slots of a bookable doctor for `from ..= to`, ordered by date then time.
    pub async fn list_open_slots(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BookableSlot>, AppointmentError> {
        self.bookable_doctor(doctor_id).await?;

        let windows = self.availability.list_range(doctor_id, from, to).await?;
        let booked: HashSet<_> = self
            .appointments
            .query(
                &AppointmentQuery::for_participant(Participant::Doctor(doctor_id))
                    .between(from, to)
                    .active_only(),
            )
            .await?
            .into_iter()
            .map(|a| (a.date, a.time))
            .collect();

        let mut slots: Vec<BookableSlot> = windows
            .iter()
            .flat_map(expand_window)
            .filter(|slot| !booked.contains(&(slot.date, slot.start_time)))
            .collect();
        slots.sort();
        slots.dedup();

        debug!("Doctor {} has {} open slots between {} and {}", doctor_id, slots.len(), from, to);
        Ok(slots)
    }

    /// Patient-facing listing: `today` through the booking horizon.
    pub async fn list_open_slots_from(
        &self,
        doctor_id: i64,
        today: NaiveDate,
    ) -> Result<Vec<BookableSlot>, AppointmentError> {
        self.list_open_slots(doctor_id, today, today + Duration::days(self.horizon_days))
            .await
    }

    pub async fn book(
        &self,
        doctor_id: i64,
        patient_id: i64,
        date: &str,
        time: &str,
    ) -> Result<Appointment, AppointmentError> {
        let (date, time) = parse_date(date)
            .zip(parse_time(time))
            .ok_or_else(|| AppointmentError::Validation("Invalid date or time format".to_string()))?;

        self.bookable_doctor(doctor_id).await?;

        let windows = self.availability.list_range(doctor_id, date, date).await?;
        let offered = windows
            .iter()
            .flat_map(expand_window)
            .any(|slot| slot.start_time == time);
        if !offered {
            return Err(AppointmentError::SlotUnavailable { doctor_id, date, time });
        }

        if self.appointments.find_active_at(doctor_id, date, time).await?.is_some() {
            return Err(AppointmentError::SlotTaken);
        }

        let appointment = self
            .appointments
            .insert(NewAppointment {
                doctor_id,
                patient_id,
                date,
                time,
                status: AppointmentStatus::Pending,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(reason) => {
                    warn!("Booking race lost for doctor {} at {} {}: {}", doctor_id, date, time, reason);
                    AppointmentError::SlotTaken
                }
                other => AppointmentError::Database(other),
            })?;

        info!(
            "Appointment {} booked: patient {} with doctor {} at {} {}",
            appointment.id, patient_id, doctor_id, date, time
        );
        Ok(appointment)
    }

    pub async fn cancel(
        &self,
        appointment_id: i64,
        patient_id: i64,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .filter(|a| a.patient_id == patient_id)
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let cancelled = self
            .transition(appointment, TransitionActor::Patient, AppointmentStatus::Cancelled, None)
            .await?;

        info!("Appointment {} cancelled by patient {}", appointment_id, patient_id);
        Ok(cancelled)
    }

    pub async fn update_status(
        &self,
        appointment_id: i64,
        doctor_id: i64,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.owned_by_doctor(appointment_id, doctor_id).await?;

        let updated = self
            .transition(appointment, TransitionActor::Doctor, new_status, None)
            .await?;

        info!("Appointment {} set to {} by doctor {}", appointment_id, new_status, doctor_id);
        Ok(updated)
    }

    /// Doctor edit of status and/or notes. A status change carries the notes
    /// in the same write, so either both apply or neither does.
    pub async fn update_by_doctor(
        &self,
        appointment_id: i64,
        doctor_id: i64,
        new_status: Option<AppointmentStatus>,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        match new_status {
            Some(status) => {
                let appointment = self.owned_by_doctor(appointment_id, doctor_id).await?;
                let updated = self
                    .transition(appointment, TransitionActor::Doctor, status, notes)
                    .await?;

                info!("Appointment {} set to {} by doctor {}", appointment_id, status, doctor_id);
                Ok(updated)
            }
            None if notes.is_some() => self.update_notes(appointment_id, doctor_id, notes).await,
            None => Err(AppointmentError::Validation("Provide status and/or notes".to_string())),
        }
    }

    /// Moderation: any appointment, same status rules as its doctor.
    pub async fn admin_update_status(
        &self,
        appointment_id: i64,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let updated = self
            .transition(appointment, TransitionActor::Admin, new_status, None)
            .await?;

        info!("Appointment {} set to {} by admin", appointment_id, new_status);
        Ok(updated)
    }

    pub async fn admin_cancel(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.admin_update_status(appointment_id, AppointmentStatus::Cancelled).await
    }

    /// Notes stay editable in every status.
    pub async fn update_notes(
        &self,
        appointment_id: i64,
        doctor_id: i64,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        self.owned_by_doctor(appointment_id, doctor_id).await?;

        self.appointments
            .update_notes(appointment_id, notes)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    /// Visible to its patient, its doctor and any admin.
    pub async fn get_for_caller(
        &self,
        appointment_id: i64,
        caller: &CallerIdentity,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .filter(|a| match caller.role {
                Role::Admin => true,
                Role::Patient => a.patient_id == caller.profile_id,
                Role::Doctor => a.doctor_id == caller.profile_id,
            })
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn owned_by_doctor(
        &self,
        appointment_id: i64,
        doctor_id: i64,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .filter(|a| a.doctor_id == doctor_id)
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    async fn transition(
        &self,
        appointment: Appointment,
        actor: TransitionActor,
        new_status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let id = appointment.id;
        self.lifecycle
            .validate_status_transition(id, actor, appointment.status, new_status)?;

        if let Some(updated) = self
            .appointments
            .transition_status(id, appointment.status, new_status, notes)
            .await?
        {
            return Ok(updated);
        }

        // Lost the compare-and-set: report what the row turned into.
        let current = self
            .appointments
            .get(id)
            .await?
            .ok_or(AppointmentError::NotFound(id))?;
        warn!(
            "Appointment {} moved from {} to {} concurrently",
            id, appointment.status, current.status
        );

        self.lifecycle
            .validate_status_transition(id, actor, current.status, new_status)?;
        Err(AppointmentError::ConcurrentUpdate(id))
    }
}
