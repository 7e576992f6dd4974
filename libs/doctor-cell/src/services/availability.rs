use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use tracing::{debug, info};

use shared_database::{DatabaseError, SupabaseClient};
use shared_models::time_format::{format_time, parse_date, parse_time};

use crate::models::{
    AvailabilityError, AvailabilityWindow, DaySchedule, Session, SessionView,
    UpsertAvailabilityRequest, WindowUpsert,
};
use crate::services::slots::{generate_slots, validate_window};

const TABLE: &str = "/rest/v1/doctor_daily_availability";

/// Persistence for per-day, per-session availability windows.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Insert or replace the row for `(doctor_id, date, session)`.
    async fn upsert(&self, window: WindowUpsert) -> Result<AvailabilityWindow, DatabaseError>;

    /// Windows with `from <= date <= to`, ordered by date then session.
    async fn list_range(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityWindow>, DatabaseError>;

    /// Delete a window owned by `doctor_id`; false if no such row.
    async fn delete(&self, doctor_id: i64, window_id: i64) -> Result<bool, DatabaseError>;
}

pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn upsert(&self, window: WindowUpsert) -> Result<AvailabilityWindow, DatabaseError> {
        debug!("Upserting {} availability for doctor {} on {}", window.session, window.doctor_id, window.date);

        let path = format!("{}?on_conflict=doctor_id,date,session", TABLE);
        let result: Vec<AvailabilityWindow> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            None,
            Some(serde_json::to_value(&window)?),
            Some(SupabaseClient::merge_duplicates()),
        ).await?;

        result.into_iter().next().ok_or_else(|| {
            DatabaseError::InvalidRequest("Upsert returned no availability row".to_string())
        })
    }

    async fn list_range(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityWindow>, DatabaseError> {
        debug!("Fetching availability for doctor {} from {} to {}", doctor_id, from, to);

        let path = format!(
            "{}?doctor_id=eq.{}&date=gte.{}&date=lte.{}&order=date.asc",
            TABLE, doctor_id, from, to
        );
        let mut windows: Vec<AvailabilityWindow> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await?;

        windows.sort_by_key(|w| (w.date, w.session));
        Ok(windows)
    }

    async fn delete(&self, doctor_id: i64, window_id: i64) -> Result<bool, DatabaseError> {
        debug!("Deleting availability window {} of doctor {}", window_id, doctor_id);

        let path = format!("{}?id=eq.{}&doctor_id=eq.{}", TABLE, window_id, doctor_id);
        let deleted: Vec<AvailabilityWindow> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(!deleted.is_empty())
    }
}

/// Doctor/admin-facing availability management. Every write goes through
/// `validate_window` first; nothing is stored when validation fails.
pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
    horizon_days: i64,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn AvailabilityStore>, horizon_days: i64) -> Self {
        Self { store, horizon_days }
    }

    pub fn store(&self) -> Arc<dyn AvailabilityStore> {
        Arc::clone(&self.store)
    }

    pub async fn upsert(
        &self,
        doctor_id: i64,
        request: UpsertAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        let upsert = Self::validate_request(doctor_id, &request)?;
        let window = self.store.upsert(upsert).await?;

        info!(
            "Availability updated for doctor {} on {} ({}, available: {})",
            doctor_id, window.date, window.session, window.is_available
        );
        Ok(window)
    }

    /// Parse and validate a raw request into a storable write.
    pub fn validate_request(
        doctor_id: i64,
        request: &UpsertAvailabilityRequest,
    ) -> Result<WindowUpsert, AvailabilityError> {
        let date = parse_date(&request.date)
            .ok_or_else(|| AvailabilityError::Validation("Invalid date format, expected YYYY-MM-DD".to_string()))?;
        let session: Session = request.session.parse()?;

        if !request.is_available {
            return Ok(WindowUpsert {
                doctor_id,
                date,
                session,
                is_available: false,
                start_time: None,
                end_time: None,
            });
        }

        let parse = |raw: &Option<String>, field: &str| {
            raw.as_deref()
                .and_then(parse_time)
                .ok_or_else(|| AvailabilityError::Validation(format!("Invalid or missing {}, expected HH:MM", field)))
        };
        let start = parse(&request.start_time, "start_time")?;
        let end = parse(&request.end_time, "end_time")?;

        validate_window(session, start, end)?;

        Ok(WindowUpsert {
            doctor_id,
            date,
            session,
            is_available: true,
            start_time: Some(start),
            end_time: Some(end),
        })
    }

    pub async fn list_windows(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        Ok(self.store.list_range(doctor_id, from, to).await?)
    }

    /// Both sessions of every day from `today` through the horizon, with the
    /// generated timeslots of enabled windows.
    pub async fn weekly_schedule(
        &self,
        doctor_id: i64,
        today: NaiveDate,
    ) -> Result<Vec<DaySchedule>, AvailabilityError> {
        let last_day = today + Duration::days(self.horizon_days);
        let windows = self.store.list_range(doctor_id, today, last_day).await?;

        let view = |date: NaiveDate, session: Session| {
            match windows.iter().find(|w| w.date == date && w.session == session) {
                Some(window) => SessionView {
                    id: Some(window.id),
                    session,
                    is_available: window.is_available,
                    start_time: window.start_time,
                    end_time: window.end_time,
                    timeslots: window
                        .enabled_bounds()
                        .map(|(start, end)| generate_slots(start, end).iter().map(format_time).collect())
                        .unwrap_or_default(),
                },
                None => SessionView {
                    id: None,
                    session,
                    is_available: false,
                    start_time: None,
                    end_time: None,
                    timeslots: Vec::new(),
                },
            }
        };

        Ok(today
            .iter_days()
            .take_while(|date| *date <= last_day)
            .map(|date| DaySchedule {
                date,
                morning: view(date, Session::Morning),
                evening: view(date, Session::Evening),
            })
            .collect())
    }

    pub async fn delete(&self, doctor_id: i64, window_id: i64) -> Result<(), AvailabilityError> {
        if !self.store.delete(doctor_id, window_id).await? {
            return Err(AvailabilityError::NotFound);
        }

        info!("Availability window {} of doctor {} deleted", window_id, doctor_id);
        Ok(())
    }
}
