use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, info};

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{
    CacheStats, DirectoryError, Doctor, DoctorListingQuery, DoctorSort, DoctorStatusUpdate,
};
use crate::services::cache::TtlCache;

const DIRECTORY_VIEW: &str = "/rest/v1/doctor_directory";
const PROFILE_TABLE: &str = "/rest/v1/doctor_profiles";

/// Read access to doctor profiles, plus the admin status switch.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<Doctor>, DatabaseError>;

    /// Active and verified doctors only.
    async fn list_bookable(&self) -> Result<Vec<Doctor>, DatabaseError>;

    async fn set_status(
        &self,
        doctor_id: i64,
        update: DoctorStatusUpdate,
    ) -> Result<Option<Doctor>, DatabaseError>;
}

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn get_doctor(&self, doctor_id: i64) -> Result<Option<Doctor>, DatabaseError> {
        debug!("Fetching doctor {}", doctor_id);

        let path = format!("{}?id=eq.{}", DIRECTORY_VIEW, doctor_id);
        let result: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(result.into_iter().next())
    }

    async fn list_bookable(&self) -> Result<Vec<Doctor>, DatabaseError> {
        let path = format!(
            "{}?is_active=eq.true&is_verified=eq.true&order=full_name.asc",
            DIRECTORY_VIEW
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    async fn set_status(
        &self,
        doctor_id: i64,
        update: DoctorStatusUpdate,
    ) -> Result<Option<Doctor>, DatabaseError> {
        let mut body = Map::new();
        if let Some(active) = update.is_active {
            body.insert("is_active".to_string(), Value::Bool(active));
        }
        if let Some(verified) = update.is_verified {
            body.insert("is_verified".to_string(), Value::Bool(verified));
        }

        let path = format!("{}?id=eq.{}", PROFILE_TABLE, doctor_id);
        let updated: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(Value::Object(body)),
            Some(SupabaseClient::return_representation()),
        ).await?;

        if updated.is_empty() {
            return Ok(None);
        }

        // The profile row lacks the joined display fields; re-read the view.
        self.get_doctor(doctor_id).await
    }
}

/// Public doctor listing with search, filter and sort, served through a
/// short-lived cache keyed by the query shape.
pub struct DoctorListingService {
    directory: Arc<dyn DoctorDirectory>,
    cache: TtlCache<String, Vec<Doctor>>,
}

impl DoctorListingService {
    pub fn new(directory: Arc<dyn DoctorDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn directory(&self) -> Arc<dyn DoctorDirectory> {
        Arc::clone(&self.directory)
    }

    pub async fn list(&self, query: &DoctorListingQuery) -> Result<Vec<Doctor>, DirectoryError> {
        let key = query.cache_key();
        if let Some(doctors) = self.cache.get(&key).await {
            return Ok(doctors);
        }

        let doctors = self.directory.list_bookable().await?;
        let doctors = apply_listing_query(doctors, query);
        debug!("Caching {} doctors under {}", doctors.len(), key);
        self.cache.insert(key, doctors.clone()).await;

        Ok(doctors)
    }

    /// A single doctor as shown to patients; hidden unless bookable.
    pub async fn get_public(&self, doctor_id: i64) -> Result<Doctor, DirectoryError> {
        self.directory
            .get_doctor(doctor_id)
            .await?
            .filter(Doctor::is_bookable)
            .ok_or(DirectoryError::DoctorNotFound(doctor_id))
    }

    pub async fn set_status(
        &self,
        doctor_id: i64,
        update: DoctorStatusUpdate,
    ) -> Result<Doctor, DirectoryError> {
        let doctor = self
            .directory
            .set_status(doctor_id, update)
            .await?
            .ok_or(DirectoryError::DoctorNotFound(doctor_id))?;

        info!(
            "Doctor {} status set (active: {}, verified: {})",
            doctor_id, doctor.is_active, doctor.is_verified
        );
        Ok(doctor)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(needle))
}

/// Missing values sort last regardless of direction.
fn cmp_missing_last<T: PartialOrd>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn apply_listing_query(mut doctors: Vec<Doctor>, query: &DoctorListingQuery) -> Vec<Doctor> {
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        doctors.retain(|d| {
            contains_ci(Some(d.full_name.as_str()), &needle)
                || contains_ci(d.specialization.as_deref(), &needle)
                || contains_ci(d.bio.as_deref(), &needle)
        });
    }

    if let Some(specialization) = query.specialization.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        doctors.retain(|d| {
            d.specialization
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(specialization))
        });
    }

    match query.sort {
        Some(DoctorSort::FeesLow) => doctors.sort_by(|a, b| cmp_missing_last(a.consultation_fee, b.consultation_fee, false)),
        Some(DoctorSort::FeesHigh) => doctors.sort_by(|a, b| cmp_missing_last(a.consultation_fee, b.consultation_fee, true)),
        Some(DoctorSort::ExpHigh) => doctors.sort_by(|a, b| cmp_missing_last(a.experience_years, b.experience_years, true)),
        Some(DoctorSort::ExpLow) => doctors.sort_by(|a, b| cmp_missing_last(a.experience_years, b.experience_years, false)),
        None => {}
    }

    doctors
}
