use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_models::auth::{CallerIdentity, Role, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub storage_backend: StorageBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            storage_backend: StorageBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase stores at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            storage_backend: StorageBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            storage_backend: self.storage_backend,
            doctor_listing_cache_ttl_secs: 60,
            booking_horizon_days: 7,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub profile_id: Option<i64>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
            profile_id: Some(1),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, profile_id: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            profile_id,
        }
    }

    pub fn doctor(email: &str, profile_id: i64) -> Self {
        Self::new(email, "doctor", Some(profile_id))
    }

    pub fn patient(email: &str, profile_id: i64) -> Self {
        Self::new(email, "patient", Some(profile_id))
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin", None)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            profile_id: self.profile_id,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

/// Shorthand identities for calling handlers directly.
pub struct TestCaller;

impl TestCaller {
    pub fn patient(profile_id: i64) -> CallerIdentity {
        CallerIdentity::new(format!("patient-{}", profile_id), Role::Patient, profile_id)
    }

    pub fn doctor(profile_id: i64) -> CallerIdentity {
        CallerIdentity::new(format!("doctor-{}", profile_id), Role::Doctor, profile_id)
    }

    pub fn admin() -> CallerIdentity {
        CallerIdentity::new("admin", Role::Admin, 0)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": { "profile_id": user.profile_id },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        Self::sign_claims(&payload, secret)
    }

    /// HS256-sign arbitrary claims, for tokens the other helpers can't shape.
    pub fn sign_claims(payload: &serde_json::Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// PostgREST row shapes used by wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: i64, full_name: &str, is_active: bool, is_verified: bool) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "full_name": full_name,
            "specialization": "General Practice",
            "consultation_fee": 150.0,
            "experience_years": 10,
            "bio": "Experienced general practitioner",
            "is_active": is_active,
            "is_verified": is_verified
        })
    }

    pub fn availability_response(
        window_id: i64,
        doctor_id: i64,
        date: &str,
        session: &str,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": window_id,
            "doctor_id": doctor_id,
            "date": date,
            "session": session,
            "is_available": start_time.is_some(),
            "start_time": start_time,
            "end_time": end_time
        })
    }

    pub fn appointment_response(
        appointment_id: i64,
        doctor_id: i64,
        patient_id: i64,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "date": date,
            "time": time,
            "status": status,
            "notes": null,
            "created_at": "2026-01-01T00:00:00+00:00",
            "updated_at": "2026-01-01T00:00:00+00:00"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
