use std::fmt;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Numeric patient/doctor profile id carried in `app_metadata.profile_id`.
    pub fn profile_id(&self) -> Option<i64> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("profile_id"))
            .and_then(|value| value.as_i64())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub profile_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The resolved caller of a core operation: role plus the numeric profile id
/// that operation acts on behalf of. Admins carry their own profile id, or 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub user_id: String,
    pub role: Role,
    pub profile_id: i64,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>, role: Role, profile_id: i64) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            profile_id,
        }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require(&self, role: Role) -> Result<&Self, AppError> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<&Self, AppError> {
        if roles.contains(&self.role) {
            Ok(self)
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to perform this operation",
                self.role
            )))
        }
    }
}

/// Resolve an authenticated `User` into the typed identity the core trusts.
pub fn resolve_identity(user: &User) -> Result<CallerIdentity, AppError> {
    let role: Role = user
        .role
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("Token carries no role".to_string()))?
        .parse()
        .map_err(AppError::Forbidden)?;

    let profile_id = match (role, user.profile_id) {
        (_, Some(id)) => id,
        (Role::Admin, None) => 0,
        (_, None) => {
            return Err(AppError::Forbidden(format!(
                "No {} profile is linked to this account",
                role
            )))
        }
    };

    debug!("Resolved caller {} as {} #{}", user.id, role, profile_id);
    Ok(CallerIdentity::new(user.id.clone(), role, profile_id))
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

        resolve_identity(user)
    }
}
