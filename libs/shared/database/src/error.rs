use thiserror::Error;

/// PostgreSQL `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DatabaseError {
    /// Classify a non-success PostgREST response. Only a `unique_violation`
    /// is a conflict; PostgREST also answers 409 for foreign-key failures.
    pub fn from_status(status: u16, body: String) -> Self {
        if postgres_code(&body).as_deref() == Some(UNIQUE_VIOLATION) {
            return DatabaseError::Conflict(body);
        }

        match status {
            401 | 403 => DatabaseError::Auth(body),
            404 => DatabaseError::NotFound(body),
            _ => DatabaseError::Api { status, message: body },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }
}

fn postgres_code(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("code")?
        .as_str()
        .map(str::to_string)
}
