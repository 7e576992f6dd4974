use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_DOCTOR_LISTING_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_BOOKING_HORIZON_DAYS: i64 = 7;
pub const DEFAULT_PORT: u16 = 3000;

/// Which persistence layer backs the scheduling stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" | "in-memory" | "in_memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub doctor_listing_cache_ttl_secs: u64,
    pub booking_horizon_days: i64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            storage_backend: parse_or_default("STORAGE_BACKEND", StorageBackend::Supabase),
            doctor_listing_cache_ttl_secs: parse_or_default(
                "DOCTOR_LISTING_CACHE_TTL_SECS",
                DEFAULT_DOCTOR_LISTING_CACHE_TTL_SECS,
            ),
            booking_horizon_days: parse_or_default("BOOKING_HORIZON_DAYS", DEFAULT_BOOKING_HORIZON_DAYS),
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if config.storage_backend == StorageBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_value<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_known_names() {
        assert_eq!("supabase".parse::<StorageBackend>(), Ok(StorageBackend::Supabase));
        assert_eq!("Memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(" in-memory ".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn invalid_numeric_value_falls_back_to_default() {
        assert_eq!(parse_value("PORT", "not-a-port", DEFAULT_PORT), DEFAULT_PORT);
        assert_eq!(parse_value("BOOKING_HORIZON_DAYS", "14", DEFAULT_BOOKING_HORIZON_DAYS), 14);
    }

    #[test]
    fn is_configured_requires_all_supabase_settings() {
        let mut config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_role_key: "service".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            redis_url: None,
            storage_backend: StorageBackend::Supabase,
            doctor_listing_cache_ttl_secs: DEFAULT_DOCTOR_LISTING_CACHE_TTL_SECS,
            booking_horizon_days: DEFAULT_BOOKING_HORIZON_DAYS,
            port: DEFAULT_PORT,
        };
        assert!(config.is_configured());

        config.supabase_service_role_key.clear();
        assert!(!config.is_configured());
    }
}
