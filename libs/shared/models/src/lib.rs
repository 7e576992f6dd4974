pub mod auth;
pub mod error;
pub mod time_format;
