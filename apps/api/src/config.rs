use std::fmt::Display;
use std::ops::RangeInclusive;

use anyhow::{bail, Context, Result};

const MAX_AGE_MONTHS_RANGE: RangeInclusive<u32> = 1..=120;
const THROTTLE_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub auth_jwt_secret: String,
    pub directory_api_url: String,
    pub directory_api_key: String,
    /// Dotted path of the item list inside the directory XML document.
    pub directory_items_path: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    /// Shared secret of the scheduled reminder trigger. `None` rejects every call.
    pub cron_secret: Option<String>,
    pub recipient_cache_max_age_months: u32,
    pub reminder_throttle_days: i64,
    pub reminder_throttle_counts_failures: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            auth_jwt_secret: require_env("AUTH_JWT_SECRET")?,
            directory_api_url: require_env("DIRECTORY_API_URL")?,
            directory_api_key: require_env("DIRECTORY_API_KEY")?,
            directory_items_path: optional_env("DIRECTORY_ITEMS_PATH")
                .unwrap_or_else(|| "response.items.item".to_string()),
            mail_api_url: require_env("MAIL_API_URL")?,
            mail_api_key: require_env("MAIL_API_KEY")?,
            mail_from: optional_env("MAIL_FROM")
                .unwrap_or_else(|| "no-reply@postroom.local".to_string()),
            cron_secret: optional_env("CRON_SECRET"),
            recipient_cache_max_age_months: parse_env_in(
                "RECIPIENT_CACHE_MAX_AGE_MONTHS",
                1,
                MAX_AGE_MONTHS_RANGE,
            )?,
            reminder_throttle_days: parse_env_in(
                "REMINDER_THROTTLE_DAYS",
                3,
                THROTTLE_DAYS_RANGE,
            )?,
            reminder_throttle_counts_failures: parse_env(
                "REMINDER_THROTTLE_COUNTS_FAILURES",
                true,
            )?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}

fn parse_env_in<T>(key: &str, default: T, range: RangeInclusive<T>) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_env(key, default)?;
    if !range.contains(&value) {
        bail!(
            "Environment variable '{key}' must be between {} and {}, got {value}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}
