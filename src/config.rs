use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub secret_key: String,
    pub session_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let db_path = env::var("APP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/data.db"));

        let secret_key = match env::var("SECRET_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                warn!("SECRET_KEY not set; using the insecure development key");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let session_ttl_hours = session_ttl_hours(env::var("SESSION_TTL_HOURS").ok().as_deref());

        Self {
            port,
            db_path,
            secret_key,
            session_ttl_hours,
        }
    }
}

/// Unparseable or non-positive values use the default; larger ones are
/// capped at a year.
pub fn session_ttl_hours(value: Option<&str>) -> i64 {
    let Some(hours) = value
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|hours| *hours > 0)
    else {
        return DEFAULT_SESSION_TTL_HOURS;
    };

    if hours > MAX_SESSION_TTL_HOURS {
        warn!(hours, max = MAX_SESSION_TTL_HOURS, "SESSION_TTL_HOURS too large; capping");
        return MAX_SESSION_TTL_HOURS;
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_defaults_when_missing_or_invalid() {
        assert_eq!(session_ttl_hours(None), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("abc")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("0")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("-5")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("12")), 12);
    }

    #[test]
    fn huge_session_ttl_is_capped_to_a_year() {
        assert_eq!(session_ttl_hours(Some("10000000000")), MAX_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("9223372036854775807")), MAX_SESSION_TTL_HOURS);
    }
}
