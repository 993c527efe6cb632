use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_EXPIRES_IN: &str = "1h";
const MAX_TOKEN_TTL_DAYS: i64 = 3650;
const MAX_TOKEN_TTL_SECS: i64 = MAX_TOKEN_TTL_DAYS * 86_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub jwt: JwtConfig,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let raw_expiry = lookup("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_JWT_EXPIRES_IN.to_string());
        let expires_in = parse_duration(&raw_expiry).ok_or(ConfigError::Invalid {
            name: "JWT_EXPIRES_IN",
            value: raw_expiry.clone(),
        })?;

        let host = match lookup("HOST") {
            Some(v) => v.parse::<IpAddr>().map_err(|_| ConfigError::Invalid { name: "HOST", value: v })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            lookup("DATABASE_MAX_CONNECTIONS"),
            DEFAULT_MAX_CONNECTIONS,
        )?;

        Ok(Self {
            database_url,
            bind_addr: SocketAddr::new(host, port),
            max_connections,
            jwt: JwtConfig { secret, expires_in },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        None => Ok(default),
    }
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\d*\.?\d+)\s*(milliseconds?|msecs?|ms|seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w|years?|yrs?|y)?$",
    )
    .expect("duration pattern compiles")
});

/// Token lifetime in the `ms` style: `3600`, `45s`, `15 minutes`, `1.5h`, `7d`, `2w`, `1y`.
///
/// A bare number counts seconds. Units are case-insensitive. The result is truncated to whole
/// seconds and must be between one second and `MAX_TOKEN_TTL_DAYS`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(raw.trim())?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());

    let unit_secs = match unit.as_deref().unwrap_or("s") {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 0.001,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0,
        "d" | "day" | "days" => 86_400.0,
        "w" | "week" | "weeks" => 604_800.0,
        "y" | "yr" | "yrs" | "year" | "years" => 31_557_600.0,
        _ => return None,
    };

    let secs = (amount * unit_secs).trunc();
    if !(1.0..=MAX_TOKEN_TTL_SECS as f64).contains(&secs) {
        return None;
    }
    Duration::try_seconds(secs as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn empty_secret_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", ""),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.jwt.expires_in, Duration::hours(1));
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.max_connections, 5);
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn bad_expiry_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_IN", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_EXPIRES_IN", .. }));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("3600"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_duration("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("2h"), Some(Duration::hours(2)));
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("500ms"), None);
        assert_eq!(parse_duration("1fortnight"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn durations_accept_long_units_and_any_case() {
        assert_eq!(parse_duration("1H"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("1w"), Some(Duration::weeks(1)));
        assert_eq!(parse_duration("2 days"), Some(Duration::days(2)));
        assert_eq!(parse_duration("90 Minutes"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("2000ms"), Some(Duration::seconds(2)));
        assert_eq!(parse_duration("1y"), Some(Duration::seconds(31_557_600)));
    }

    #[test]
    fn absurd_expiry_is_rejected_at_startup() {
        assert_eq!(parse_duration("9000000000000s"), None);
        assert_eq!(parse_duration("3651d"), None);
        assert_eq!(parse_duration("3650d"), Some(Duration::days(3650)));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_IN", "9000000000000s"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_EXPIRES_IN", .. }));
    }
}
