//! Application configuration loaded from `healthrisk.toml` and the environment.
//!
//! Environment variables win over the file. Every field has a default so the
//! service starts with no configuration at all in development.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQLite connection string, e.g. `sqlite://users.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Serialized model written by `healthrisk train`.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Directory for uploaded profile photos, served under `/static/uploads`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(
        default = "default_session_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub session_ttl: Duration,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("healthrisk.toml"))
            .merge(Env::raw())
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            port: default_port(),
            log_level: default_log_level(),
            model_path: default_model_path(),
            upload_dir: default_upload_dir(),
            session_ttl: default_session_ttl(),
            shutdown_timeout: default_shutdown_timeout(),
            secure_cookies: false,
        }
    }
}

fn default_database_url() -> String {
    "sqlite://users.db".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("health_risk_model.json")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("static/uploads")
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Parse a duration given either as bare seconds or a string like `"90s"`, `"7d"`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_all_time_units();
    let parsed = parser
        .parse(input.trim())
        .map_err(|e| format!("invalid duration '{input}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{input}': {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604_800));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_url, "sqlite://users.db");
        assert_eq!(config.session_ttl, Duration::from_secs(604_800));
        assert!(!config.secure_cookies);
    }

    #[test]
    fn duration_accepts_bare_seconds_and_strings() {
        let config: Config = Figment::new()
            .merge(Serialized::default("shutdown_timeout", 30))
            .merge(Serialized::default("session_ttl", "12h"))
            .extract()
            .unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.session_ttl, Duration::from_secs(12 * 3600));
    }
}
