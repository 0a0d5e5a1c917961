use std::collections::HashMap;

use chrono_tz::Tz;
use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::db::DbConfig;
use crate::forecast::{Coordinate, DARKSKY_API_URL};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Dark Sky API key
    pub darksky_api_key: String,

    /// Sender address and the only recipient in debug mode
    pub admin_email: String,

    /// Groundhandling sites keyed by the name recipients refer to
    #[serde(default)]
    pub locations: HashMap<String, Location>,

    /// Recipients, processed in order
    #[serde(default)]
    pub recipients: Vec<Recipient>,

    /// IANA timezone for "today", the fixed window bounds and display
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Forecast API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Delay before the single fetch retry
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Path to the sendmail binary
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: String,

    /// Forecast archive, only used with --persist
    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub long: f64,
    /// Free text appended to every mail for this site
    #[serde(default)]
    pub notice: String,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.lat,
            longitude: self.long,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
    /// Key into `locations`
    pub location: String,
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Berlin
}

fn default_api_base_url() -> String {
    DARKSKY_API_URL.to_string()
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_sendmail_path() -> String {
    crate::mail::DEFAULT_SENDMAIL_PATH.to_string()
}

impl AppConfig {
    pub fn load(config_name: &str) -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .add_source(File::with_name(config_name).required(false))
            .add_source(File::with_name(&format!("{}.local", config_name)).required(false))
            // Override with environment variables (prefixed with GROUNDHANDLING_)
            .add_source(
                Environment::with_prefix("GROUNDHANDLING")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse a JSON document directly, without files or environment
    #[cfg(test)]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(json, config::FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    /// Look up a location, ignoring key case since the config layer may
    /// normalize it.
    pub fn location(&self, key: &str) -> Option<&Location> {
        self.locations.get(key).or_else(|| {
            self.locations
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, location)| location)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "darksky_api_key": "abc123",
        "admin_email": "admin@example.com",
        "locations": {
            "Wasserkuppe": {
                "name": "Wasserkuppe",
                "lat": 50.4986,
                "long": 9.9381,
                "notice": "Bitte Flugplatzregeln beachten.\n"
            }
        },
        "recipients": [
            { "name": "Anna", "email": "anna@example.com", "location": "Wasserkuppe" },
            { "name": "Admin", "email": "admin@example.com", "location": "Wasserkuppe" }
        ]
    }"#;

    #[test]
    fn test_from_json_with_defaults() {
        let config = AppConfig::from_json(SAMPLE).unwrap();

        assert_eq!(config.darksky_api_key, "abc123");
        assert_eq!(config.admin_email, "admin@example.com");
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.api_base_url, "https://api.darksky.net");
        assert_eq!(config.retry_delay_secs, 10);
        assert_eq!(config.sendmail_path, "/usr/sbin/sendmail");
        assert_eq!(config.db.url, "sqlite:data/forecasts.db");
        assert_eq!(config.recipients.len(), 2);
        assert_eq!(config.recipients[0].name, "Anna");
    }

    #[test]
    fn test_location_lookup_ignores_case() {
        let config = AppConfig::from_json(SAMPLE).unwrap();

        let location = config.location("Wasserkuppe").unwrap();
        assert_eq!(location.name, "Wasserkuppe");
        assert_eq!(location.coordinate().latitude, 50.4986);
        assert!(config.location("wasserkuppe").is_some());
        assert!(config.location("Rhön").is_none());
    }

    #[test]
    fn test_timezone_override() {
        let json = r#"{
            "darksky_api_key": "k",
            "admin_email": "a@example.com",
            "timezone": "Europe/Zurich"
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Zurich);
        assert!(config.recipients.is_empty());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let json = r#"{ "admin_email": "a@example.com" }"#;
        assert!(AppConfig::from_json(json).is_err());
    }
}
