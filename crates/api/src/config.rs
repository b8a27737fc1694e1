//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use booking_store::EmailUniqueness;
use notify::SinkConfig;
use reservation::{CoordinatorConfig, DEFAULT_MIN_NAME_LENGTH};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: Postgres connection string; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `CONFERENCE_NAME`: conference seeded at startup (default: `"Go Conference"`)
/// - `CONFERENCE_TICKETS`: its capacity when first created (default: `50`)
/// - `EMAIL_UNIQUENESS`: `global`, `per-conference` or `none` (default: `global`)
/// - `MIN_NAME_LENGTH`: shortest accepted first/last name (default: `2`)
/// - `STORE_TIMEOUT_MS`: bound on a booking transaction up to commit (default: `5000`)
/// - `NOTIFICATION_WORKERS`: confirmation worker tasks (default: `2`)
/// - `NOTIFICATION_QUEUE_CAPACITY`: pending confirmations (default: `64`)
///
/// Values that fail to parse fall back to their default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub conference_name: String,
    pub conference_tickets: u32,
    pub email_uniqueness: EmailUniqueness,
    pub min_name_length: usize,
    pub store_timeout: Duration,
    pub notification_workers: usize,
    pub notification_queue_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            conference_name: lookup("CONFERENCE_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.conference_name),
            conference_tickets: parse_var(&lookup, "CONFERENCE_TICKETS")
                .unwrap_or(defaults.conference_tickets),
            email_uniqueness: parse_var(&lookup, "EMAIL_UNIQUENESS")
                .unwrap_or(defaults.email_uniqueness),
            min_name_length: parse_var(&lookup, "MIN_NAME_LENGTH")
                .unwrap_or(defaults.min_name_length),
            store_timeout: parse_var(&lookup, "STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            notification_workers: parse_var(&lookup, "NOTIFICATION_WORKERS")
                .unwrap_or(defaults.notification_workers),
            notification_queue_capacity: parse_var(&lookup, "NOTIFICATION_QUEUE_CAPACITY")
                .unwrap_or(defaults.notification_queue_capacity),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            min_name_length: self.min_name_length,
            store_timeout: self.store_timeout,
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            workers: self.notification_workers,
            queue_capacity: self.notification_queue_capacity,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let sink = SinkConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 5,
            conference_name: "Go Conference".to_string(),
            conference_tickets: 50,
            email_uniqueness: EmailUniqueness::default(),
            min_name_length: DEFAULT_MIN_NAME_LENGTH,
            store_timeout: Duration::from_millis(5000),
            notification_workers: sink.workers,
            notification_queue_capacity: sink.queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_url, None);
        assert_eq!(config.conference_name, "Go Conference");
        assert_eq!(config.conference_tickets, 50);
        assert_eq!(config.email_uniqueness, EmailUniqueness::Global);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_empty_lookup_matches_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.notification_workers, 2);
        assert_eq!(config.notification_queue_capacity, 64);
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = from_pairs(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/bookings"),
            ("CONFERENCE_NAME", "Rust Conf"),
            ("CONFERENCE_TICKETS", "120"),
            ("EMAIL_UNIQUENESS", "per-conference"),
            ("MIN_NAME_LENGTH", "3"),
            ("STORE_TIMEOUT_MS", "250"),
            ("NOTIFICATION_WORKERS", "4"),
        ]);

        assert_eq!(config.port, 9000);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/bookings")
        );
        assert_eq!(config.conference_name, "Rust Conf");
        assert_eq!(config.conference_tickets, 120);
        assert_eq!(config.email_uniqueness, EmailUniqueness::PerConference);
        assert_eq!(config.coordinator_config().min_name_length, 3);
        assert_eq!(
            config.coordinator_config().store_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(config.sink_config().workers, 4);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "eighty"),
            ("CONFERENCE_TICKETS", "-1"),
            ("EMAIL_UNIQUENESS", "sometimes"),
            ("DATABASE_URL", "  "),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.conference_tickets, 50);
        assert_eq!(config.email_uniqueness, EmailUniqueness::Global);
        assert_eq!(config.database_url, None);
    }
}
