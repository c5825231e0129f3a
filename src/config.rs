//! Server configuration: defaults, a `quiznight.toml` file, and
//! `QUIZNIGHT_*` environment variable overrides. Structure and loading order
//! follow the teacher's `config.rs` almost exactly; the auth/GitHub-specific
//! sections have no counterpart here and are replaced by the session-timing
//! knobs a quiz session actually needs.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::session::Timings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub limits: LimitsConfig,
    pub timings: TimingsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".parse().expect("valid default addr"),
            limits: LimitsConfig::default(),
            timings: TimingsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_participants_per_session: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_participants_per_session: 100 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub auto_reveal_secs: u64,
    pub auto_advance_secs: u64,
    pub reap_secs: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self { auto_reveal_secs: 1, auto_advance_secs: 5, reap_secs: 600 }
    }
}

impl TimingsConfig {
    pub fn to_timings(self) -> Timings {
        Timings {
            auto_reveal: Duration::from_secs(self.auto_reveal_secs),
            auto_advance: Duration::from_secs(self.auto_advance_secs),
            reap: Duration::from_secs(self.reap_secs),
        }
    }
}

impl ServerConfig {
    /// Load from `quiznight.toml` in the working directory (if present),
    /// then apply `QUIZNIGHT_*` environment overrides. Falls back to
    /// built-in defaults when no file exists.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("quiznight.toml") {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(%err, "failed to parse quiznight.toml, using defaults");
                    Self::default()
                },
            },
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("QUIZNIGHT_LISTEN_ADDR") {
            match addr.parse() {
                Ok(parsed) => self.listen_addr = parsed,
                Err(err) => tracing::warn!(%err, %addr, "ignoring invalid QUIZNIGHT_LISTEN_ADDR"),
            }
        }
        if let Ok(raw) = std::env::var("QUIZNIGHT_MAX_PARTICIPANTS_PER_SESSION") {
            match raw.parse() {
                Ok(n) => self.limits.max_participants_per_session = n,
                Err(err) => tracing::warn!(%err, "ignoring invalid QUIZNIGHT_MAX_PARTICIPANTS_PER_SESSION"),
            }
        }
    }

    fn validate(&self) {
        if self.limits.max_participants_per_session == 0 {
            tracing::error!("limits.max_participants_per_session must be nonzero");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.limits.max_participants_per_session, 100);
        assert_eq!(config.timings.auto_advance_secs, 5);
    }

    #[test]
    fn parses_minimal_toml() {
        let toml_str = r#"
            listen_addr = "127.0.0.1:9000"
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.limits.max_participants_per_session, 100);
    }

    #[test]
    fn timings_config_converts_to_durations() {
        let timings = TimingsConfig::default().to_timings();
        assert_eq!(timings.auto_reveal, Duration::from_secs(1));
        assert_eq!(timings.reap, Duration::from_secs(600));
    }
}
