//! Server configuration, loaded from a TOML file.
//!
//! ```toml
//! listen_addr = "0.0.0.0:8080"
//!
//! [relay]
//! backend = "broker"
//! last_will_delay_ms = 1500
//!
//! [rooms]
//! code_length = 6
//! online_window_secs = 300
//!
//! [limits]
//! handshake_timeout_secs = 5
//! idle_timeout_secs = 120
//! ```
//!
//! Every section is optional. The file path comes from the first CLI
//! argument or `DUEL_CONFIG`, and `DUEL_BIND` overrides `listen_addr`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duel_protocol::RoomCode;
use duel_room::RoomConfig;
use serde::Deserialize;

use crate::DuelError;

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub relay: RelayConfig,
    pub rooms: RoomsConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            relay: RelayConfig::default(),
            rooms: RoomsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Which realtime relay the server exposes. Only one is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayBackend {
    /// `/relay/{roomId}`: per-room fan-out, no presence.
    #[default]
    Gateway,
    /// `/broker/{roomId}`: topic pub/sub with presence and last will.
    Broker,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub backend: RelayBackend,
    /// How long after an unclean drop a broker session's will is
    /// published.
    pub last_will_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend: RelayBackend::Gateway,
            last_will_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub max_players: usize,
    pub code_length: usize,
    pub online_window_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            code_length: 6,
            online_window_secs: 300,
        }
    }
}

/// Connection limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Time allowed for the WebSocket upgrade.
    pub handshake_timeout_secs: u64,
    /// An `/actions` connection with no request for this long is closed.
    /// Relay sessions are not subject to it.
    pub idle_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: 5,
            idle_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, DuelError> {
        toml::from_str(content).map_err(|e| DuelError::Config(e.to_string()))
    }

    /// Loads `path` if given and present, otherwise the defaults, then
    /// applies `DUEL_BIND`.
    ///
    /// # Errors
    /// [`DuelError::Config`] if the file exists but can't be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, DuelError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| DuelError::Config(format!("{}: {e}", path.display())))?;
                let config = Self::from_toml(&content)?;
                tracing::info!(path = %path.display(), "loaded configuration");
                config
            }
            Some(path) => {
                tracing::info!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var("DUEL_BIND")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        Ok(config)
    }

    /// The configuration file named on the command line or by
    /// `DUEL_CONFIG`.
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::args()
            .nth(1)
            .or_else(|| std::env::var("DUEL_CONFIG").ok())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Rejects settings the server can't run with.
    pub fn validate(&self) -> Result<(), DuelError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(DuelError::Config(format!(
                "listen_addr {:?} is not a socket address",
                self.listen_addr
            )));
        }
        if self.rooms.max_players != 2 {
            return Err(DuelError::Config(format!(
                "rooms.max_players must be 2, got {}",
                self.rooms.max_players
            )));
        }
        if self.rooms.code_length == 0 || self.rooms.code_length > RoomCode::MAX_LEN {
            return Err(DuelError::Config(format!(
                "rooms.code_length must be between 1 and {}, got {}",
                RoomCode::MAX_LEN,
                self.rooms.code_length
            )));
        }
        Ok(())
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.rooms.max_players,
            code_length: self.rooms.code_length,
            online_window: Duration::from_secs(self.rooms.online_window_secs),
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.handshake_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.idle_timeout_secs)
    }

    pub fn last_will_delay(&self) -> Duration {
        Duration::from_millis(self.relay.last_will_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
        assert_eq!(cfg.relay.backend, RelayBackend::Gateway);
        assert_eq!(cfg.last_will_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.room_config(), RoomConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_toml_keeps_defaults_for_missing_keys() {
        let cfg = ServerConfig::from_toml(
            r#"
listen_addr = "0.0.0.0:9090"

[relay]
backend = "broker"
"#,
        )
        .unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:9090");
        assert_eq!(cfg.relay.backend, RelayBackend::Broker);
        assert_eq!(cfg.relay.last_will_delay_ms, 1500);
        assert_eq!(cfg.rooms.code_length, 6);
        assert_eq!(cfg.idle_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_from_toml_rejects_unknown_backend() {
        let err = ServerConfig::from_toml("[relay]\nbackend = \"carrier-pigeon\"\n").unwrap_err();
        assert!(matches!(err, DuelError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = ServerConfig::default();
        cfg.listen_addr = "not an address".into();
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::default();
        cfg.rooms.max_players = 3;
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::default();
        cfg.rooms.code_length = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unparseable_code_length() {
        let mut cfg = ServerConfig::default();
        cfg.rooms.code_length = RoomCode::MAX_LEN;
        assert!(cfg.validate().is_ok());

        cfg.rooms.code_length = 40;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("code_length"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cfg = ServerConfig::load(Some(Path::new("/nonexistent/duel.toml"))).unwrap();
        assert_eq!(cfg.rooms, RoomsConfig::default());
    }
}
