//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Everything except the server host has a default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::irc::{Identity, Target};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Free-form values read by plugins, e.g. `oper-name` or
    /// `record-ip-file`.
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

/// The server to connect to and who to be there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address of the IRC server.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_ident")]
    pub ident: String,
}

impl ServerConfig {
    pub fn identity(&self) -> Identity {
        Identity {
            nick: self.nick.clone(),
            name: self.name.clone(),
            ident: self.ident.clone(),
        }
    }

    pub fn target(&self) -> Target {
        Target {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
        }
    }
}

/// Connection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline for each read and write.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay(),
            quit_message: default_quit_message(),
        }
    }
}

/// Diagnostic log settings. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_port() -> u16 {
    6697
}
fn default_true() -> bool {
    true
}
fn default_nick() -> String {
    "crabdrop".to_string()
}
fn default_name() -> String {
    "crabdrop".to_string()
}
fn default_ident() -> String {
    "crabdrop".to_string()
}
fn default_timeout_secs() -> u64 {
    5 * 60
}
fn default_reconnect_delay() -> u64 {
    30
}
fn default_quit_message() -> String {
    "crabdrop".to_string()
}
fn default_level() -> String {
    "info".to_string()
}
