//! Runtime configuration.
//!
//! # Responsibilities
//! - Read the environment once at startup
//! - Provide defaults for every knob (the service boots with zero env)
//! - Derive the store connection URL from address + credential
//!
//! # Design Decisions
//! - Environment-only: this is a twelve-factor sidecar, no config file
//! - Loading never fails; malformed values fall back with a warning

use std::env;
use std::path::PathBuf;

/// Service configuration, populated from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the façade listens on (`PORT`, default 3000).
    pub port: u16,

    /// Deployment environment name (`APP_ENV`, default "development").
    pub app_env: String,

    /// Base URL of the upstream service (`ONIX_URL`).
    pub upstream_url: String,

    /// Store address as host:port (`REDIS_URL`).
    pub redis_addr: String,

    /// Store credential (`REDIS_PASSWORD`, default empty).
    pub redis_password: String,

    /// Path to the transform mapping file (`MAPPINGS_PATH`).
    pub mappings_path: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            port: parse_port(&get_env("PORT", "3000")),
            app_env: get_env("APP_ENV", "development"),
            upstream_url: get_env("ONIX_URL", "http://localhost:8080"),
            redis_addr: get_env("REDIS_URL", "localhost:6379"),
            redis_password: get_env("REDIS_PASSWORD", ""),
            mappings_path: PathBuf::from(get_env("MAPPINGS_PATH", "config/mappings.yaml")),
        }
    }

    /// Connection URL for the store client.
    pub fn redis_connection_url(&self) -> String {
        redis_connection_url(&self.redis_addr, &self.redis_password)
    }

    /// Socket address string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn get_env(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_port(raw: &str) -> u16 {
    match raw.parse() {
        Ok(port) => port,
        Err(_) => {
            tracing::warn!(raw = %raw, "PORT is not a valid port number, using 3000");
            3000
        }
    }
}

/// Build a `redis://` URL from a bare address and an optional password.
fn redis_connection_url(addr: &str, password: &str) -> String {
    if password.is_empty() {
        format!("redis://{}", addr)
    } else {
        format!("redis://:{}@{}", password, addr)
    }
}
