//! Environment-driven configuration, read once at startup.

use std::env;

pub const DEFAULT_BUILD_ID: &str = "dev";
pub const DEFAULT_MAX_EVENTS: usize = 200;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    /// Opaque build identifier surfaced in responses for deploy debugging.
    pub build_id: String,
    /// Capacity of the in-memory update event log.
    pub max_events: usize,
    /// TCP port; the service always binds all interfaces.
    pub port: u16,
}

impl Config {
    /// Read `BUILD_ID`, `MAX_EVENTS`, and `PORT`, falling back to defaults on
    /// anything missing or unparsable. Never fails.
    pub fn from_env() -> Self {
        let build_id = env::var("BUILD_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUILD_ID.to_string());
        let max_events = env::var("MAX_EVENTS")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_EVENTS);
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            build_id,
            max_events,
            port,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_id: DEFAULT_BUILD_ID.to_string(),
            max_events: DEFAULT_MAX_EVENTS,
            port: DEFAULT_PORT,
        }
    }
}
