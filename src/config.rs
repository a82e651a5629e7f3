//! Startup configuration (A3): listen address, output destinations, default
//! dissolve pattern, and log verbosity. Parsed once at process start and
//! handed to the binary entry point.

use serde::Deserialize;

use crate::error::EngineError;
use crate::output::Destination;

#[derive(Debug, Deserialize)]
pub struct DestinationConfig {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub start_led: usize,
    #[serde(default = "default_end_led")]
    pub end_led: i64,
    #[serde(default)]
    pub copy_mode: bool,
}

const fn default_end_led() -> i64 {
    -1
}

impl DestinationConfig {
    #[must_use]
    pub fn into_destination(self) -> Destination {
        Destination {
            address: format!("{}:{}", self.ip, self.port),
            start_led: self.start_led,
            end_led: self.end_led,
            copy_mode: self.copy_mode,
        }
    }
}

/// Process startup configuration (A3).
#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub listen_address: String,
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
    #[serde(default = "default_control_address")]
    pub output_control_address: String,
    #[serde(default)]
    pub default_dissolve_pattern_id: u32,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_control_address() -> String {
    "/light/serial".to_owned()
}

fn default_log_filter() -> String {
    "info".to_owned()
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;
        serde_json::from_str(&text).map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let json = r#"{"listen_address": "0.0.0.0:9000"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:9000");
        assert_eq!(config.output_control_address, "/light/serial");
        assert_eq!(config.log_filter, "info");
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn parses_destinations() {
        let json = r#"{
            "listen_address": "0.0.0.0:9000",
            "destinations": [{"ip": "192.168.1.10", "port": 7000, "copy_mode": true}]
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.destinations.len(), 1);
        let dest = config.destinations.into_iter().next().unwrap().into_destination();
        assert_eq!(dest.address, "192.168.1.10:7000");
        assert!(dest.copy_mode);
    }
}
