//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Channel indices given here are the startup assignment only; changes made
//! through the control surface are not written back.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tokio::time::Duration;

use crate::channel_map::{ChannelAssignment, ChannelMap};
use crate::dac::mcp4728::MCP4728_ADDRESS_RANGE;
use crate::dac::Channel;
use crate::error::{RelayError, Result};

/// Main configuration structure
///
/// Every section and key is optional; anything absent takes its default.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub dac: DacConfig,
    #[serde(default)]
    pub test_pulse: TestPulseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor link configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    #[serde(default = "default_link_url")]
    pub url: String,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Control surface configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

/// Data path configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

/// Startup axis-to-channel assignment (indices 0-3)
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChannelConfig {
    #[serde(default = "default_yaw_channel")]
    pub yaw: u8,

    #[serde(default = "default_pitch_channel")]
    pub pitch: u8,

    #[serde(default = "default_roll_channel")]
    pub roll: u8,
}

/// DAC backend configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DacConfig {
    #[serde(default = "default_dac_backend")]
    pub backend: String,

    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,

    #[serde(default = "default_dac_address")]
    pub address: u8,
}

/// Channel test pulse configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TestPulseConfig {
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stdout only
    #[serde(default)]
    pub directory: String,
}

/// Supported DAC backends
pub const DAC_BACKENDS: &[&str] = &["mcp4728", "log"];

/// Supported log levels
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// Default value functions
fn default_link_url() -> String { "ws://192.168.4.1:81/".to_string() }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_http_bind() -> String { "0.0.0.0:80".to_string() }

fn default_update_interval_ms() -> u64 { 20 }

fn default_yaw_channel() -> u8 { 0 }
fn default_pitch_channel() -> u8 { 1 }
fn default_roll_channel() -> u8 { 2 }

fn default_dac_backend() -> String { "mcp4728".to_string() }
fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_dac_address() -> u8 { 0x64 }

fn default_dwell_ms() -> u64 { 500 }

fn default_log_level() -> String { "info".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: default_link_url(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            yaw: default_yaw_channel(),
            pitch: default_pitch_channel(),
            roll: default_roll_channel(),
        }
    }
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            backend: default_dac_backend(),
            i2c_bus: default_i2c_bus(),
            address: default_dac_address(),
        }
    }
}

impl Default for TestPulseConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use attitude_relay::config::Config;
    ///
    /// let config = Config::load("config/relay.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate link configuration
        if !(self.link.url.starts_with("ws://") || self.link.url.starts_with("wss://")) {
            return Err(invalid("link url must start with ws:// or wss://"));
        }

        if self.link.reconnect_interval_ms == 0 || self.link.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // Validate control surface address
        if self.http.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid(format!(
                "http bind '{}' is not a valid socket address",
                self.http.bind
            )));
        }

        // Validate timing fields
        if self.pipeline.update_interval_ms == 0 || self.pipeline.update_interval_ms > 1000 {
            return Err(invalid("update_interval_ms must be between 1 and 1000"));
        }

        if self.test_pulse.dwell_ms == 0 || self.test_pulse.dwell_ms > 10000 {
            return Err(invalid("dwell_ms must be between 1 and 10000"));
        }

        // Validate startup channel assignment (strict, unlike live updates)
        for (name, index) in [
            ("yaw", self.channels.yaw),
            ("pitch", self.channels.pitch),
            ("roll", self.channels.roll),
        ] {
            if Channel::try_from(index).is_err() {
                return Err(invalid(format!("{} channel must be between 0 and 3", name)));
            }
        }

        if let Err(e) = self.channel_map() {
            return Err(invalid(e.to_string()));
        }

        // Validate DAC backend
        if !DAC_BACKENDS.contains(&self.dac.backend.as_str()) {
            return Err(invalid("dac backend must be one of: mcp4728, log"));
        }

        if self.dac.backend == "mcp4728" && self.dac.i2c_bus.is_empty() {
            return Err(invalid("dac i2c_bus cannot be empty for the mcp4728 backend"));
        }

        if !MCP4728_ADDRESS_RANGE.contains(&self.dac.address) {
            return Err(invalid("dac address must be between 0x60 and 0x67"));
        }

        // Validate log level
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "log level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }

    /// Startup channel map built from `[channels]`.
    ///
    /// # Errors
    ///
    /// Returns error if an index is out of range or two axes share a channel.
    pub fn channel_map(&self) -> Result<ChannelMap> {
        ChannelMap::with_assignment(ChannelAssignment {
            yaw: Channel::try_from(self.channels.yaw)?,
            pitch: Channel::try_from(self.channels.pitch)?,
            roll: Channel::try_from(self.channels.roll)?,
        })
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.pipeline.update_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.link.reconnect_interval_ms)
    }

    pub fn test_dwell(&self) -> Duration {
        Duration::from_millis(self.test_pulse.dwell_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> RelayError {
    RelayError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[link]
url = "ws://10.0.0.5:81/"

[http]
bind = "127.0.0.1:8080"

[pipeline]

[channels]
yaw = 3

[dac]
backend = "log"

[test_pulse]

[logging]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.link.url, "ws://10.0.0.5:81/");
        assert_eq!(config.http.bind, "127.0.0.1:8080");
        assert_eq!(config.channels.yaw, 3);
        assert_eq!(config.channels.pitch, 1);
        assert_eq!(config.dac.backend, "log");
        assert_eq!(config.pipeline.update_interval_ms, 20);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/relay.toml");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/relay.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[test]
    fn test_load_missing_sections_use_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[channels]\nroll = 3\n").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.channels.roll, 3);
        assert_eq!(config.test_pulse, TestPulseConfig::default());
        assert_eq!(config.link, LinkConfig::default());
        assert_eq!(config.dac.address, 0x64);
    }

    #[test]
    fn test_load_empty_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.flush().unwrap();

        assert_eq!(Config::load(temp_file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_load_wrong_type() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[test_pulse]\ndwell_ms = \"long\"\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_link_scheme() {
        let mut config = create_valid_config();
        config.link.url = "http://192.168.4.1:81/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secure_link_scheme() {
        let mut config = create_valid_config();
        config.link.url = "wss://sensor.local/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconnect_interval_zero() {
        let mut config = create_valid_config();
        config.link.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_too_high() {
        let mut config = create_valid_config();
        config.link.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = create_valid_config();
        config.http.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_zero() {
        let mut config = create_valid_config();
        config.pipeline.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_too_high() {
        let mut config = create_valid_config();
        config.pipeline.update_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dwell_zero() {
        let mut config = create_valid_config();
        config.test_pulse.dwell_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dwell_too_high() {
        let mut config = create_valid_config();
        config.test_pulse.dwell_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_out_of_range() {
        let mut config = create_valid_config();
        config.channels.roll = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_channels() {
        let mut config = create_valid_config();
        config.channels.pitch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_map_from_config() {
        let mut config = create_valid_config();
        config.channels.yaw = 3;
        config.channels.pitch = 2;
        config.channels.roll = 1;

        let map = config.channel_map().unwrap();
        assert_eq!(
            map.get(),
            ChannelAssignment {
                yaw: Channel::D,
                pitch: Channel::C,
                roll: Channel::B,
            }
        );
    }

    #[test]
    fn test_invalid_backend() {
        let mut config = create_valid_config();
        config.dac.backend = "pcf8591".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_i2c_bus() {
        let mut config = create_valid_config();
        config.dac.i2c_bus = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_i2c_bus_with_log_backend() {
        let mut config = create_valid_config();
        config.dac.backend = "log".to_string();
        config.dac.i2c_bus = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dac_address_out_of_range() {
        let mut config = create_valid_config();
        config.dac.address = 0x70;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_durations() {
        let config = create_valid_config();
        assert_eq!(config.update_interval(), Duration::from_millis(20));
        assert_eq!(config.reconnect_interval(), Duration::from_millis(1000));
        assert_eq!(config.test_dwell(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_link_url(), "ws://192.168.4.1:81/");
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert_eq!(default_http_bind(), "0.0.0.0:80");
        assert_eq!(default_update_interval_ms(), 20);
        assert_eq!(default_yaw_channel(), 0);
        assert_eq!(default_pitch_channel(), 1);
        assert_eq!(default_roll_channel(), 2);
        assert_eq!(default_dac_backend(), "mcp4728");
        assert_eq!(default_i2c_bus(), "/dev/i2c-1");
        assert_eq!(default_dac_address(), 0x64);
        assert_eq!(default_dwell_ms(), 500);
        assert_eq!(default_log_level(), "info");
    }
}
