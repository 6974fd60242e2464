//! # Error Types
//!
//! Custom error types for Attitude Relay using `thiserror`.

use thiserror::Error;

use crate::dac::Channel;

/// Main error type for Attitude Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound sensor message could not be parsed
    #[error("Malformed orientation message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Message arrived inside the rate limiter window
    #[error("Message dropped by rate limiter")]
    RateLimited,

    /// Message arrived while no link is established
    #[error("Message dropped: sensor link is not active")]
    LinkInactive,

    /// Two or more axes would share one DAC channel
    #[error("Duplicate channel assignment: yaw={yaw}, pitch={pitch}, roll={roll}")]
    DuplicateChannelAssignment {
        yaw: Channel,
        pitch: Channel,
        roll: Channel,
    },

    /// Required request parameter is absent
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Channel index outside A..D
    #[error("Invalid channel index: {0}")]
    InvalidChannel(i64),

    /// DAC hardware errors
    #[error("DAC error: {0}")]
    Dac(String),

    /// Sensor link errors
    #[error("Sensor link error: {0}")]
    Link(String),

    /// Relay task has stopped and can no longer serve requests
    #[error("Relay unavailable: {0}")]
    Unavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Attitude Relay
pub type Result<T> = std::result::Result<T, RelayError>;
