//! # Orientation Module
//!
//! Axis identities, per-axis physical domains and the inbound sensor message.
//!
//! ## Axis Domains
//!
//! | Axis | Index | Domain (degrees) |
//! |------|-------|------------------|
//! | Yaw | 0 | -180.0 to 180.0 |
//! | Pitch | 1 | -90.0 to 90.0 |
//! | Roll | 2 | -180.0 to 180.0 |
//!
//! ## Message Format
//!
//! The sensor node sends one JSON object per WebSocket text frame:
//!
//! ```text
//! {"yaw": 12.5, "pitch": -3.0, "roll": 0.25}
//! ```
//!
//! A missing field reads as `0.0`; a field of the wrong type makes the whole
//! message malformed.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Number of orientation axes carried by the telemetry stream.
pub const AXIS_COUNT: usize = 3;

/// One orientation degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Yaw,
    Pitch,
    Roll,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::Yaw, Axis::Pitch, Axis::Roll];

    /// Position of this axis in per-axis arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Axis::Yaw => 0,
            Axis::Pitch => 1,
            Axis::Roll => 2,
        }
    }

    /// Nominal physical domain `(min, max)` in degrees.
    #[must_use]
    pub const fn domain(self) -> (f32, f32) {
        match self {
            Axis::Yaw | Axis::Roll => (-180.0, 180.0),
            Axis::Pitch => (-90.0, 90.0),
        }
    }

    /// Lowercase field name used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Axis::Yaw => "yaw",
            Axis::Pitch => "pitch",
            Axis::Roll => "roll",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Yaw/pitch/roll triple in degrees.
///
/// Used both for raw inbound samples and for smoothed live values.
///
/// # Examples
///
/// ```
/// use attitude_relay::orientation::{Axis, Orientation};
///
/// let o = Orientation::new(10.0, -5.0, 0.5);
/// assert_eq!(o.get(Axis::Pitch), -5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub roll: f32,
}

impl Orientation {
    #[must_use]
    pub const fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Builds an orientation from values in axis index order.
    #[must_use]
    pub const fn from_array(values: [f32; AXIS_COUNT]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Returns the value of one axis.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Yaw => self.yaw,
            Axis::Pitch => self.pitch,
            Axis::Roll => self.roll,
        }
    }

    /// Returns the values in axis index order.
    #[must_use]
    pub const fn to_array(&self) -> [f32; AXIS_COUNT] {
        [self.yaw, self.pitch, self.roll]
    }
}

/// Parse one inbound sensor message.
///
/// # Errors
///
/// Returns [`RelayError::MalformedMessage`] if the payload is not a JSON
/// object with numeric axis fields. Arrays are rejected even when their
/// elements line up with yaw, pitch and roll.
///
/// # Examples
///
/// ```
/// use attitude_relay::orientation::parse_message;
///
/// let sample = parse_message(r#"{"yaw":90,"pitch":0,"roll":-90}"#).unwrap();
/// assert_eq!(sample.yaw, 90.0);
/// assert_eq!(sample.roll, -90.0);
/// ```
pub fn parse_message(payload: &str) -> Result<Orientation> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    if !value.is_object() {
        return Err(RelayError::MalformedMessage(serde::de::Error::custom(
            "orientation message must be a JSON object",
        )));
    }
    Ok(serde_json::from_value(value)?)
}
