//! # DAC Module
//!
//! Analog output side of the relay.
//!
//! This module handles:
//! - Identifying the four physical output channels (A-D)
//! - The [`DacSink`] abstraction the pipeline writes through
//! - Rescaling smoothed degrees into 12-bit output levels
//! - MCP4728 and log-only sink implementations

pub mod log_sink;
pub mod mcp4728;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::orientation::{Axis, Orientation, AXIS_COUNT};

/// Highest 12-bit output level (full scale).
pub const DAC_VALUE_MAX: u16 = 4095;

/// Lowest output level.
pub const DAC_VALUE_MIN: u16 = 0;

/// Number of physical output channels.
pub const DAC_NUM_CHANNELS: usize = 4;

/// Output levels in axis index order (yaw, pitch, roll).
pub type AxisLevels = [u16; AXIS_COUNT];

/// One physical DAC output.
///
/// Serialized as its index (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Channel {
    A,
    B,
    C,
    D,
}

impl Channel {
    /// All channels in index order.
    pub const ALL: [Channel; DAC_NUM_CHANNELS] = [Channel::A, Channel::B, Channel::C, Channel::D];

    /// Index of this channel (A = 0 ... D = 3).
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Channel::A => 0,
            Channel::B => 1,
            Channel::C => 2,
            Channel::D => 3,
        }
    }

    /// Converts any integer into a channel, clamping into `0..=3`.
    ///
    /// # Examples
    ///
    /// ```
    /// use attitude_relay::dac::Channel;
    ///
    /// assert_eq!(Channel::from_index_clamped(5), Channel::D);
    /// assert_eq!(Channel::from_index_clamped(-1), Channel::A);
    /// assert_eq!(Channel::from_index_clamped(2), Channel::C);
    /// ```
    #[must_use]
    pub fn from_index_clamped(index: i64) -> Self {
        Self::ALL[index.clamp(0, DAC_NUM_CHANNELS as i64 - 1) as usize]
    }
}

impl TryFrom<u8> for Channel {
    type Error = RelayError;

    fn try_from(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(RelayError::InvalidChannel(i64::from(index)))
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.index()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::A => "A",
            Channel::B => "B",
            Channel::C => "C",
            Channel::D => "D",
        };
        f.write_str(name)
    }
}

/// Four-channel analog output device.
///
/// Writes are fire-and-forget: implementations report hardware faults through
/// logging, never to the caller. Values are passed through unclamped.
#[cfg_attr(test, mockall::automock)]
pub trait DacSink: Send {
    /// Set the output level of one channel.
    fn set_channel(&mut self, channel: Channel, value: u16);
}

impl<T: DacSink + ?Sized> DacSink for Box<T> {
    fn set_channel(&mut self, channel: Channel, value: u16) {
        (**self).set_channel(channel, value);
    }
}

/// Rescales a value from `[min, max]` to the 12-bit output range.
///
/// Computes `round((value - min) * 4095 / (max - min))`. Inputs outside the
/// domain are not clamped; the result only saturates at the `u16` bounds.
///
/// # Examples
///
/// ```
/// use attitude_relay::dac::scale_to_dac;
///
/// assert_eq!(scale_to_dac(-180.0, -180.0, 180.0), 0);
/// assert_eq!(scale_to_dac(180.0, -180.0, 180.0), 4095);
/// assert_eq!(scale_to_dac(45.0, -180.0, 180.0), 2559);
/// ```
#[must_use]
pub fn scale_to_dac(value: f32, min: f32, max: f32) -> u16 {
    let scaled = ((value - min) * f32::from(DAC_VALUE_MAX) / (max - min)).round();
    scaled as u16
}

/// Output level for one axis value, using that axis's domain.
#[must_use]
pub fn axis_level(axis: Axis, value: f32) -> u16 {
    let (min, max) = axis.domain();
    scale_to_dac(value, min, max)
}

/// Output levels for every axis of an orientation.
#[must_use]
pub fn axis_levels(orientation: &Orientation) -> AxisLevels {
    Axis::ALL.map(|axis| axis_level(axis, orientation.get(axis)))
}
