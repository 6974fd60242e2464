//! # Attitude Relay Library
//!
//! Receives yaw/pitch/roll telemetry from a sensor node and reproduces it as
//! analog levels on a 4-channel 12-bit DAC.
//!
//! Messages arrive over a WebSocket link, are rate limited and smoothed, then
//! scaled to DAC codes and written to the channels assigned to each axis. A
//! small HTTP control surface exposes the live values, the channel
//! assignment and a per-channel test pulse.

pub mod channel_map;
pub mod config;
pub mod control;
pub mod dac;
pub mod error;
pub mod http;
pub mod link;
pub mod logging;
pub mod orientation;
pub mod pipeline;
pub mod relay;
pub mod smoothing;
