//! # Ingest Pipeline
//!
//! Turns inbound orientation messages into DAC writes.
//!
//! ## Link States
//!
//! - **Idle**: no sensor link; messages are dropped.
//! - **Active**: link established; messages flow through the pipeline.
//!
//! Every Idle→Active transition starts from zeroed smoothing state.
//!
//! ## Message Path
//!
//! 1. Rate limit: drop if the previous accepted message is less than the
//!    update interval old (50 Hz by default)
//! 2. Parse the JSON payload
//! 3. Push yaw/pitch/roll through the smoothing buffers
//! 4. Rescale smoothed degrees to 12-bit levels
//! 5. Write each level to the channel its axis is mapped to
//!
//! Dropped messages never reach the smoothing buffers; only the counters in
//! [`PipelineStats`] record them.

use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::channel_map::ChannelMap;
use crate::dac::{axis_levels, AxisLevels, Channel, DacSink, DAC_VALUE_MIN};
use crate::error::{RelayError, Result};
use crate::orientation::{parse_message, Axis, Orientation};
use crate::smoothing::SmoothingState;

/// Minimum spacing between accepted messages (50 Hz).
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(20);

/// Sensor link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Active,
}

/// Counters for the periodic status log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub accepted: u64,
    pub rate_limited: u64,
    pub malformed: u64,
    pub connects: u64,
}

/// Data path from sensor messages to the DAC.
///
/// Owns the smoothing state, the channel map and the DAC sink. The control
/// surface reaches the same state through the accessors below.
pub struct IngestPipeline<D> {
    state: LinkState,
    smoothing: SmoothingState,
    channel_map: ChannelMap,
    dac: D,
    update_interval: Duration,
    last_accepted: Option<Instant>,
    stats: PipelineStats,
}

impl<D> std::fmt::Debug for IngestPipeline<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("state", &self.state)
            .field("channel_map", &self.channel_map)
            .field("update_interval", &self.update_interval)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<D: DacSink> IngestPipeline<D> {
    /// Creates an idle pipeline with the default update interval.
    pub fn new(dac: D, channel_map: ChannelMap) -> Self {
        Self::with_update_interval(dac, channel_map, DEFAULT_UPDATE_INTERVAL)
    }

    /// Creates an idle pipeline with a custom update interval.
    pub fn with_update_interval(dac: D, channel_map: ChannelMap, update_interval: Duration) -> Self {
        Self {
            state: LinkState::Idle,
            smoothing: SmoothingState::new(),
            channel_map,
            dac,
            update_interval,
            last_accepted: None,
            stats: PipelineStats::default(),
        }
    }

    /// Drive every channel to zero.
    pub fn zero_outputs(&mut self) {
        for channel in Channel::ALL {
            self.dac.set_channel(channel, DAC_VALUE_MIN);
        }
    }

    /// Sensor link came up: enter Active with zeroed smoothing.
    pub fn on_connect(&mut self) {
        self.smoothing.reset();
        self.state = LinkState::Active;
        self.stats.connects += 1;
        info!("Sensor link connected, smoothing reset");
    }

    /// Sensor link went down: enter Idle.
    pub fn on_disconnect(&mut self) {
        if self.state == LinkState::Active {
            info!("Sensor link disconnected");
        }
        self.state = LinkState::Idle;
    }

    /// Process one inbound message received at `now`.
    ///
    /// # Returns
    ///
    /// The levels written for yaw, pitch and roll.
    ///
    /// # Errors
    ///
    /// - [`RelayError::LinkInactive`] if the pipeline is Idle
    /// - [`RelayError::RateLimited`] if inside the update interval
    /// - [`RelayError::MalformedMessage`] if the payload does not parse
    ///
    /// None of these change pipeline state or touch the DAC.
    pub fn handle_message(&mut self, payload: &str, now: Instant) -> Result<AxisLevels> {
        if self.state != LinkState::Active {
            return Err(RelayError::LinkInactive);
        }

        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.update_interval {
                self.stats.rate_limited += 1;
                return Err(RelayError::RateLimited);
            }
        }

        let sample = match parse_message(payload) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.malformed += 1;
                return Err(e);
            }
        };
        self.last_accepted = Some(now);
        self.stats.accepted += 1;

        let smoothed = self.smoothing.push(sample);
        let levels = axis_levels(&smoothed);
        self.dispatch(&levels);

        debug!(
            "{:.2}, {:.2}, {:.2}",
            smoothed.yaw, smoothed.pitch, smoothed.roll
        );
        Ok(levels)
    }

    /// Write `levels` to the channels their axes are mapped to.
    pub fn dispatch(&mut self, levels: &AxisLevels) {
        for axis in Axis::ALL {
            let channel = self.channel_map.channel_for(axis);
            self.dac.set_channel(channel, levels[axis.index()]);
        }
    }

    /// Current smoothed orientation.
    pub fn live_values(&self) -> Orientation {
        self.smoothing.current()
    }

    /// Levels the pipeline is currently driving, derived from live values.
    pub fn current_levels(&self) -> AxisLevels {
        axis_levels(&self.live_values())
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.channel_map
    }

    pub fn channel_map_mut(&mut self) -> &mut ChannelMap {
        &mut self.channel_map
    }

    pub fn dac_mut(&mut self) -> &mut D {
        &mut self.dac
    }
}
