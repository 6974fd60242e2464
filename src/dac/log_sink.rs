//! Log-only DAC backend for running the relay without hardware attached.

use tracing::debug;

use super::{Channel, DacSink, DAC_NUM_CHANNELS};

/// Sink that logs each write and keeps the last level per channel.
#[derive(Debug, Clone, Default)]
pub struct LoggingDac {
    levels: [u16; DAC_NUM_CHANNELS],
}

impl LoggingDac {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `channel` (0 before any write).
    #[must_use]
    pub fn level(&self, channel: Channel) -> u16 {
        self.levels[channel.index() as usize]
    }
}

impl DacSink for LoggingDac {
    fn set_channel(&mut self, channel: Channel, value: u16) {
        self.levels[channel.index() as usize] = value;
        debug!(target: "attitude_relay::dac", channel = %channel, value, "DAC write");
    }
}
