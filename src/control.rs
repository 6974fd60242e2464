//! # Control Surface
//!
//! Request handlers for reading live values, reading and writing the channel
//! map, and pulsing a single channel to identify its wiring.
//!
//! | Operation | Input | Output |
//! |-----------|-------|--------|
//! | ReadValues | - | smoothed yaw/pitch/roll |
//! | ReadConfig | - | axis → channel index |
//! | WriteConfig | optional axis → channel index | assignment in effect |
//! | TestChannel | channel index | channel pulsed |
//!
//! The handlers share pipeline state with the data path and are invoked from
//! the same relay loop, so they never interleave with message handling.

use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::channel_map::ChannelAssignment;
use crate::dac::{Channel, DacSink, DAC_VALUE_MAX, DAC_VALUE_MIN};
use crate::error::{RelayError, Result};
use crate::orientation::Orientation;
use crate::pipeline::IngestPipeline;

/// How long a test pulse holds full scale.
pub const DEFAULT_TEST_DWELL: Duration = Duration::from_millis(500);

/// Channel index from any numeric input.
///
/// Fractions truncate toward zero and values beyond `i64` saturate, so the
/// later clamp into `0..=3` sees the right side. Non-finite input reads as 0.
#[must_use]
pub fn saturating_index(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

fn deserialize_index<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map(saturating_index))
}

/// Partial channel-map update; absent fields keep their current channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, deserialize_with = "deserialize_index")]
    pub yaw: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_index")]
    pub pitch: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_index")]
    pub roll: Option<i64>,
}

impl ConfigUpdate {
    /// Parse a request body, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body does not parse, is not an object,
    /// or carries a non-numeric channel.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("config body must be a JSON object"));
        }
        serde_json::from_value(value)
    }
}

/// `{success, message?}` body returned by mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Control operations over a pipeline's shared state.
#[derive(Debug, Clone, Copy)]
pub struct ControlSurface {
    dwell: Duration,
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new(DEFAULT_TEST_DWELL)
    }
}

impl ControlSurface {
    #[must_use]
    pub fn new(dwell: Duration) -> Self {
        Self { dwell }
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Current smoothed yaw/pitch/roll.
    pub fn read_values<D: DacSink>(&self, pipeline: &IngestPipeline<D>) -> Orientation {
        pipeline.live_values()
    }

    /// Current axis-to-channel assignment.
    pub fn read_config<D: DacSink>(&self, pipeline: &IngestPipeline<D>) -> ChannelAssignment {
        pipeline.channel_map().get()
    }

    /// Apply a partial channel-map update.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateChannelAssignment`] if the resulting
    /// channels are not distinct after clamping; the map is unchanged.
    pub fn write_config<D: DacSink>(
        &self,
        pipeline: &mut IngestPipeline<D>,
        update: ConfigUpdate,
    ) -> Result<ChannelAssignment> {
        let current = pipeline.channel_map().get();
        let applied = pipeline.channel_map_mut().set(
            update.yaw.unwrap_or_else(|| i64::from(current.yaw.index())),
            update.pitch.unwrap_or_else(|| i64::from(current.pitch.index())),
            update.roll.unwrap_or_else(|| i64::from(current.roll.index())),
        )?;

        info!(
            "Updated channel mapping: Yaw={}, Pitch={}, Roll={}",
            applied.yaw.index(),
            applied.pitch.index(),
            applied.roll.index()
        );
        Ok(applied)
    }

    /// Pulse one channel to full scale for the dwell, then restore outputs.
    ///
    /// The mapped channels are restored to the levels derived from the live
    /// values captured before the pulse. A pulsed channel with no axis mapped
    /// to it is returned to zero.
    ///
    /// The caller is held for the whole dwell.
    ///
    /// # Returns
    ///
    /// The channel that was pulsed, after clamping.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingParameter`] if `channel` is `None`; the
    /// DAC is not touched.
    pub async fn test_channel<D: DacSink>(
        &self,
        pipeline: &mut IngestPipeline<D>,
        channel: Option<i64>,
    ) -> Result<Channel> {
        let channel = channel
            .map(Channel::from_index_clamped)
            .ok_or(RelayError::MissingParameter("channel"))?;

        let levels = pipeline.current_levels();
        let unmapped = pipeline.channel_map().axis_on(channel).is_none();

        pipeline.dac_mut().set_channel(channel, DAC_VALUE_MAX);
        sleep(self.dwell).await;

        pipeline.dispatch(&levels);
        if unmapped {
            pipeline.dac_mut().set_channel(channel, DAC_VALUE_MIN);
        }

        info!("Tested channel {}", channel.index());
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::ChannelMap;
    use crate::dac::mocks::RecordingDac;
    use crate::dac::MockDacSink;
    use tokio::time::Instant;

    fn pipeline_with_sample() -> (IngestPipeline<RecordingDac>, RecordingDac) {
        let dac = RecordingDac::new();
        let mut pipeline = IngestPipeline::new(dac.clone(), ChannelMap::new());
        pipeline.on_connect();
        pipeline
            .handle_message(r#"{"yaw":90,"pitch":0,"roll":-90}"#, Instant::now())
            .unwrap();
        dac.clear();
        (pipeline, dac)
    }

    // ==================== Read Tests ====================

    #[test]
    fn test_read_values() {
        let (pipeline, _dac) = pipeline_with_sample();
        let control = ControlSurface::default();
        assert_eq!(
            control.read_values(&pipeline),
            Orientation::new(45.0, 0.0, -45.0)
        );
    }

    #[test]
    fn test_read_config_default() {
        let pipeline = IngestPipeline::new(RecordingDac::new(), ChannelMap::new());
        let control = ControlSurface::default();
        assert_eq!(control.read_config(&pipeline), ChannelAssignment::default());
    }

    // ==================== WriteConfig Tests ====================

    #[test]
    fn test_write_then_read_returns_input() {
        let mut pipeline = IngestPipeline::new(RecordingDac::new(), ChannelMap::new());
        let control = ControlSurface::default();

        let update = ConfigUpdate {
            yaw: Some(2),
            pitch: Some(3),
            roll: Some(0),
        };
        control.write_config(&mut pipeline, update).unwrap();

        let config = control.read_config(&pipeline);
        assert_eq!(config.yaw, Channel::C);
        assert_eq!(config.pitch, Channel::D);
        assert_eq!(config.roll, Channel::A);
    }

    #[test]
    fn test_write_missing_fields_keep_current() {
        let mut pipeline = IngestPipeline::new(RecordingDac::new(), ChannelMap::new());
        let control = ControlSurface::default();

        control
            .write_config(
                &mut pipeline,
                ConfigUpdate {
                    yaw: Some(3),
                    ..ConfigUpdate::default()
                },
            )
            .unwrap();
        // Pitch and roll keep B and C, not any fixed default
        control
            .write_config(
                &mut pipeline,
                ConfigUpdate {
                    pitch: Some(0),
                    ..ConfigUpdate::default()
                },
            )
            .unwrap();

        let config = control.read_config(&pipeline);
        assert_eq!(config.yaw, Channel::D);
        assert_eq!(config.pitch, Channel::A);
        assert_eq!(config.roll, Channel::C);
    }

    #[test]
    fn test_write_duplicate_leaves_map_unchanged() {
        let mut pipeline = IngestPipeline::new(RecordingDac::new(), ChannelMap::new());
        let control = ControlSurface::default();
        let before = control.read_config(&pipeline);

        // Roll defaults to its current channel C, colliding with yaw
        let err = control
            .write_config(
                &mut pipeline,
                ConfigUpdate {
                    yaw: Some(2),
                    ..ConfigUpdate::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, RelayError::DuplicateChannelAssignment { .. }));
        assert_eq!(control.read_config(&pipeline), before);
    }

    #[test]
    fn test_write_clamps_out_of_range() {
        let mut pipeline = IngestPipeline::new(RecordingDac::new(), ChannelMap::new());
        let control = ControlSurface::default();

        let applied = control
            .write_config(
                &mut pipeline,
                ConfigUpdate {
                    yaw: Some(5),
                    pitch: Some(-1),
                    roll: Some(2),
                },
            )
            .unwrap();
        assert_eq!(applied.yaw, Channel::D);
        assert_eq!(applied.pitch, Channel::A);
        assert_eq!(applied.roll, Channel::C);
    }

    #[test]
    fn test_config_update_deserializes_partial() {
        let update: ConfigUpdate = serde_json::from_str(r#"{"roll":3}"#).unwrap();
        assert_eq!(
            update,
            ConfigUpdate {
                yaw: None,
                pitch: None,
                roll: Some(3),
            }
        );
    }

    #[test]
    fn test_config_update_saturates_huge_numbers() {
        let update =
            ConfigUpdate::from_slice(br#"{"yaw":10000000000000000000,"pitch":-1e30,"roll":2.7}"#)
                .unwrap();
        assert_eq!(update.yaw, Some(i64::MAX));
        assert_eq!(update.pitch, Some(i64::MIN));
        assert_eq!(update.roll, Some(2));
    }

    #[test]
    fn test_config_update_rejects_non_objects() {
        assert!(ConfigUpdate::from_slice(b"[3,0,1]").is_err());
        assert!(ConfigUpdate::from_slice(b"3").is_err());
        assert!(ConfigUpdate::from_slice(b"null").is_err());
        assert!(ConfigUpdate::from_slice(br#"{"yaw":"north"}"#).is_err());
    }

    #[test]
    fn test_saturating_index() {
        assert_eq!(saturating_index(2.0), 2);
        assert_eq!(saturating_index(2.7), 2);
        assert_eq!(saturating_index(-0.5), 0);
        assert_eq!(saturating_index(1e20), i64::MAX);
        assert_eq!(saturating_index(-1e20), i64::MIN);
        assert_eq!(saturating_index(f64::NAN), 0);
        assert_eq!(saturating_index(f64::INFINITY), 0);
    }

    #[test]
    fn test_status_response_shape() {
        assert_eq!(
            serde_json::to_value(StatusResponse::ok()).unwrap(),
            serde_json::json!({"success": true})
        );
        assert_eq!(
            serde_json::to_value(StatusResponse::failure("nope")).unwrap(),
            serde_json::json!({"success": false, "message": "nope"})
        );
    }

    // ==================== TestChannel Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_channel_missing_parameter_touches_nothing() {
        let mut dac = MockDacSink::new();
        dac.expect_set_channel().never();

        let mut pipeline = IngestPipeline::new(dac, ChannelMap::new());
        let control = ControlSurface::default();

        let err = control.test_channel(&mut pipeline, None).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingParameter("channel")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_pulses_then_restores() {
        let (mut pipeline, dac) = pipeline_with_sample();
        let control = ControlSurface::default();

        let start = Instant::now();
        let channel = control.test_channel(&mut pipeline, Some(2)).await.unwrap();
        assert_eq!(channel, Channel::C);
        assert!(start.elapsed() >= DEFAULT_TEST_DWELL);

        let writes = dac.writes();
        assert_eq!(writes[0], (Channel::C, DAC_VALUE_MAX));
        assert_eq!(
            &writes[1..],
            &[(Channel::A, 2559), (Channel::B, 2048), (Channel::C, 1536)]
        );

        // Only the requested channel ever reaches full scale
        for (ch, value) in writes {
            if value == DAC_VALUE_MAX {
                assert_eq!(ch, Channel::C);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_clamps_index() {
        let (mut pipeline, dac) = pipeline_with_sample();
        let control = ControlSurface::default();

        let channel = control.test_channel(&mut pipeline, Some(9)).await.unwrap();
        assert_eq!(channel, Channel::D);
        assert_eq!(dac.writes()[0], (Channel::D, DAC_VALUE_MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_channel_returns_to_zero() {
        let (mut pipeline, dac) = pipeline_with_sample();
        let control = ControlSurface::default();

        control.test_channel(&mut pipeline, Some(3)).await.unwrap();
        assert_eq!(dac.last(Channel::D), Some(DAC_VALUE_MIN));
        assert_eq!(dac.last(Channel::A), Some(2559));
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_uses_custom_dwell() {
        let (mut pipeline, _dac) = pipeline_with_sample();
        let control = ControlSurface::new(Duration::from_millis(50));

        let start = Instant::now();
        control.test_channel(&mut pipeline, Some(0)).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < DEFAULT_TEST_DWELL);
    }
}
