//! # Channel Map Module
//!
//! Live assignment of orientation axes to physical DAC channels.
//!
//! ## Default Assignment
//!
//! | Axis | Channel |
//! |------|---------|
//! | Yaw | A |
//! | Pitch | B |
//! | Roll | C |
//!
//! Channel D is unassigned by default.
//!
//! ## Update Rules
//!
//! Updates take raw integer indices. Each index is clamped into `0..=3`
//! first and only then checked for duplicates, so `{5, -1, 2}` becomes
//! `{D, A, C}` and is accepted. An update either replaces all three
//! assignments or leaves the map untouched.
//!
//! ## Usage
//!
//! ```
//! use attitude_relay::channel_map::ChannelMap;
//! use attitude_relay::dac::Channel;
//! use attitude_relay::orientation::Axis;
//!
//! let mut map = ChannelMap::new();
//! map.set(3, 0, 1).unwrap();
//! assert_eq!(map.channel_for(Axis::Yaw), Channel::D);
//!
//! // Yaw and pitch would share channel A
//! assert!(map.set(0, 0, 2).is_err());
//! assert_eq!(map.channel_for(Axis::Yaw), Channel::D);
//! ```

use serde::{Deserialize, Serialize};

use crate::dac::Channel;
use crate::error::{RelayError, Result};
use crate::orientation::Axis;

/// Snapshot of the axis-to-channel assignment.
///
/// Serializes as `{"yaw":0,"pitch":1,"roll":2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAssignment {
    pub yaw: Channel,
    pub pitch: Channel,
    pub roll: Channel,
}

impl ChannelAssignment {
    /// Channel carrying `axis`.
    #[must_use]
    pub const fn channel_for(&self, axis: Axis) -> Channel {
        match axis {
            Axis::Yaw => self.yaw,
            Axis::Pitch => self.pitch,
            Axis::Roll => self.roll,
        }
    }

    /// True when no two axes share a channel.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.yaw != self.pitch && self.yaw != self.roll && self.pitch != self.roll
    }
}

impl Default for ChannelAssignment {
    fn default() -> Self {
        Self {
            yaw: Channel::A,
            pitch: Channel::B,
            roll: Channel::C,
        }
    }
}

/// Mutable axis-to-channel map with uniqueness enforced on write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    assignment: ChannelAssignment,
}

impl ChannelMap {
    /// Creates a map with the default Yaw→A, Pitch→B, Roll→C assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from an already distinct assignment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateChannelAssignment`] if two axes share a
    /// channel.
    pub fn with_assignment(assignment: ChannelAssignment) -> Result<Self> {
        if !assignment.is_distinct() {
            return Err(duplicate(assignment));
        }
        Ok(Self { assignment })
    }

    /// Current assignment.
    #[must_use]
    pub fn get(&self) -> ChannelAssignment {
        self.assignment
    }

    /// Channel currently carrying `axis`.
    #[must_use]
    pub fn channel_for(&self, axis: Axis) -> Channel {
        self.assignment.channel_for(axis)
    }

    /// Axis currently mapped to `channel`, if any.
    #[must_use]
    pub fn axis_on(&self, channel: Channel) -> Option<Axis> {
        Axis::ALL
            .into_iter()
            .find(|&axis| self.channel_for(axis) == channel)
    }

    /// Replace all three assignments from raw channel indices.
    ///
    /// Indices are clamped into `0..=3` before the duplicate check.
    ///
    /// # Returns
    ///
    /// The assignment now in effect.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateChannelAssignment`] if the clamped
    /// channels are not pairwise distinct. The map is left unchanged.
    pub fn set(&mut self, yaw: i64, pitch: i64, roll: i64) -> Result<ChannelAssignment> {
        let candidate = ChannelAssignment {
            yaw: Channel::from_index_clamped(yaw),
            pitch: Channel::from_index_clamped(pitch),
            roll: Channel::from_index_clamped(roll),
        };

        if !candidate.is_distinct() {
            return Err(duplicate(candidate));
        }

        self.assignment = candidate;
        Ok(candidate)
    }
}

fn duplicate(assignment: ChannelAssignment) -> RelayError {
    RelayError::DuplicateChannelAssignment {
        yaw: assignment.yaw,
        pitch: assignment.pitch,
        roll: assignment.roll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assignment() {
        let map = ChannelMap::new();
        assert_eq!(map.channel_for(Axis::Yaw), Channel::A);
        assert_eq!(map.channel_for(Axis::Pitch), Channel::B);
        assert_eq!(map.channel_for(Axis::Roll), Channel::C);
        assert_eq!(map.axis_on(Channel::D), None);
    }

    #[test]
    fn test_set_then_get_returns_input() {
        let mut map = ChannelMap::new();
        for (yaw, pitch, roll) in [(3, 2, 1), (0, 3, 1), (1, 0, 2), (2, 1, 3)] {
            map.set(yaw, pitch, roll).unwrap();
            let got = map.get();
            assert_eq!(
                (got.yaw.index(), got.pitch.index(), got.roll.index()),
                (yaw as u8, pitch as u8, roll as u8)
            );
        }
    }

    #[test]
    fn test_set_clamps_before_validating() {
        let mut map = ChannelMap::new();
        let applied = map.set(5, -1, 2).unwrap();
        assert_eq!(
            applied,
            ChannelAssignment {
                yaw: Channel::D,
                pitch: Channel::A,
                roll: Channel::C,
            }
        );
        assert_eq!(map.get(), applied);
    }

    #[test]
    fn test_duplicate_rejected_and_map_unchanged() {
        let mut map = ChannelMap::new();
        let before = map.get();

        let err = map.set(1, 1, 2).unwrap_err();
        assert!(matches!(
            err,
            RelayError::DuplicateChannelAssignment {
                yaw: Channel::B,
                pitch: Channel::B,
                roll: Channel::C,
            }
        ));
        assert_eq!(map.get(), before);
    }

    #[test]
    fn test_duplicate_after_clamping_rejected() {
        let mut map = ChannelMap::new();
        let before = map.get();

        // 7 and 3 both clamp to D
        assert!(map.set(7, 3, 0).is_err());
        // -4 and 0 both clamp to A
        assert!(map.set(-4, 0, 1).is_err());
        assert_eq!(map.get(), before);
    }

    #[test]
    fn test_all_same_rejected() {
        let mut map = ChannelMap::new();
        assert!(map.set(2, 2, 2).is_err());
    }

    #[test]
    fn test_axis_on() {
        let mut map = ChannelMap::new();
        map.set(3, 0, 1).unwrap();
        assert_eq!(map.axis_on(Channel::D), Some(Axis::Yaw));
        assert_eq!(map.axis_on(Channel::A), Some(Axis::Pitch));
        assert_eq!(map.axis_on(Channel::B), Some(Axis::Roll));
        assert_eq!(map.axis_on(Channel::C), None);
    }

    #[test]
    fn test_with_assignment_rejects_duplicates() {
        let assignment = ChannelAssignment {
            yaw: Channel::A,
            pitch: Channel::A,
            roll: Channel::B,
        };
        assert!(ChannelMap::with_assignment(assignment).is_err());
    }

    #[test]
    fn test_assignment_serializes_as_indices() {
        let json = serde_json::to_value(ChannelAssignment::default()).unwrap();
        assert_eq!(json, serde_json::json!({"yaw": 0, "pitch": 1, "roll": 2}));
    }
}
