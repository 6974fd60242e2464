//! # Smoothing Module
//!
//! Fixed-window moving average over the most recent samples of each axis.
//!
//! All three axis buffers share one write cursor. The cursor advances once per
//! accepted message, so slot `i` of every buffer always holds samples from
//! the same message.
//!
//! ## Usage
//!
//! ```
//! use attitude_relay::orientation::Orientation;
//! use attitude_relay::smoothing::SmoothingState;
//!
//! let mut smoothing = SmoothingState::new();
//! let smoothed = smoothing.push(Orientation::new(90.0, 0.0, -90.0));
//!
//! // Averaged with the zeroed slot
//! assert_eq!(smoothed, Orientation::new(45.0, 0.0, -45.0));
//! ```

use crate::orientation::{Axis, Orientation, AXIS_COUNT};

/// Number of samples averaged per axis.
pub const SMOOTHING_WINDOW: usize = 2;

/// Circular sample buffer for one axis.
///
/// The buffer does not own a cursor; the caller supplies the slot to write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBuffer {
    samples: [f32; SMOOTHING_WINDOW],
}

impl Default for AxisBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisBuffer {
    /// Creates a zero-filled buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: [0.0; SMOOTHING_WINDOW],
        }
    }

    /// Overwrites slot `cursor` with `sample` and returns the new mean.
    ///
    /// `cursor` must be below [`SMOOTHING_WINDOW`].
    pub fn push(&mut self, cursor: usize, sample: f32) -> f32 {
        self.samples[cursor] = sample;
        self.mean()
    }

    /// Arithmetic mean of all slots.
    #[must_use]
    pub fn mean(&self) -> f32 {
        let sum: f32 = self.samples.iter().sum();
        sum / SMOOTHING_WINDOW as f32
    }

    /// Zeroes every slot.
    pub fn reset(&mut self) {
        self.samples = [0.0; SMOOTHING_WINDOW];
    }
}

/// Smoothing buffers for yaw, pitch and roll plus their shared cursor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SmoothingState {
    buffers: [AxisBuffer; AXIS_COUNT],
    cursor: usize,
}

impl SmoothingState {
    /// Creates zeroed smoothing state with the cursor at slot 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes one raw sample for every axis and returns the smoothed values.
    ///
    /// The shared cursor advances exactly once per call, wrapping modulo
    /// [`SMOOTHING_WINDOW`].
    pub fn push(&mut self, sample: Orientation) -> Orientation {
        let raw = sample.to_array();
        let mut smoothed = [0.0; AXIS_COUNT];

        for axis in Axis::ALL {
            let i = axis.index();
            smoothed[i] = self.buffers[i].push(self.cursor, raw[i]);
        }

        self.cursor = (self.cursor + 1) % SMOOTHING_WINDOW;
        Orientation::from_array(smoothed)
    }

    /// Current smoothed value of every axis.
    #[must_use]
    pub fn current(&self) -> Orientation {
        Orientation::from_array([
            self.buffers[Axis::Yaw.index()].mean(),
            self.buffers[Axis::Pitch.index()].mean(),
            self.buffers[Axis::Roll.index()].mean(),
        ])
    }

    /// Slot the next sample will be written to.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Zeroes all buffers and rewinds the cursor.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.reset();
        }
        self.cursor = 0;
    }
}
