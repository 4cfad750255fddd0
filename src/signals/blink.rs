//! Blink detection.
//!
//! A blink is the stretch of frames where the smoothed EAR stays below the
//! threshold. It is counted once, on the frame where the eye reopens, so a
//! long closure is still a single blink.

use super::hysteresis::{Crossing, HysteresisDetector};

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    inner: HysteresisDetector,
}

impl BlinkDetector {
    pub fn new(ear_threshold: f64) -> Self {
        Self {
            inner: HysteresisDetector::new(ear_threshold, Crossing::Below),
        }
    }

    /// Feeds the smoothed EAR of one frame; `true` when a blink just ended.
    pub fn update(&mut self, ear_ema: Option<f64>) -> bool {
        self.inner.update(ear_ema)
    }

    pub fn blink_count(&self) -> u32 {
        self.inner.count()
    }

    pub fn is_eye_closed(&self) -> bool {
        self.inner.is_armed()
    }

    pub fn threshold(&self) -> f64 {
        self.inner.threshold()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
