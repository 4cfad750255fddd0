//! Yawn detection from the smoothed MAR.
//!
//! Mirror image of blink detection: the mouth opening above the threshold
//! arms the detector, closing back to or below it counts one yawn.

use super::hysteresis::{Crossing, HysteresisDetector};

#[derive(Debug, Clone)]
pub struct YawnDetector {
    inner: HysteresisDetector,
}

impl YawnDetector {
    pub fn new(mar_threshold: f64) -> Self {
        Self {
            inner: HysteresisDetector::new(mar_threshold, Crossing::Above),
        }
    }

    pub fn update(&mut self, mar_ema: Option<f64>) -> bool {
        self.inner.update(mar_ema)
    }

    pub fn yawn_count(&self) -> u32 {
        self.inner.count()
    }

    pub fn is_yawning(&self) -> bool {
        self.inner.is_armed()
    }

    pub fn threshold(&self) -> f64 {
        self.inner.threshold()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
