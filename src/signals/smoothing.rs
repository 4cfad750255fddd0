//! Exponential moving average over the EAR and MAR channels.

/// One EMA step. An unset `prev` seeds the filter with `value`.
pub fn ema(prev: Option<f64>, value: f64, alpha: f64) -> f64 {
    match prev {
        None => value,
        Some(prev) => alpha * value + (1.0 - alpha) * prev,
    }
}

/// Smoothed values carried across frames (and across windows).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedSignal {
    ear_ema: Option<f64>,
    mar_ema: Option<f64>,
}

/// Channels that received input this frame, after smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedUpdate {
    pub ear: Option<f64>,
    pub mar: Option<f64>,
}

impl SmoothedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one frame. A `None` input holds that channel's state and yields
    /// `None` for it in the returned update.
    pub fn update(
        &mut self,
        ear: Option<f64>,
        mar: Option<f64>,
        ear_alpha: f64,
        mar_alpha: f64,
    ) -> SmoothedUpdate {
        let ear = ear.map(|value| {
            let next = ema(self.ear_ema, value, ear_alpha);
            self.ear_ema = Some(next);
            next
        });
        let mar = mar.map(|value| {
            let next = ema(self.mar_ema, value, mar_alpha);
            self.mar_ema = Some(next);
            next
        });
        SmoothedUpdate { ear, mar }
    }

    pub fn ear(&self) -> Option<f64> {
        self.ear_ema
    }

    pub fn mar(&self) -> Option<f64> {
        self.mar_ema
    }
}
