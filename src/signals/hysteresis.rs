//! Two-state threshold detector shared by the blink and yawn detectors.
//!
//! Idle → Armed when the signal crosses the threshold in the watched
//! direction, Armed → Idle (one event counted) when it comes back. Holding
//! past the threshold never counts twice, and an event is only counted on
//! recovery.

/// Side of the threshold that arms the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Arms on `value < threshold`, releases on `value >= threshold`
    Below,
    /// Arms on `value > threshold`, releases on `value <= threshold`
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Armed,
}

#[derive(Debug, Clone)]
pub struct HysteresisDetector {
    threshold: f64,
    crossing: Crossing,
    phase: Phase,
    count: u32,
}

impl HysteresisDetector {
    pub fn new(threshold: f64, crossing: Crossing) -> Self {
        Self {
            threshold,
            crossing,
            phase: Phase::Idle,
            count: 0,
        }
    }

    /// Feeds one smoothed value; returns `true` when an event completes.
    ///
    /// `None` (and non-finite values) leave the detector untouched.
    pub fn update(&mut self, value: Option<f64>) -> bool {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return false;
        };

        let beyond = match self.crossing {
            Crossing::Below => value < self.threshold,
            Crossing::Above => value > self.threshold,
        };

        match (self.phase, beyond) {
            (Phase::Idle, true) => {
                self.phase = Phase::Armed;
                false
            }
            (Phase::Armed, false) => {
                self.phase = Phase::Idle;
                self.count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.phase == Phase::Armed
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clears the count and the armed flag; the threshold is kept.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_counts_on_recovery() {
        let mut d = HysteresisDetector::new(0.2, Crossing::Below);
        assert!(!d.update(Some(0.15)));
        assert!(d.is_armed());
        assert!(!d.update(Some(0.1)));
        assert_eq!(d.count(), 0);
        assert!(d.update(Some(0.2)));
        assert_eq!(d.count(), 1);
        assert_eq!(d.phase(), Phase::Idle);
    }

    #[test]
    fn above_counts_on_recovery() {
        let mut d = HysteresisDetector::new(0.6, Crossing::Above);
        assert!(!d.update(Some(0.6)));
        assert!(!d.is_armed());
        assert!(!d.update(Some(0.61)));
        assert!(d.update(Some(0.6)));
        assert_eq!(d.count(), 1);
    }

    #[test]
    fn missing_values_hold_state() {
        let mut d = HysteresisDetector::new(0.2, Crossing::Below);
        d.update(Some(0.1));
        assert!(!d.update(None));
        assert!(!d.update(Some(f64::NAN)));
        assert!(d.is_armed());
        assert_eq!(d.count(), 0);
    }

    #[test]
    fn reset_keeps_threshold() {
        let mut d = HysteresisDetector::new(0.2, Crossing::Below);
        d.update(Some(0.1));
        d.update(Some(0.3));
        d.update(Some(0.1));
        d.reset();
        assert_eq!(d.count(), 0);
        assert!(!d.is_armed());
        assert_eq!(d.threshold(), 0.2);
    }
}
