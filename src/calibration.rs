//! Person-specific thresholds from an observation session.
//!
//! The calibrator samples raw geometry (no smoothing, no event detection) on
//! every frame with a face and derives each threshold from the median of its
//! metric with a fixed factor and a safety floor. A metric that was never
//! observed falls back to its built-in default before the rule is applied.

use serde::Serialize;

use crate::constants::{
    DEFAULT_EAR_BLINK_THRESH, DEFAULT_GAZE_THRESHOLD, DEFAULT_MAR_YAWN_THRESH,
    EAR_CALIBRATION_FACTOR, EAR_THRESHOLD_FLOOR, GAZE_CALIBRATION_FACTOR, GAZE_THRESHOLD_FLOOR,
    MAR_CALIBRATION_FACTOR, MAR_THRESHOLD_FLOOR,
};
use crate::signals::geometry::{self, LandmarkFrame};
use crate::thresholds::ThresholdConfig;

/// How one metric fed into its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub samples: usize,
    /// `None` when no sample was collected
    pub median: Option<f64>,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub frames: u32,
    pub face_frames: u32,
    pub ear: MetricSummary,
    pub mar: MetricSummary,
    pub gaze: MetricSummary,
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Default)]
pub struct Calibrator {
    frames: u32,
    face_frames: u32,
    ears: Vec<f64>,
    mars: Vec<f64>,
    gaze_offsets: Vec<f64>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples one frame; `None` means no face was detected.
    pub fn observe(&mut self, landmarks: Option<&LandmarkFrame>) {
        self.frames += 1;
        let Some(frame) = landmarks else {
            return;
        };
        self.face_frames += 1;

        if let Some(ear) = geometry::average_eye_aspect_ratio(frame) {
            self.ears.push(ear);
        }
        if let Some(mar) = geometry::mouth_aspect_ratio(frame) {
            self.mars.push(mar);
        }
        if let Some(gaze) = geometry::gaze_offset(frame) {
            self.gaze_offsets.push(gaze.abs());
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn face_frames(&self) -> u32 {
        self.face_frames
    }

    /// Derives the three thresholds and merges them over the defaults.
    pub fn finish(&self) -> CalibrationReport {
        let base = ThresholdConfig::default();
        let ear = summarize(
            "ear",
            &self.ears,
            DEFAULT_EAR_BLINK_THRESH,
            EAR_CALIBRATION_FACTOR,
            EAR_THRESHOLD_FLOOR,
            base.min_frames_required,
        );
        let mar = summarize(
            "mar",
            &self.mars,
            DEFAULT_MAR_YAWN_THRESH,
            MAR_CALIBRATION_FACTOR,
            MAR_THRESHOLD_FLOOR,
            base.min_frames_required,
        );
        let gaze = summarize(
            "gaze",
            &self.gaze_offsets,
            DEFAULT_GAZE_THRESHOLD,
            GAZE_CALIBRATION_FACTOR,
            GAZE_THRESHOLD_FLOOR,
            base.min_frames_required,
        );

        let thresholds = ThresholdConfig {
            ear_blink_thresh: ear.threshold,
            mar_yawn_thresh: mar.threshold,
            gaze_threshold: gaze.threshold,
            ..base
        };

        CalibrationReport {
            frames: self.frames,
            face_frames: self.face_frames,
            ear,
            mar,
            gaze,
            thresholds,
        }
    }
}

fn summarize(
    metric: &'static str,
    samples: &[f64],
    fallback: f64,
    factor: f64,
    floor: f64,
    min_samples: u32,
) -> MetricSummary {
    if samples.len() < min_samples as usize {
        tracing::warn!(
            metric,
            samples = samples.len(),
            min_samples,
            "Few calibration samples for metric"
        );
    }
    let median = median(samples);
    MetricSummary {
        samples: samples.len(),
        median,
        threshold: derive_threshold(median.unwrap_or(fallback), factor, floor),
    }
}

/// `max(floor, center * factor)`
pub fn derive_threshold(center: f64, factor: f64, floor: f64) -> f64 {
    (center * factor).max(floor)
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
