//! Fixed-duration aggregation of per-frame signals into one feature row.
//!
//! The accumulator owns the three event detectors for the current window.
//! Closing a window computes the rates, applies the face-quality gate to pick
//! a representative crop and resets every per-window counter in the same
//! call, so a frame always lands in exactly one window.

use chrono::{DateTime, Duration, Utc};
use image::{imageops, RgbImage};

use crate::constants::FACE_PRESENCE_MIN_RATIO;
use crate::signals::geometry::{MetricSample, PixelRect};
use crate::signals::smoothing::SmoothedUpdate;
use crate::signals::{BlinkDetector, HeadMotionCounter, HeadPoseLabel, YawnDetector};
use crate::thresholds::ThresholdConfig;

/// A face crop taken from one frame of the window.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    pub area: u64,
    pub image: RgbImage,
}

/// Aggregates of one closed window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFeatures {
    /// Unix seconds at close
    pub timestamp: i64,
    pub total_frames: u32,
    pub face_present_frames: u32,
    pub gaze_on_frames: u32,
    pub blink_count: u32,
    pub yawn_count: u32,
    pub head_movement_count: u32,
    /// Events per second, rounded to 3 decimals
    pub blink_rate: f64,
    pub yawn_rate: f64,
    pub head_movement_rate: f64,
    /// Share of all frames with on-screen gaze, rounded to 3 decimals
    pub gaze_ratio: f64,
    pub final_head_pose: HeadPoseLabel,
}

#[derive(Debug, Clone)]
pub struct ClosedWindow {
    pub features: WindowFeatures,
    /// Largest crop of the window, only when the face-quality gate passed
    pub representative: Option<FaceCrop>,
}

impl ClosedWindow {
    pub fn passed_quality_gate(&self) -> bool {
        self.representative.is_some()
    }
}

#[derive(Debug)]
pub struct WindowAccumulator {
    window_start: DateTime<Utc>,
    window_length: Duration,
    window_sec: f64,
    gaze_threshold: f64,
    total_frames: u32,
    face_present_frames: u32,
    gaze_on_frames: u32,
    blink: BlinkDetector,
    yawn: YawnDetector,
    head_motion: HeadMotionCounter,
    candidate_count: u32,
    best_crop: Option<FaceCrop>,
}

impl WindowAccumulator {
    pub fn new(thresholds: &ThresholdConfig, window_start: DateTime<Utc>) -> Self {
        Self {
            window_start,
            window_length: thresholds.window_duration(),
            window_sec: thresholds.window_sec,
            gaze_threshold: thresholds.gaze_threshold,
            total_frames: 0,
            face_present_frames: 0,
            gaze_on_frames: 0,
            blink: BlinkDetector::new(thresholds.ear_blink_thresh),
            yawn: YawnDetector::new(thresholds.mar_yawn_thresh),
            head_motion: HeadMotionCounter::new(),
            candidate_count: 0,
            best_crop: None,
        }
    }

    /// Records a frame in which a face was detected.
    ///
    /// `smoothed` carries the EMA values for the channels measured this
    /// frame; `bounds` is the face box used for the crop candidate.
    pub fn record_face(
        &mut self,
        sample: &MetricSample,
        smoothed: SmoothedUpdate,
        bounds: Option<PixelRect>,
        image: &RgbImage,
    ) {
        self.total_frames += 1;
        self.face_present_frames += 1;

        self.blink.update(smoothed.ear);
        self.yawn.update(smoothed.mar);

        if let Some(gaze) = sample.gaze_offset {
            if gaze.abs() < self.gaze_threshold {
                self.gaze_on_frames += 1;
            }
        }

        self.head_motion.update(sample.head_pose.map(|pose| pose.label));

        if let Some(rect) = bounds.filter(|r| r.area() > 0) {
            self.offer_crop(rect, image);
        }
    }

    /// Records a frame without a detected face.
    pub fn record_absent(&mut self) {
        self.total_frames += 1;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.window_start) >= self.window_length
    }

    /// Emits the window's aggregates and starts a new window at `now`.
    pub fn close(&mut self, now: DateTime<Utc>) -> ClosedWindow {
        let blink_count = self.blink.blink_count();
        let yawn_count = self.yawn.yawn_count();
        let head_movement_count = self.head_motion.movement_count();

        let gate = f64::from(self.face_present_frames)
            >= FACE_PRESENCE_MIN_RATIO * f64::from(self.total_frames)
            && self.candidate_count > 0;
        let representative = if gate { self.best_crop.take() } else { None };

        let features = WindowFeatures {
            timestamp: now.timestamp(),
            total_frames: self.total_frames,
            face_present_frames: self.face_present_frames,
            gaze_on_frames: self.gaze_on_frames,
            blink_count,
            yawn_count,
            head_movement_count,
            blink_rate: self.rate(blink_count),
            yawn_rate: self.rate(yawn_count),
            head_movement_rate: self.rate(head_movement_count),
            gaze_ratio: round3(
                f64::from(self.gaze_on_frames) / f64::from(self.total_frames.max(1)),
            ),
            final_head_pose: self
                .head_motion
                .last_label()
                .unwrap_or(HeadPoseLabel::Unknown),
        };

        self.reset(now);

        ClosedWindow {
            features,
            representative,
        }
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn face_present_frames(&self) -> u32 {
        self.face_present_frames
    }

    pub fn gaze_on_frames(&self) -> u32 {
        self.gaze_on_frames
    }

    pub fn candidate_count(&self) -> u32 {
        self.candidate_count
    }

    pub fn blink(&self) -> &BlinkDetector {
        &self.blink
    }

    pub fn yawn(&self) -> &YawnDetector {
        &self.yawn
    }

    pub fn head_motion(&self) -> &HeadMotionCounter {
        &self.head_motion
    }

    /// Keeps only the largest candidate; on equal area the earlier one stays.
    fn offer_crop(&mut self, rect: PixelRect, image: &RgbImage) {
        self.candidate_count += 1;
        let area = rect.area();
        if self.best_crop.as_ref().is_some_and(|best| best.area >= area) {
            return;
        }
        let crop = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
        self.best_crop = Some(FaceCrop { area, image: crop });
    }

    fn rate(&self, count: u32) -> f64 {
        round3(f64::from(count) / self.window_sec)
    }

    fn reset(&mut self, now: DateTime<Utc>) {
        self.window_start = now;
        self.total_frames = 0;
        self.face_present_frames = 0;
        self.gaze_on_frames = 0;
        self.blink.reset();
        self.yawn.reset();
        self.head_motion.reset();
        self.candidate_count = 0;
        self.best_crop = None;
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
