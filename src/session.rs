//! Capture and calibration loops.
//!
//! Both loops are synchronous: one frame is read, detected and fully
//! processed before the next is requested. The shared `keep_running` flag is
//! checked once per frame; clearing it ends the loop after the current frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use image::RgbImage;
use serde::Serialize;

use crate::attention::{classify_row, AttentionClassifier};
use crate::calibration::{CalibrationReport, Calibrator};
use crate::classify::{tag_emotion, EmotionClassifier};
use crate::constants::{FACE_CROP_MARGIN_PX, FRAME_RETRY_DELAY_MS};
use crate::feature_log::{FeatureLog, FeatureRow};
use crate::signals::geometry::{face_bounds, MetricSample};
use crate::signals::{LandmarkFrame, SmoothedSignal};
use crate::source::{Frame, FrameSource, LandmarkDetector};
use crate::thresholds::ThresholdConfig;
use crate::window::{ClosedWindow, WindowAccumulator};

/// Per-run state of a capture: thresholds, EMA state and the open window.
#[derive(Debug)]
pub struct CaptureSession {
    thresholds: ThresholdConfig,
    smoother: SmoothedSignal,
    window: WindowAccumulator,
}

impl CaptureSession {
    pub fn new(thresholds: ThresholdConfig, start: DateTime<Utc>) -> Self {
        let window = WindowAccumulator::new(&thresholds, start);
        Self {
            thresholds,
            smoother: SmoothedSignal::new(),
            window,
        }
    }

    /// Records one frame and closes the window when it is due. The frame
    /// that triggers the close belongs to the closing window.
    pub fn process_frame(
        &mut self,
        now: DateTime<Utc>,
        image: &RgbImage,
        landmarks: Option<&LandmarkFrame>,
    ) -> Option<ClosedWindow> {
        match landmarks {
            Some(frame) => {
                let sample = MetricSample::measure(frame);
                let smoothed = self.smoother.update(
                    sample.ear,
                    sample.mar,
                    self.thresholds.ear_ema_alpha,
                    self.thresholds.mar_ema_alpha,
                );
                let bounds = face_bounds(frame, FACE_CROP_MARGIN_PX);
                self.window.record_face(&sample, smoothed, bounds, image);
            }
            None => self.window.record_absent(),
        }

        if self.window.is_due(now) {
            Some(self.window.close(now))
        } else {
            None
        }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    pub fn smoother(&self) -> &SmoothedSignal {
        &self.smoother
    }

    pub fn window(&self) -> &WindowAccumulator {
        &self.window
    }
}

/// Turns closed windows into persisted feature rows.
pub struct WindowEmitter<'a> {
    log: &'a FeatureLog,
    emotion: &'a mut dyn EmotionClassifier,
    attention: Option<&'a dyn AttentionClassifier>,
}

impl<'a> WindowEmitter<'a> {
    pub fn new(
        log: &'a FeatureLog,
        emotion: &'a mut dyn EmotionClassifier,
        attention: Option<&'a dyn AttentionClassifier>,
    ) -> Self {
        Self {
            log,
            emotion,
            attention,
        }
    }

    /// Saves the representative crop, tags the emotion and appends the row.
    /// Write failures are logged; the row is returned either way.
    pub fn emit(&mut self, closed: &ClosedWindow) -> FeatureRow {
        let features = &closed.features;

        let face_image = match &closed.representative {
            Some(crop) => match self.log.save_face(features.timestamp, &crop.image) {
                Ok(path) => path.display().to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, timestamp = features.timestamp, "Failed to save face image");
                    String::new()
                }
            },
            None => {
                tracing::warn!(
                    total_frames = features.total_frames,
                    face_present_frames = features.face_present_frames,
                    "Window failed face-quality gate"
                );
                String::new()
            }
        };

        let emotion = tag_emotion(
            &mut *self.emotion,
            closed.representative.as_ref().map(|crop| &crop.image),
        );
        let row = FeatureRow::from_window(features, face_image, emotion);

        if let Err(e) = self.log.append(&row) {
            tracing::warn!(error = %e, timestamp = row.timestamp, "Failed to append feature row");
        }

        let attention = self
            .attention
            .map(|classifier| classify_row(classifier, &row).as_str())
            .unwrap_or("none");

        tracing::info!(
            timestamp = row.timestamp,
            blink_rate = row.blink_rate,
            yawn_rate = row.yawn_rate,
            gaze_ratio = row.gaze_ratio,
            head_pose = %row.head_pose,
            head_movement_rate = row.head_movement_rate,
            emotion = %row.emotion,
            attention,
            "Window closed"
        );
        row
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureReport {
    pub frames: u64,
    pub face_frames: u64,
    pub windows_emitted: u64,
    /// Frames of the unclosed window dropped at shutdown
    pub discarded_partial_frames: u32,
}

/// Reads frames until the source ends or `keep_running` is cleared.
pub fn run_capture<S, D>(
    source: &mut S,
    detector: &mut D,
    emitter: &mut WindowEmitter<'_>,
    thresholds: ThresholdConfig,
    keep_running: &AtomicBool,
) -> CaptureReport
where
    S: FrameSource + ?Sized,
    D: LandmarkDetector + ?Sized,
{
    let mut report = CaptureReport::default();
    let mut session: Option<CaptureSession> = None;

    tracing::info!(window_sec = thresholds.window_sec, "Capture started");

    while let Some(frame) = next_frame(source, keep_running) {
        report.frames += 1;
        let landmarks = detector.detect(&frame);
        if landmarks.is_some() {
            report.face_frames += 1;
        }

        let active = session
            .get_or_insert_with(|| CaptureSession::new(thresholds.clone(), frame.captured_at));
        if let Some(closed) =
            active.process_frame(frame.captured_at, &frame.image, landmarks.as_ref())
        {
            emitter.emit(&closed);
            report.windows_emitted += 1;
        }
    }

    report.discarded_partial_frames = session.map_or(0, |s| s.window().total_frames());
    tracing::info!(
        frames = report.frames,
        face_frames = report.face_frames,
        windows = report.windows_emitted,
        discarded = report.discarded_partial_frames,
        "Capture finished"
    );
    report
}

/// Observes frames for `duration`, measured from the first frame, and
/// derives new thresholds over the defaults.
pub fn run_calibration<S, D>(
    source: &mut S,
    detector: &mut D,
    duration: Duration,
    keep_running: &AtomicBool,
) -> CalibrationReport
where
    S: FrameSource + ?Sized,
    D: LandmarkDetector + ?Sized,
{
    let mut calibrator = Calibrator::new();
    let mut started_at: Option<DateTime<Utc>> = None;

    tracing::info!(
        duration_ms = duration.num_milliseconds(),
        "Calibration started"
    );

    while let Some(frame) = next_frame(source, keep_running) {
        let t0 = *started_at.get_or_insert(frame.captured_at);
        if frame.captured_at.signed_duration_since(t0) >= duration {
            break;
        }
        let landmarks = detector.detect(&frame);
        calibrator.observe(landmarks.as_ref());
    }

    let report = calibrator.finish();
    tracing::info!(
        frames = report.frames,
        face_frames = report.face_frames,
        ear_blink_thresh = report.thresholds.ear_blink_thresh,
        mar_yawn_thresh = report.thresholds.mar_yawn_thresh,
        gaze_threshold = report.thresholds.gaze_threshold,
        "Calibration finished"
    );
    report
}

/// Next frame, retrying transient failures. `None` on end of stream or stop.
fn next_frame<S: FrameSource + ?Sized>(source: &mut S, keep_running: &AtomicBool) -> Option<Frame> {
    loop {
        if !keep_running.load(Ordering::SeqCst) {
            tracing::info!("Stop requested");
            return None;
        }
        match source.next_frame() {
            Ok(frame) => return frame,
            Err(e) => {
                tracing::debug!(error = %e, "Frame read failed, retrying");
                thread::sleep(StdDuration::from_millis(FRAME_RETRY_DELAY_MS));
            }
        }
    }
}
