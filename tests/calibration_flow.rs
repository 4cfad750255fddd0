mod common;

use std::sync::atomic::AtomicBool;

use chrono::Duration;

use attention_monitor::calibration::CalibrationReport;
use attention_monitor::replay::ReplayTrace;
use attention_monitor::session::run_calibration;
use attention_monitor::thresholds::ThresholdConfig;

use common::fixtures::{frame_ms, session_start, trace_line, write_trace, FaceBuilder};

fn calibrate(lines: &[String], seconds: i64) -> CalibrationReport {
    let dir = tempfile::tempdir().expect("tempdir");
    let trace = ReplayTrace::open(&write_trace(dir.path(), lines)).expect("trace");
    run_calibration(
        &mut trace.frames(session_start()),
        &mut trace.landmarks(),
        Duration::seconds(seconds),
        &AtomicBool::new(true),
    )
}

#[test]
fn thresholds_follow_medians_and_floors() {
    // alternating EAR 0.28 / 0.32 so the even-length median is 0.30
    let lines: Vec<String> = (0..90_u64)
        .map(|i| {
            let ear = if i % 2 == 0 { 0.28 } else { 0.32 };
            let face = FaceBuilder::default().ear(ear).mar(0.4).gaze(0.2).build();
            trace_line(frame_ms(i), Some(&face))
        })
        .collect();

    let report = calibrate(&lines, 30);

    assert_eq!(report.frames, 90);
    assert_eq!(report.face_frames, 90);
    assert_eq!(report.ear.samples, 90);
    let t = &report.thresholds;
    assert!((t.ear_blink_thresh - 0.21).abs() < 1e-9, "{}", t.ear_blink_thresh);
    assert!((t.mar_yawn_thresh - 0.6).abs() < 1e-9, "{}", t.mar_yawn_thresh);
    assert!((t.gaze_threshold - 0.24).abs() < 1e-6, "{}", t.gaze_threshold);
}

#[test]
fn narrow_eyes_hit_the_floor() {
    let face = FaceBuilder::default().ear(0.1).mar(0.1).build();
    let lines: Vec<String> = (0..10_u64).map(|i| trace_line(frame_ms(i), Some(&face))).collect();

    let t = calibrate(&lines, 30).thresholds;
    assert_eq!(t.ear_blink_thresh, 0.12);
    assert_eq!(t.mar_yawn_thresh, 0.45);
    assert_eq!(t.gaze_threshold, 0.15);
}

#[test]
fn faceless_session_falls_back_to_defaults() {
    let lines: Vec<String> = (0..30_u64).map(|i| trace_line(frame_ms(i), None)).collect();
    let report = calibrate(&lines, 30);
    assert_eq!(report.face_frames, 0);
    assert_eq!(report.ear.median, None);
    let t = &report.thresholds;
    assert!((t.ear_blink_thresh - 0.161).abs() < 1e-9);
    assert!((t.mar_yawn_thresh - 0.9).abs() < 1e-9);
    assert!((t.gaze_threshold - 0.42).abs() < 1e-9);
    assert_eq!(t.window_sec, ThresholdConfig::default().window_sec);
}

#[test]
fn only_frames_inside_duration_are_observed() {
    let face = FaceBuilder::default().build();
    let lines: Vec<String> = (0..300_u64).map(|i| trace_line(frame_ms(i), Some(&face))).collect();

    // 2 s at 30 fps: frames 0..=59 (t < 2000 ms)
    let report = calibrate(&lines, 2);
    assert_eq!(report.frames, 60);
}

#[test]
fn calibrated_file_reloads_for_capture() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    let face = FaceBuilder::default().ear(0.3).build();
    let lines: Vec<String> = (0..20_u64).map(|i| trace_line(frame_ms(i), Some(&face))).collect();

    let report = calibrate(&lines, 30);
    report.thresholds.save(&path).expect("save");

    let loaded = ThresholdConfig::load(&path).expect("load");
    assert_eq!(loaded, report.thresholds);
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert!(raw.get("min_frames_required").is_some());
}

#[test]
fn recalibration_resets_non_threshold_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    ThresholdConfig {
        window_sec: 15.0,
        ear_ema_alpha: 0.8,
        min_frames_required: 50,
        ..ThresholdConfig::default()
    }
    .save(&path)
    .expect("seed");

    let face = FaceBuilder::default().build();
    let lines: Vec<String> = (0..20_u64).map(|i| trace_line(frame_ms(i), Some(&face))).collect();
    calibrate(&lines, 30).thresholds.save(&path).expect("save");

    let loaded = ThresholdConfig::load(&path).expect("load");
    let defaults = ThresholdConfig::default();
    assert_eq!(loaded.window_sec, defaults.window_sec);
    assert_eq!(loaded.ear_ema_alpha, defaults.ear_ema_alpha);
    assert_eq!(loaded.min_frames_required, defaults.min_frames_required);
}
