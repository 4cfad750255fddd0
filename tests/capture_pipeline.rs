mod common;

use std::fs;
use std::sync::atomic::AtomicBool;

use chrono::Duration;
use image::RgbImage;

use attention_monitor::attention::{AttentionClassifier, LinearAttentionModel, FEATURE_COUNT};
use attention_monitor::classify::{ClassifierError, EmotionClassifier};
use attention_monitor::feature_log::FeatureLog;
use attention_monitor::replay::ReplayTrace;
use attention_monitor::session::{run_capture, CaptureSession, WindowEmitter};
use attention_monitor::signals::HeadPoseLabel;
use attention_monitor::thresholds::ThresholdConfig;

use common::fixtures::{frame_ms, session_start, trace_line, write_trace, FaceBuilder, HEIGHT, WIDTH};

struct Neutral;

impl EmotionClassifier for Neutral {
    fn classify(&mut self, _face: &RgbImage) -> Result<String, ClassifierError> {
        Ok("neutral".to_string())
    }
}

fn closed_eyes(index: u64) -> bool {
    (200..205).contains(&index)
}

fn absent(index: u64) -> bool {
    (100..115).contains(&index)
}

#[test]
fn ten_second_window_counts_one_blink() {
    let t0 = session_start();
    let mut session = CaptureSession::new(ThresholdConfig::default(), t0);
    let image = RgbImage::new(WIDTH, HEIGHT);
    let open = FaceBuilder::default().ear(0.3).build();
    let closed = FaceBuilder::default().ear(0.1).build();

    let mut emitted = Vec::new();
    for i in 1..=300_u64 {
        let now = t0 + Duration::milliseconds(frame_ms(i) as i64);
        let face = if absent(i) {
            None
        } else if closed_eyes(i) {
            Some(&closed)
        } else {
            Some(&open)
        };
        if let Some(window) = session.process_frame(now, &image, face) {
            emitted.push((i, window));
        }
    }

    assert_eq!(emitted.len(), 1);
    let (closing_frame, window) = &emitted[0];
    assert_eq!(*closing_frame, 300);

    let f = &window.features;
    assert_eq!(f.total_frames, 300);
    assert_eq!(f.face_present_frames, 285);
    assert_eq!(f.blink_count, 1);
    assert_eq!(f.blink_rate, 0.1);
    assert_eq!(f.yawn_count, 0);
    assert_eq!(f.gaze_ratio, 0.95);
    assert_eq!(f.head_movement_count, 0);
    assert_eq!(f.final_head_pose, HeadPoseLabel::Frontal);
    assert_eq!(f.timestamp, (t0 + Duration::seconds(10)).timestamp());
    assert!(window.passed_quality_gate());

    // EMA survives the window boundary, counters do not
    assert!(session.smoother().ear().is_some());
    assert_eq!(session.window().total_frames(), 0);
    assert_eq!(session.window().window_start(), t0 + Duration::seconds(10));
}

#[test]
fn replayed_session_writes_rows_and_images() {
    let dir = tempfile::tempdir().expect("tempdir");
    let open = FaceBuilder::default().build();
    let yawning = FaceBuilder::default().mar(0.9).build();

    let lines: Vec<String> = (0..=600_u64)
        .map(|i| {
            let face = match i {
                // second window: mostly absent
                320..=600 if i % 3 != 0 => None,
                50..=60 => Some(&yawning),
                _ => Some(&open),
            };
            trace_line(frame_ms(i), face)
        })
        .collect();
    let trace_path = write_trace(dir.path(), &lines);

    let output = dir.path().join("output");
    let log = FeatureLog::open(&output).expect("feature log");
    let mut emotion = Neutral;
    let mut weights = vec![0.0; FEATURE_COUNT];
    weights[2] = 1.0;
    let model = LinearAttentionModel {
        mean: vec![0.0; FEATURE_COUNT],
        scale: vec![1.0; FEATURE_COUNT],
        weights,
        bias: -0.5,
    };
    let mut emitter =
        WindowEmitter::new(&log, &mut emotion, Some(&model as &dyn AttentionClassifier));

    let trace = ReplayTrace::open(&trace_path).expect("trace");
    let t0 = session_start();
    let report = run_capture(
        &mut trace.frames(t0),
        &mut trace.landmarks(),
        &mut emitter,
        ThresholdConfig::default(),
        &AtomicBool::new(true),
    );

    assert_eq!(report.frames, 601);
    assert_eq!(report.windows_emitted, 2);
    assert_eq!(report.discarded_partial_frames, 0);

    let csv = fs::read_to_string(log.csv_path()).expect("csv");
    let rows: Vec<Vec<&str>> = csv.lines().skip(1).map(|l| l.split(',').collect()).collect();
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    let first_ts = (t0 + Duration::seconds(10)).timestamp();
    assert_eq!(first[0], first_ts.to_string());
    assert!(first[1].ends_with(&format!("{first_ts}.jpg")));
    assert_eq!(first[2], "neutral");
    assert_eq!(first[4], "0.1");
    assert_eq!(first[5], "1.0");
    assert_eq!(first[6], "frontal");
    assert!(log.image_dir().join(format!("{first_ts}.jpg")).exists());

    let second = &rows[1];
    assert_eq!(second[1], "");
    assert_eq!(second[2], "detection_issues");
}
