use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use attention_monitor::signals::geometry::{
    LEFT_EYE, LEFT_IRIS, MOUTH_BOTTOM, MOUTH_LEFT, MOUTH_RIGHT, MOUTH_TOP, RIGHT_EYE, RIGHT_IRIS,
};
use attention_monitor::signals::pose::POSE_POINTS;
use attention_monitor::signals::{Landmark, LandmarkFrame};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

const EYE_HALF_WIDTH: f64 = 20.0;
const EYE_Y: f64 = 202.0;
const LEFT_EYE_X: f64 = 283.0;
const RIGHT_EYE_X: f64 = 357.0;
const MOUTH_WIDTH: f64 = 60.0;

pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// A roughly frontal synthetic face at 640x480.
///
/// EAR is `eye_gap / 40`, MAR is `mouth_gap / 60` and the gaze offset is
/// `iris_shift / 40`.
#[derive(Debug, Clone, Copy)]
pub struct FaceBuilder {
    pub eye_gap: f64,
    pub mouth_gap: f64,
    pub iris_shift: f64,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            eye_gap: 12.0,
            mouth_gap: 12.0,
            iris_shift: 0.0,
        }
    }
}

impl FaceBuilder {
    pub fn ear(mut self, ear: f64) -> Self {
        self.eye_gap = ear * 2.0 * EYE_HALF_WIDTH;
        self
    }

    pub fn mar(mut self, mar: f64) -> Self {
        self.mouth_gap = mar * MOUTH_WIDTH;
        self
    }

    pub fn gaze(mut self, offset: f64) -> Self {
        self.iris_shift = offset * 2.0 * EYE_HALF_WIDTH;
        self
    }

    pub fn build(&self) -> LandmarkFrame {
        let mut points = vec![Landmark::new(0.5, 0.5); 478];
        let mut set = |index: usize, x: f64, y: f64| {
            points[index] = Landmark::new(x / f64::from(WIDTH), y / f64::from(HEIGHT));
        };

        for (eye, iris, cx) in [
            (&LEFT_EYE, &LEFT_IRIS, LEFT_EYE_X),
            (&RIGHT_EYE, &RIGHT_IRIS, RIGHT_EYE_X),
        ] {
            let half = self.eye_gap / 2.0;
            set(eye[0], cx - EYE_HALF_WIDTH, EYE_Y);
            set(eye[1], cx - 7.0, EYE_Y - half);
            set(eye[2], cx + 7.0, EYE_Y - half);
            set(eye[3], cx + EYE_HALF_WIDTH, EYE_Y);
            set(eye[4], cx + 7.0, EYE_Y + half);
            set(eye[5], cx - 7.0, EYE_Y + half);

            let ix = cx + self.iris_shift;
            set(iris[0], ix + 4.0, EYE_Y);
            set(iris[1], ix, EYE_Y - 4.0);
            set(iris[2], ix - 4.0, EYE_Y);
            set(iris[3], ix, EYE_Y + 4.0);
        }

        let mouth_y = 285.0;
        set(MOUTH_TOP, 320.0, mouth_y - self.mouth_gap / 2.0);
        set(MOUTH_BOTTOM, 320.0, mouth_y + self.mouth_gap / 2.0);
        set(MOUTH_LEFT, 320.0 - MOUTH_WIDTH / 2.0, mouth_y);
        set(MOUTH_RIGHT, 320.0 + MOUTH_WIDTH / 2.0, mouth_y);

        // nose tip, chin, mouth corners; eye corners are placed above
        let [nose, chin, _, _, mouth_l, mouth_r] = POSE_POINTS;
        set(nose, 320.0, 245.0);
        set(chin, 320.0, 331.0);
        set(mouth_l, 282.0, 283.0);
        set(mouth_r, 358.0, 283.0);

        LandmarkFrame::new(points, WIDTH, HEIGHT)
    }
}

/// One trace line for a frame at `t_ms`.
pub fn trace_line(t_ms: u64, face: Option<&LandmarkFrame>) -> String {
    let landmarks = face.map(|f| {
        f.points()
            .iter()
            .map(|p| [p.x, p.y])
            .collect::<Vec<[f64; 2]>>()
    });
    json!({
        "t_ms": t_ms,
        "width": WIDTH,
        "height": HEIGHT,
        "landmarks": landmarks,
    })
    .to_string()
}

pub fn write_trace(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("session.jsonl");
    fs::write(&path, lines.join("\n")).expect("write trace");
    path
}

/// Frame time at 30 fps, in whole milliseconds.
pub fn frame_ms(index: u64) -> u64 {
    index * 1000 / 30
}
