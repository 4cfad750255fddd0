//! Landmark geometry: EAR, MAR, gaze offset and face bounds.
//!
//! Every function here is a pure function of one [`LandmarkFrame`]. Inputs
//! are normalized MediaPipe face-mesh coordinates (478 points with iris
//! refinement); measurements are taken in pixel space. A measurement whose
//! preconditions fail comes back as `None`, never as `0.0`.

use serde::{Deserialize, Serialize};

use super::pose::{self, HeadPose};

/// Image-left eye (the subject's right eye), in EAR order p1..p6
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
/// Image-right eye (the subject's left eye), in EAR order p1..p6
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
/// Iris ring belonging to [`LEFT_EYE`]
pub const LEFT_IRIS: [usize; 4] = [469, 470, 471, 472];
/// Iris ring belonging to [`RIGHT_EYE`]
pub const RIGHT_IRIS: [usize; 4] = [474, 475, 476, 477];

pub const MOUTH_TOP: usize = 13;
pub const MOUTH_BOTTOM: usize = 14;
pub const MOUTH_LEFT: usize = 78;
pub const MOUTH_RIGHT: usize = 308;

/// Below this a reference distance (pixels) is treated as degenerate.
const MIN_REFERENCE_DISTANCE: f64 = 1e-6;

/// Keeps the gaze denominator away from zero without shifting real ratios.
const GAZE_EPSILON: f64 = 1e-6;

/// One normalized landmark as produced by the detector (`[0, 1]` range).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Landmarks of the single tracked face in one frame.
///
/// Carries the pixel size of the frame the landmarks were detected on, which
/// the pose solver needs for its camera model.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
    width: u32,
    height: u32,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>, width: u32, height: u32) -> Self {
        Self {
            points,
            width,
            height,
        }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel position of landmark `index`, if it exists and is finite.
    pub fn pixel(&self, index: usize) -> Option<Point> {
        let lm = self.points.get(index)?;
        let x = lm.x * f64::from(self.width);
        let y = lm.y * f64::from(self.height);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Point::new(x, y))
    }

    /// Resolves every index or none of them.
    pub fn pixels<const N: usize>(&self, indices: &[usize; N]) -> Option<[Point; N]> {
        let mut out = [Point::default(); N];
        for (slot, &index) in out.iter_mut().zip(indices.iter()) {
            *slot = self.pixel(index)?;
        }
        Some(out)
    }
}

/// Per-frame measurements taken straight from the geometry, before any
/// smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSample {
    /// Mean EAR of both eyes
    pub ear: Option<f64>,
    pub mar: Option<f64>,
    /// Centered iris offset, 0 when looking straight ahead
    pub gaze_offset: Option<f64>,
    pub head_pose: Option<HeadPose>,
}

impl MetricSample {
    pub fn measure(frame: &LandmarkFrame) -> Self {
        Self {
            ear: average_eye_aspect_ratio(frame),
            mar: mouth_aspect_ratio(frame),
            gaze_offset: gaze_offset(frame),
            head_pose: pose::head_pose(frame),
        }
    }
}

/// EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)
///
/// - p1, p4: eye corners (horizontal reference)
/// - p2, p3: upper lid
/// - p5, p6: lower lid
pub fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &[usize; 6]) -> Option<f64> {
    let [p1, p2, p3, p4, p5, p6] = frame.pixels(eye)?;

    let horizontal = p1.distance(&p4);
    if horizontal < MIN_REFERENCE_DISTANCE {
        return None;
    }

    let ear = (p2.distance(&p6) + p3.distance(&p5)) / (2.0 * horizontal);
    ear.is_finite().then_some(ear)
}

/// Mean of both eyes' EAR; `None` unless both eyes resolve.
pub fn average_eye_aspect_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let left = eye_aspect_ratio(frame, &LEFT_EYE)?;
    let right = eye_aspect_ratio(frame, &RIGHT_EYE)?;
    Some((left + right) / 2.0)
}

/// MAR = |top-bottom| / |left-right| over the inner lip landmarks.
pub fn mouth_aspect_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let [top, bottom, left, right] =
        frame.pixels(&[MOUTH_TOP, MOUTH_BOTTOM, MOUTH_LEFT, MOUTH_RIGHT])?;

    let horizontal = left.distance(&right);
    if horizontal < MIN_REFERENCE_DISTANCE {
        return None;
    }

    let mar = top.distance(&bottom) / horizontal;
    mar.is_finite().then_some(mar)
}

pub fn iris_center(frame: &LandmarkFrame, iris: &[usize; 4]) -> Option<Point> {
    let ring = frame.pixels(iris)?;
    let n = ring.len() as f64;
    let (sx, sy) = ring
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Horizontal iris position across the eye, shifted so that a centered iris
/// reads 0. Averaged over both eyes.
pub fn gaze_offset(frame: &LandmarkFrame) -> Option<f64> {
    let left = eye_gaze_offset(frame, &LEFT_EYE, &LEFT_IRIS)?;
    let right = eye_gaze_offset(frame, &RIGHT_EYE, &RIGHT_IRIS)?;
    let offset = (left + right) / 2.0;
    offset.is_finite().then_some(offset)
}

fn eye_gaze_offset(frame: &LandmarkFrame, eye: &[usize; 6], iris: &[usize; 4]) -> Option<f64> {
    let p1 = frame.pixel(eye[0])?;
    let p4 = frame.pixel(eye[3])?;
    let center = iris_center(frame, iris)?;

    let width = p1.distance(&p4);
    let offset = (center.x - p1.x) / (width + GAZE_EPSILON);
    Some(offset - 0.5)
}

/// Integer pixel rectangle, already clipped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Tight box around every resolved landmark, grown by `margin` pixels and
/// clipped to the frame. `None` when nothing resolves or the clipped box is
/// empty.
pub fn face_bounds(frame: &LandmarkFrame, margin: i64) -> Option<PixelRect> {
    let w = i64::from(frame.width());
    let h = i64::from(frame.height());

    let mut xs = (i64::MAX, i64::MIN);
    let mut ys = (i64::MAX, i64::MIN);
    let mut any = false;
    for index in 0..frame.points().len() {
        let Some(p) = frame.pixel(index) else {
            continue;
        };
        // snap to the integer pixel grid (truncating)
        let (px, py) = (p.x as i64, p.y as i64);
        xs = (xs.0.min(px), xs.1.max(px));
        ys = (ys.0.min(py), ys.1.max(py));
        any = true;
    }
    if !any {
        return None;
    }

    // far off-frame points snap to i64::MIN/MAX
    let x_min = xs.0.saturating_sub(margin).max(0);
    let x_max = xs.1.saturating_add(margin).min(w);
    let y_min = ys.0.saturating_sub(margin).max(0);
    let y_max = ys.1.saturating_add(margin).min(h);
    if x_max <= x_min || y_max <= y_min {
        return None;
    }

    Some(PixelRect {
        x: x_min as u32,
        y: y_min as u32,
        width: (x_max - x_min) as u32,
        height: (y_max - y_min) as u32,
    })
}
