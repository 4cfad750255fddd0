//! Coarse head pose estimation.
//!
//! Fits a generic six-point 3-D face model to the matching landmarks with a
//! pinhole camera (focal length = frame width, principal point = frame
//! center, no lens distortion). The fit is a Levenberg-Marquardt minimisation
//! of the reprojection error over a rotation vector and a translation. The
//! recovered rotation is decomposed into pitch/yaw/roll and bucketed into a
//! directional label.
//!
//! `head_pose` returns `None` for exactly these reasons:
//! - one of the six landmarks does not resolve, or the frame has no size
//! - the eye corners coincide or lie too far apart to derive a starting
//!   distance
//! - the solver runs out of iterations or leaves the camera's front side

use std::fmt;

use nalgebra::{Matrix3, Rotation3, SMatrix, SVector, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use super::geometry::{LandmarkFrame, Point};

/// Nose tip, chin, image-left eye outer corner, image-right eye outer corner,
/// image-left mouth corner, image-right mouth corner.
pub const POSE_POINTS: [usize; 6] = [1, 199, 33, 263, 61, 291];

/// Generic face in model units, nose tip at the origin, axes aligned with the
/// camera (x right, y down, z away from the lens).
const FACE_MODEL: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, 330.0, 65.0],
    [-225.0, -170.0, 135.0],
    [225.0, -170.0, 135.0],
    [-150.0, 150.0, 125.0],
    [150.0, 150.0, 125.0],
];

/// Distance between the two eye corners of [`FACE_MODEL`]
const MODEL_EYE_SPAN: f64 = 450.0;

const YAW_LIMIT_DEG: f64 = 20.0;
const PITCH_LIMIT_DEG: f64 = 15.0;

/// `sy` below this means the rotation is at gimbal lock
const SINGULAR_TOLERANCE: f64 = 1e-6;

const MAX_ITERATIONS: usize = 100;
const STEP_TOLERANCE: f64 = 1e-10;
const COST_TOLERANCE: f64 = 1e-14;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
const MIN_DEPTH: f64 = 1e-6;

type Residuals = SVector<f64, 12>;
type Jacobian = SMatrix<f64, 12, 6>;

/// Directional head pose bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadPoseLabel {
    Frontal,
    Left,
    Right,
    Up,
    Down,
    /// No pose was resolved (only used for window summaries)
    Unknown,
}

impl HeadPoseLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadPoseLabel::Frontal => "frontal",
            HeadPoseLabel::Left => "left",
            HeadPoseLabel::Right => "right",
            HeadPoseLabel::Up => "up",
            HeadPoseLabel::Down => "down",
            HeadPoseLabel::Unknown => "unknown",
        }
    }

    /// Yaw wins over pitch; positive yaw turns toward the subject's left.
    pub fn classify(yaw: f64, pitch: f64) -> Self {
        if yaw.abs() > YAW_LIMIT_DEG {
            if yaw > 0.0 {
                HeadPoseLabel::Left
            } else {
                HeadPoseLabel::Right
            }
        } else if pitch > PITCH_LIMIT_DEG {
            HeadPoseLabel::Down
        } else if pitch < -PITCH_LIMIT_DEG {
            HeadPoseLabel::Up
        } else {
            HeadPoseLabel::Frontal
        }
    }
}

impl fmt::Display for HeadPoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// About the camera x axis, positive when looking down
    pub pitch: f64,
    /// About the camera y axis
    pub yaw: f64,
    /// About the optical axis
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub angles: EulerAngles,
    pub label: HeadPoseLabel,
}

#[derive(Debug, Clone, Copy)]
struct Camera {
    focal: f64,
    cx: f64,
    cy: f64,
}

impl Camera {
    fn for_frame(width: u32, height: u32) -> Self {
        let w = f64::from(width);
        Self {
            focal: w,
            cx: w / 2.0,
            cy: f64::from(height) / 2.0,
        }
    }

    fn project(&self, p: &Vector3<f64>) -> Option<Point> {
        if p.z < MIN_DEPTH {
            return None;
        }
        Some(Point::new(
            self.focal * p.x / p.z + self.cx,
            self.focal * p.y / p.z + self.cy,
        ))
    }
}

pub fn head_pose(frame: &LandmarkFrame) -> Option<HeadPose> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let image = frame.pixels(&POSE_POINTS)?;
    let camera = Camera::for_frame(frame.width(), frame.height());

    let rotation = solve_pnp(&image, &camera, MAX_ITERATIONS)?;
    let angles = euler_angles(rotation.matrix());

    Some(HeadPose {
        angles,
        label: HeadPoseLabel::classify(angles.yaw, angles.pitch),
    })
}

/// Rotation-matrix to Euler decomposition (R = Rz(roll) * Ry(yaw) * Rx(pitch)).
pub fn euler_angles(r: &Matrix3<f64>) -> EulerAngles {
    let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();

    let (x, y, z) = if sy >= SINGULAR_TOLERANCE {
        (
            r[(2, 1)].atan2(r[(2, 2)]),
            (-r[(2, 0)]).atan2(sy),
            r[(1, 0)].atan2(r[(0, 0)]),
        )
    } else {
        ((-r[(1, 2)]).atan2(r[(1, 1)]), (-r[(2, 0)]).atan2(sy), 0.0)
    };

    EulerAngles {
        pitch: x.to_degrees(),
        yaw: y.to_degrees(),
        roll: z.to_degrees(),
    }
}

fn solve_pnp(
    image: &[Point; 6],
    camera: &Camera,
    max_iterations: usize,
) -> Option<Rotation3<f64>> {
    let mut params = initial_guess(image, camera)?;
    let mut residual = residuals(&params, image, camera)?;
    let mut cost = residual.norm_squared();
    let mut lambda = LAMBDA_INIT;

    for _ in 0..max_iterations {
        if cost <= f64::MIN_POSITIVE {
            return finish(&params);
        }

        let jac = jacobian(&params, image, camera)?;
        let jtj = jac.transpose() * jac;
        let gradient = jac.transpose() * residual;

        let mut improved = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj;
            for i in 0..6 {
                damped[(i, i)] += lambda * jtj[(i, i)].max(f64::EPSILON);
            }
            let Some(cholesky) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let step = cholesky.solve(&(-gradient));
            let candidate = params + step;

            match residuals(&candidate, image, camera) {
                Some(next) if next.norm_squared() < cost => {
                    let next_cost = next.norm_squared();
                    let small_step =
                        step.norm() <= STEP_TOLERANCE * (params.norm() + STEP_TOLERANCE);
                    let small_gain = cost - next_cost <= COST_TOLERANCE * cost;

                    params = candidate;
                    residual = next;
                    cost = next_cost;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if small_step || small_gain {
                        return finish(&params);
                    }
                    improved = true;
                    break;
                }
                _ => lambda *= 10.0,
            }
        }

        if !improved {
            // no damping level lowers the cost any further
            return finish(&params);
        }
    }

    tracing::trace!(cost, "Pose solver hit the iteration limit");
    None
}

/// Frontal face placed so that the eye corners span the observed distance.
fn initial_guess(image: &[Point; 6], camera: &Camera) -> Option<Vector6<f64>> {
    let span = image[2].distance(&image[3]);
    if !span.is_finite() || span < MIN_DEPTH {
        return None;
    }
    let tz = camera.focal * MODEL_EYE_SPAN / span;
    let tx = (image[0].x - camera.cx) * tz / camera.focal;
    let ty = (image[0].y - camera.cy) * tz / camera.focal;
    Some(Vector6::new(0.0, 0.0, 0.0, tx, ty, tz))
}

fn rotation_of(params: &Vector6<f64>) -> Rotation3<f64> {
    Rotation3::new(Vector3::new(params[0], params[1], params[2]))
}

fn finish(params: &Vector6<f64>) -> Option<Rotation3<f64>> {
    if params.iter().all(|v| v.is_finite()) && params[5] > 0.0 {
        Some(rotation_of(params))
    } else {
        None
    }
}

fn residuals(params: &Vector6<f64>, image: &[Point; 6], camera: &Camera) -> Option<Residuals> {
    let rotation = rotation_of(params);
    let translation = Vector3::new(params[3], params[4], params[5]);

    let mut out = Residuals::zeros();
    for (i, (model, observed)) in FACE_MODEL.iter().zip(image.iter()).enumerate() {
        let p = rotation * Vector3::new(model[0], model[1], model[2]) + translation;
        let projected = camera.project(&p)?;
        out[2 * i] = projected.x - observed.x;
        out[2 * i + 1] = projected.y - observed.y;
    }
    Some(out)
}

fn jacobian(params: &Vector6<f64>, image: &[Point; 6], camera: &Camera) -> Option<Jacobian> {
    let mut jac = Jacobian::zeros();
    for i in 0..6 {
        let h = 1e-6 * params[i].abs().max(1.0);
        let mut forward = *params;
        forward[i] += h;
        let mut backward = *params;
        backward[i] -= h;

        let column =
            (residuals(&forward, image, camera)? - residuals(&backward, image, camera)?) / (2.0 * h);
        jac.set_column(i, &column);
    }
    Some(jac)
}
