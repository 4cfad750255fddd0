//! Per-frame behavioral signals.
//!
//! ## Modules
//! - `geometry`: EAR, MAR, gaze offset and face bounds from landmarks
//! - `pose`: head pose solver and directional labels
//! - `smoothing`: EMA over the EAR/MAR channels
//! - `hysteresis`: shared two-state threshold detector
//! - `blink`, `yawn`: event detectors on the smoothed channels
//! - `head_motion`: head pose label change counter

pub mod blink;
pub mod geometry;
pub mod head_motion;
pub mod hysteresis;
pub mod pose;
pub mod smoothing;
pub mod yawn;

pub use blink::BlinkDetector;
pub use geometry::{Landmark, LandmarkFrame, MetricSample};
pub use head_motion::HeadMotionCounter;
pub use pose::{HeadPose, HeadPoseLabel};
pub use smoothing::SmoothedSignal;
pub use yawn::YawnDetector;
