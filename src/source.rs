//! Collaborator boundaries of a session: where frames come from and who
//! turns them into landmarks.

use chrono::{DateTime, Utc};
use image::RgbImage;
use thiserror::Error;

use crate::signals::LandmarkFrame;

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
    /// Position in the stream, starting at 0
    pub sequence: u64,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A failed read. Every variant is transient: the loop skips it and asks
/// for the next frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub trait FrameSource {
    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;
}

pub trait LandmarkDetector {
    /// Landmarks of the single tracked face, `None` when no face was found.
    fn detect(&mut self, frame: &Frame) -> Option<LandmarkFrame>;
}
