//! Append-only feature log (`data.csv`) and representative face images.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;

use crate::classify::EmotionTag;
use crate::constants::{FACE_IMAGE_DIR, FEATURE_LOG_FILE, FEATURE_LOG_HEADER};
use crate::signals::HeadPoseLabel;
use crate::window::WindowFeatures;

#[derive(Debug, Error)]
pub enum FeatureLogError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// One emitted row, columns in [`FEATURE_LOG_HEADER`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: i64,
    /// Saved crop path, empty when none was saved
    pub face_image: String,
    pub emotion: EmotionTag,
    pub blink_rate: f64,
    pub yawn_rate: f64,
    pub gaze_ratio: f64,
    pub head_pose: HeadPoseLabel,
    pub head_movement_rate: f64,
}

impl FeatureRow {
    pub fn from_window(features: &WindowFeatures, face_image: String, emotion: EmotionTag) -> Self {
        Self {
            timestamp: features.timestamp,
            face_image,
            emotion,
            blink_rate: features.blink_rate,
            yawn_rate: features.yawn_rate,
            gaze_ratio: features.gaze_ratio,
            head_pose: features.final_head_pose,
            head_movement_rate: features.head_movement_rate,
        }
    }

    pub fn to_record(&self) -> String {
        let fields = [
            self.timestamp.to_string(),
            escape_field(&self.face_image),
            escape_field(self.emotion.as_str()),
            format!("{:?}", self.blink_rate),
            format!("{:?}", self.yawn_rate),
            format!("{:?}", self.gaze_ratio),
            self.head_pose.as_str().to_string(),
            format!("{:?}", self.head_movement_rate),
        ];
        fields.join(",")
    }
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureLog {
    csv_path: PathBuf,
    image_dir: PathBuf,
}

impl FeatureLog {
    /// Creates the output layout under `output_dir`. The header is written
    /// only when the log file does not exist yet.
    pub fn open(output_dir: &Path) -> Result<Self, FeatureLogError> {
        let image_dir = output_dir.join(FACE_IMAGE_DIR);
        fs::create_dir_all(&image_dir)?;

        let csv_path = output_dir.join(FEATURE_LOG_FILE);
        if !csv_path.exists() {
            let mut file = fs::File::create(&csv_path)?;
            writeln!(file, "{}", FEATURE_LOG_HEADER.join(","))?;
            tracing::info!(path = %csv_path.display(), "Created feature log");
        }

        Ok(Self {
            csv_path,
            image_dir,
        })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn append(&self, row: &FeatureRow) -> Result<(), FeatureLogError> {
        let mut file = OpenOptions::new().append(true).create(true).open(&self.csv_path)?;
        writeln!(file, "{}", row.to_record())?;
        Ok(())
    }

    /// Saves a crop as `images/<timestamp>.jpg` and returns its path.
    pub fn save_face(&self, timestamp: i64, face: &RgbImage) -> Result<PathBuf, FeatureLogError> {
        let path = self.image_dir.join(format!("{timestamp}.jpg"));
        face.save_with_format(&path, ImageFormat::Jpeg)?;
        Ok(path)
    }
}
