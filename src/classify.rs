//! Emotion classification of a window's representative face crop.

use std::fmt;

use image::RgbImage;
use thiserror::Error;

use crate::constants::{EMOTION_DETECTION_ISSUES, EMOTION_UNKNOWN};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classification failed: {0}")]
    Failed(String),
    #[error("schema mismatch: {0}")]
    Schema(String),
}

pub trait EmotionClassifier {
    /// Dominant emotion label of a face crop.
    fn classify(&mut self, face: &RgbImage) -> Result<String, ClassifierError>;
}

/// Stand-in used when no emotion model is configured; every window that
/// passes the quality gate is tagged `unknown`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEmotionModel;

impl EmotionClassifier for NoEmotionModel {
    fn classify(&mut self, _face: &RgbImage) -> Result<String, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "no emotion model configured".to_string(),
        ))
    }
}

/// Emotion column of a feature row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmotionTag {
    Label(String),
    /// The classifier failed on a valid crop
    Unknown,
    /// The window failed the face-quality gate
    DetectionIssues,
}

impl EmotionTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Label(label) => label,
            Self::Unknown => EMOTION_UNKNOWN,
            Self::DetectionIssues => EMOTION_DETECTION_ISSUES,
        }
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags a window: the sentinel when there is no representative crop,
/// otherwise the classifier's label or `unknown` on error.
pub fn tag_emotion<C: EmotionClassifier + ?Sized>(
    classifier: &mut C,
    representative: Option<&RgbImage>,
) -> EmotionTag {
    let Some(face) = representative else {
        return EmotionTag::DetectionIssues;
    };
    match classifier.classify(face) {
        Ok(label) => EmotionTag::Label(label.trim().to_ascii_lowercase()),
        Err(e) => {
            tracing::warn!(error = %e, "Emotion classification failed");
            EmotionTag::Unknown
        }
    }
}
