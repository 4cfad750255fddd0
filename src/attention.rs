//! Attention classification of emitted feature rows.
//!
//! A row is encoded into a fixed-order numeric [`FeatureVector`]: the four
//! window rates, the encoded emotion and a one-hot head pose. The shipped
//! model is a standard-scaled linear decision function exported to JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierError;
use crate::feature_log::FeatureRow;
use crate::signals::HeadPoseLabel;

pub const FEATURE_COUNT: usize = 10;

/// Column order expected by every attention model.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "blink_rate",
    "yawn_count",
    "gaze_on_screen",
    "head_movement",
    "emotion_encoded",
    "pose_center",
    "pose_down",
    "pose_left",
    "pose_right",
    "pose_up",
];

const POSE_OFFSET: usize = 5;

/// Emotion label to model input; unrecognized labels count as neutral.
pub fn encode_emotion(label: &str) -> f64 {
    match label.trim().to_ascii_lowercase().as_str() {
        "happy" => 0.0,
        "neutral" => 1.0,
        "sad" => 2.0,
        "tired" => 3.0,
        _ => 1.0,
    }
}

fn pose_column(label: HeadPoseLabel) -> Option<usize> {
    match label {
        HeadPoseLabel::Frontal => Some(0),
        HeadPoseLabel::Down => Some(1),
        HeadPoseLabel::Left => Some(2),
        HeadPoseLabel::Right => Some(3),
        HeadPoseLabel::Up => Some(4),
        HeadPoseLabel::Unknown => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_row(row: &FeatureRow) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = row.blink_rate;
        values[1] = row.yawn_rate;
        values[2] = row.gaze_ratio;
        values[3] = row.head_movement_rate;
        values[4] = encode_emotion(row.emotion.as_str());
        if let Some(column) = pose_column(row.head_pose) {
            values[POSE_OFFSET + column] = 1.0;
        }
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_ORDER
            .iter()
            .position(|column| *column == name)
            .map(|i| self.0[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionLabel {
    Bored,
    Engaged,
}

impl AttentionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bored => "bored",
            Self::Engaged => "engaged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionOutcome {
    Label(AttentionLabel),
    Unknown,
}

impl AttentionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Label(label) => label.as_str(),
            Self::Unknown => "unknown",
        }
    }
}

pub trait AttentionClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<AttentionLabel, ClassifierError>;
}

/// Linear decision function over standard-scaled features:
/// `bias + Σ weights[i] · (x[i] − mean[i]) / scale[i]`, `engaged` when positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearAttentionModel {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearAttentionModel {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ClassifierError::Unavailable(format!("{}: {e}", path.display())))?;
        let model: Self = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::Schema(format!("{}: {e}", path.display())))?;
        model.validate()?;
        tracing::info!(path = %path.display(), "Loaded attention model");
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        for (name, column) in [
            ("mean", &self.mean),
            ("scale", &self.scale),
            ("weights", &self.weights),
        ] {
            if column.len() != FEATURE_COUNT {
                return Err(ClassifierError::Schema(format!(
                    "{name} has {} entries, expected {FEATURE_COUNT}",
                    column.len()
                )));
            }
        }
        if let Some(i) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(ClassifierError::Schema(format!(
                "scale of {} must be finite and non-zero",
                FEATURE_ORDER[i]
            )));
        }
        Ok(())
    }

    pub fn decision_value(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        self.validate()?;
        let value = features
            .values()
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .zip(&self.weights)
            .fold(self.bias, |acc, (((x, mean), scale), w)| {
                acc + w * (x - mean) / scale
            });
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ClassifierError::Failed("non-finite decision value".to_string()))
        }
    }
}

impl AttentionClassifier for LinearAttentionModel {
    fn classify(&self, features: &FeatureVector) -> Result<AttentionLabel, ClassifierError> {
        let value = self.decision_value(features)?;
        Ok(if value > 0.0 {
            AttentionLabel::Engaged
        } else {
            AttentionLabel::Bored
        })
    }
}

/// Classifies one row; any classifier error yields `Unknown`.
pub fn classify_row<C: AttentionClassifier + ?Sized>(
    classifier: &C,
    row: &FeatureRow,
) -> AttentionOutcome {
    match classifier.classify(&FeatureVector::from_row(row)) {
        Ok(label) => AttentionOutcome::Label(label),
        Err(e) => {
            tracing::warn!(error = %e, timestamp = row.timestamp, "Attention classification failed");
            AttentionOutcome::Unknown
        }
    }
}
