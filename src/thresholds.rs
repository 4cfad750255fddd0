//! Detection thresholds persisted between sessions.
//!
//! Stored as a flat JSON object. Loading merges the file over the built-in
//! defaults key by key; calibration rewrites the whole file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CALIBRATION_DURATION, DEFAULT_EAR_BLINK_THRESH, DEFAULT_EMA_ALPHA,
    DEFAULT_GAZE_THRESHOLD, DEFAULT_MAR_YAWN_THRESH, DEFAULT_MIN_FRAMES_REQUIRED,
    DEFAULT_WINDOW_SEC,
};

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid threshold file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub ear_blink_thresh: f64,
    pub mar_yawn_thresh: f64,
    pub gaze_threshold: f64,
    pub ear_ema_alpha: f64,
    pub mar_ema_alpha: f64,
    pub window_sec: f64,
    pub calibration_duration: f64,
    pub min_frames_required: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ear_blink_thresh: DEFAULT_EAR_BLINK_THRESH,
            mar_yawn_thresh: DEFAULT_MAR_YAWN_THRESH,
            gaze_threshold: DEFAULT_GAZE_THRESHOLD,
            ear_ema_alpha: DEFAULT_EMA_ALPHA,
            mar_ema_alpha: DEFAULT_EMA_ALPHA,
            window_sec: DEFAULT_WINDOW_SEC,
            calibration_duration: DEFAULT_CALIBRATION_DURATION,
            min_frames_required: DEFAULT_MIN_FRAMES_REQUIRED,
        }
    }
}

impl ThresholdConfig {
    /// Reads `path`, filling missing keys from the defaults. A missing file
    /// yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ThresholdError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No threshold file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&raw)?;
        config.validate().map_err(ThresholdError::Validation)?;
        Ok(config)
    }

    /// Like [`ThresholdConfig::load`] but never fails: an unreadable or
    /// invalid file is logged and replaced by the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load thresholds, using defaults");
                Self::default()
            }
        }
    }

    /// Replaces the file wholesale (write to a sibling temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), ThresholdError> {
        self.validate().map_err(ThresholdError::Validation)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, self)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), "Thresholds saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("ear_blink_thresh", self.ear_blink_thresh),
            ("mar_yawn_thresh", self.mar_yawn_thresh),
            ("gaze_threshold", self.gaze_threshold),
            ("window_sec", self.window_sec),
            ("calibration_duration", self.calibration_duration),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be > 0"));
            }
        }
        for (name, alpha) in [
            ("ear_ema_alpha", self.ear_ema_alpha),
            ("mar_ema_alpha", self.mar_ema_alpha),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(format!("{name} must be in (0,1]"));
            }
        }
        if self.min_frames_required == 0 {
            return Err("min_frames_required must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn window_duration(&self) -> Duration {
        Duration::milliseconds((self.window_sec * 1000.0).round() as i64)
    }

    pub fn calibration_window(&self) -> Duration {
        Duration::milliseconds((self.calibration_duration * 1000.0).round() as i64)
    }
}
