//! Sessions driven from a recorded landmark trace.
//!
//! A trace is a JSON-lines file, one frame per line:
//!
//! ```text
//! {"t_ms": 33, "width": 640, "height": 480, "landmarks": [[0.41, 0.37], ...], "image": "f0001.png"}
//! ```
//!
//! `landmarks` is `null` for frames without a face. `image` is optional and
//! resolved relative to the trace file; without it the frame is blank.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;

use crate::signals::{Landmark, LandmarkFrame};
use crate::source::{Frame, FrameError, FrameSource, LandmarkDetector};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read trace {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceRecord {
    /// Milliseconds since the start of the recording
    pub t_ms: u64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub landmarks: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl TraceRecord {
    fn landmark_frame(&self) -> Option<LandmarkFrame> {
        let points = self
            .landmarks
            .as_ref()?
            .iter()
            .map(|[x, y]| Landmark::new(*x, *y))
            .collect();
        Some(LandmarkFrame::new(points, self.width, self.height))
    }
}

/// A parsed line, or the reason it could not be parsed.
type TraceEntry = Result<TraceRecord, String>;

#[derive(Debug, Clone)]
pub struct ReplayTrace {
    entries: Arc<Vec<TraceEntry>>,
    base_dir: PathBuf,
}

impl ReplayTrace {
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        let read_err = |source| ReplayError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::open(path).map_err(read_err)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let trace = Self::from_reader(BufReader::new(file), base_dir).map_err(read_err)?;
        tracing::info!(path = %path.display(), frames = trace.len(), "Loaded replay trace");
        Ok(trace)
    }

    /// Blank lines are skipped; every other line becomes one frame.
    pub fn from_reader<R: BufRead>(reader: R, base_dir: PathBuf) -> io::Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str::<TraceRecord>(&line)
                .map_err(|e| format!("line {}: {e}", index + 1));
            entries.push(entry);
        }
        Ok(Self {
            entries: Arc::new(entries),
            base_dir,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames of the trace, timestamped relative to `start`.
    pub fn frames(&self, start: DateTime<Utc>) -> ReplayFrames {
        ReplayFrames {
            entries: Arc::clone(&self.entries),
            base_dir: self.base_dir.clone(),
            start,
            cursor: 0,
        }
    }

    pub fn landmarks(&self) -> ReplayLandmarks {
        ReplayLandmarks {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[derive(Debug)]
pub struct ReplayFrames {
    entries: Arc<Vec<TraceEntry>>,
    base_dir: PathBuf,
    start: DateTime<Utc>,
    cursor: usize,
}

impl ReplayFrames {
    fn load_image(&self, record: &TraceRecord) -> Result<RgbImage, FrameError> {
        let Some(rel) = &record.image else {
            return Ok(RgbImage::new(record.width, record.height));
        };
        let path = self.base_dir.join(rel);
        image::open(&path)
            .map(|img| img.to_rgb8())
            .map_err(|e| FrameError::Decode(format!("{}: {e}", path.display())))
    }
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let sequence = self.cursor;
        let Some(entry) = self.entries.get(sequence) else {
            return Ok(None);
        };
        self.cursor += 1;

        let record = entry.as_ref().map_err(|e| FrameError::Read(e.clone()))?;
        let image = self.load_image(record)?;
        let offset = i64::try_from(record.t_ms).unwrap_or(i64::MAX);
        Ok(Some(Frame {
            image,
            captured_at: self.start + Duration::milliseconds(offset),
            sequence: sequence as u64,
        }))
    }
}

/// Looks up the recorded landmarks of a frame by its sequence number.
#[derive(Debug, Clone)]
pub struct ReplayLandmarks {
    entries: Arc<Vec<TraceEntry>>,
}

impl LandmarkDetector for ReplayLandmarks {
    fn detect(&mut self, frame: &Frame) -> Option<LandmarkFrame> {
        let index = usize::try_from(frame.sequence).ok()?;
        self.entries.get(index)?.as_ref().ok()?.landmark_frame()
    }
}
