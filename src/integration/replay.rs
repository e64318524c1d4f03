//! Recorded detection streams.
//!
//! A recording is a JSON-lines file, one frame per line:
//!
//! ```text
//! {"timestamp": 0.0, "detections": [{"label": "apple", "bbox": [10, 10, 50, 50], "confidence": 0.8}]}
//! {"timestamp": 0.5, "detections": []}
//! ```
//!
//! [`ReplaySource`] yields frames whose payload is the encoded detection list
//! and [`ReplayDetector`] decodes it again, so a recording can stand in for both
//! the camera and the model.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::integration::detector::{DetectionSource, Frame, FrameSource};
use crate::tracker::Detection;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read recording {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("recording line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("recording line {line}: confidence {confidence} outside [0, 1]")]
    Confidence { line: usize, confidence: f32 },
    #[error("recording line {line}: timestamp must be finite")]
    Timestamp { line: usize },
    #[error("frame payload is not a detection list: {0}")]
    Payload(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordedFrame {
    timestamp: f64,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    detections: Vec<Detection>,
}

/// Frame source backed by a recording held in memory.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: std::vec::IntoIter<RecordedFrame>,
    len: usize,
}

impl ReplaySource {
    /// Parse and validate a whole recording up front.
    pub fn from_jsonl_str(input: &str) -> Result<Self, ReplayError> {
        let mut frames = Vec::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame = serde_json::from_str(raw)
                .map_err(|source| ReplayError::Parse { line, source })?;
            if !frame.timestamp.is_finite() {
                return Err(ReplayError::Timestamp { line });
            }
            if let Some(det) = frame
                .detections
                .iter()
                .find(|d| !(0.0..=1.0).contains(&d.confidence))
            {
                return Err(ReplayError::Confidence {
                    line,
                    confidence: det.confidence,
                });
            }
            frames.push(frame);
        }

        let len = frames.len();
        Ok(Self {
            frames: frames.into_iter(),
            len,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|source| ReplayError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        Self::from_jsonl_str(&content)
    }

    /// Frames in the recording, including those already read.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FrameSource for ReplaySource {
    type Error = ReplayError;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        let Some(recorded) = self.frames.next() else {
            return Ok(None);
        };
        let data = serde_json::to_vec(&recorded.detections).map_err(ReplayError::Payload)?;
        Ok(Some(Frame {
            data,
            width: recorded.width,
            height: recorded.height,
            timestamp: recorded.timestamp,
        }))
    }
}

/// Decodes detections carried in a [`ReplaySource`] frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayDetector;

impl DetectionSource for ReplayDetector {
    type Error = ReplayError;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        serde_json::from_slice(&frame.data).map_err(ReplayError::Payload)
    }
}
