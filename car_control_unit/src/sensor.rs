//! Sensor ingestion collaborator.
//!
//! A [`SensorSource`] delivers one raw [`SensorFrame`] per tick. Replay runs
//! read frames from JSON-lines files:
//!
//! ```text
//! {"front": 163, "left": 400, "right": 380}
//! {"front": 170, "left": 420, "right": 360, "side_angle_deg": 45.0}
//! {"front": 180, "left": 500, "right": 300, "side_angle_factor": 71}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Without an angle the
//! side sensors are treated as straight ahead.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use car_common::consts::COS_STRAIGHT;
use car_common::control::state::SensorFrame;
use serde::Deserialize;
use thiserror::Error;

use crate::control::linearize::angle_factor_from_degrees;

/// Sensor ingestion failure.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Reading the source failed.
    #[error("sensor source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be decoded.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Source of raw sensor frames.
pub trait SensorSource {
    /// Next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<SensorFrame>, SensorError>;
}

/// One JSON-lines record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameRecord {
    pub front: u16,
    pub left: u16,
    pub right: u16,
    #[serde(default)]
    pub side_angle_deg: Option<f64>,
    #[serde(default)]
    pub side_angle_factor: Option<u8>,
}

impl From<FrameRecord> for SensorFrame {
    fn from(record: FrameRecord) -> Self {
        let side_angle_factor = record
            .side_angle_factor
            .or_else(|| record.side_angle_deg.map(angle_factor_from_degrees))
            .unwrap_or(COS_STRAIGHT);
        Self {
            front_raw: record.front,
            left_raw: record.left,
            right_raw: record.right,
            side_angle_factor,
        }
    }
}

/// Frames replayed from a JSON-lines reader.
pub struct ReplaySource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl ReplaySource<BufReader<File>> {
    /// Open a JSON-lines file.
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> SensorSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<SensorFrame>, SensorError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let record: FrameRecord =
                serde_json::from_str(text).map_err(|e| SensorError::Parse {
                    line: self.line,
                    message: e.to_string(),
                })?;
            return Ok(Some(record.into()));
        }
    }
}

/// Frames from memory (tests, benchmarks).
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    frames: VecDeque<SensorFrame>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = SensorFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl SensorSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<SensorFrame>, SensorError> {
        Ok(self.frames.pop_front())
    }
}
