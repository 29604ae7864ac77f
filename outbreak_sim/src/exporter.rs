//! JSON exporter for offline visualisation.
//!
//! Collects simulation frames during a run and writes them, together with
//! the final tallies, as one JSON document.

use outbreak_core::{Frame, ShutdownReport, Statistics};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Unique id of this run
    pub run_id: Uuid,

    /// Run label (scenario name or "live")
    pub label: String,

    /// Seed used
    pub seed: u64,

    /// Elapsed time of the last frame
    pub duration_ms: u64,

    /// All frames
    pub frames: Vec<Frame>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_statistics: Option<Statistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<ShutdownReport>,

    /// Repair shop acquisitions over the whole run
    #[serde(default)]
    pub repairs: u64,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(label: &str, seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            label: label.to_string(),
            seed,
            duration_ms: 0,
            frames: Vec::new(),
            final_statistics: None,
            shutdown: None,
            repairs: 0,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: Frame) {
        self.duration_ms = frame.elapsed_ms;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, statistics: Statistics, shutdown: ShutdownReport, repairs: u64) {
        self.final_statistics = Some(statistics);
        self.shutdown = Some(shutdown);
        self.repairs = repairs;
    }

    /// Most phones sick in any recorded frame.
    pub fn peak_sick(&self) -> usize {
        self.frames
            .iter()
            .map(|frame| frame.statistics.sick())
            .max()
            .unwrap_or(0)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        let io_error = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::create(path).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        Ok(())
    }
}
