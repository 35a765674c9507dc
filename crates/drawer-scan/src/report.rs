//! Persisted results of a scan.

use drawer_scan_core::CornerSet;
use drawer_scan_grid::{CellPosition, GridMapping, LabelCandidate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Text read for one drawer; empty when nothing was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub row: u32,
    pub col: u32,
    pub text: String,
}

impl ResultRecord {
    pub fn position(&self) -> CellPosition {
        CellPosition::new(self.row, self.col)
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Wall-clock time per stage, in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingsMs {
    pub detect_fiducials: f64,
    pub rectify: f64,
    pub candidates: f64,
    pub mapping: f64,
    pub text_extraction: f64,
    pub write_outputs: f64,
    pub total: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub cells_with_text: usize,
    pub total_cells: usize,
}

impl ScanSummary {
    pub fn from_records(records: &[ResultRecord]) -> Self {
        Self {
            cells_with_text: records.iter().filter(|r| r.has_text()).count(),
            total_cells: records.len(),
        }
    }
}

/// Full audit record of a run, written as `scan_report.json`.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub layout: String,
    pub image_size: [u32; 2],
    pub corners: CornerSet,
    /// Preprocessing passes the fiducial search needed.
    pub fiducial_passes: usize,
    pub rectified_size: [u32; 2],
    pub candidates: Vec<LabelCandidate>,
    pub mapping: GridMapping,
    pub text_backend: String,
    pub results: Vec<ResultRecord>,
    pub timings_ms: TimingsMs,
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Write the report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
