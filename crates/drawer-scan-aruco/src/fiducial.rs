//! Multi-pass fiducial detection and case-corner assignment.

use crate::{builtin_dictionary, DetectorParams, MarkerDetection, MarkerDetector};
use drawer_scan_core::{CaseCorner, CornerSet, GrayImageView};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Corner of a marker in its own upright frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCorner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl MarkerCorner {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            MarkerCorner::TopLeft => 0,
            MarkerCorner::TopRight => 1,
            MarkerCorner::BottomRight => 2,
            MarkerCorner::BottomLeft => 3,
        }
    }
}

/// Which marker marks a case corner, and which of its corners to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerRule {
    pub marker_id: u32,
    pub case_corner: CaseCorner,
    pub marker_corner: MarkerCorner,
}

/// Marker-id to case-corner table; exactly one rule per case corner.
///
/// The default uses the marker corner that points into the case, so the
/// rectified region excludes the markers themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerMap {
    pub rules: Vec<CornerRule>,
}

impl Default for CornerMap {
    fn default() -> Self {
        let rule = |marker_id, case_corner, marker_corner| CornerRule {
            marker_id,
            case_corner,
            marker_corner,
        };
        Self {
            rules: vec![
                rule(1, CaseCorner::TopLeft, MarkerCorner::BottomRight),
                rule(3, CaseCorner::TopRight, MarkerCorner::BottomLeft),
                rule(4, CaseCorner::BottomLeft, MarkerCorner::TopRight),
                rule(2, CaseCorner::BottomRight, MarkerCorner::TopLeft),
            ],
        }
    }
}

impl CornerMap {
    /// Check that every case corner appears once and marker ids are unique.
    pub fn validate(&self) -> Result<(), FiducialError> {
        if self.rules.len() != 4 {
            return Err(FiducialError::InvalidCornerMap(format!(
                "expected 4 rules, got {}",
                self.rules.len()
            )));
        }
        for corner in CaseCorner::ALL {
            let n = self.rules.iter().filter(|r| r.case_corner == corner).count();
            if n != 1 {
                return Err(FiducialError::InvalidCornerMap(format!(
                    "case corner {corner} has {n} rules"
                )));
            }
        }
        let ids: HashSet<u32> = self.rules.iter().map(|r| r.marker_id).collect();
        if ids.len() != self.rules.len() {
            return Err(FiducialError::InvalidCornerMap(
                "marker ids must be unique".to_string(),
            ));
        }
        Ok(())
    }

    pub fn marker_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rules.iter().map(|r| r.marker_id)
    }
}

/// Image preprocessing applied before one detection pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessPass {
    Raw,
    /// Global histogram equalization.
    Equalized,
    /// 3×3 sharpening kernel.
    Sharpened,
    /// Catmull-Rom upscaling; corners are scaled back afterwards.
    Upscaled { factor: f32 },
}

impl PreprocessPass {
    fn name(&self) -> &'static str {
        match self {
            PreprocessPass::Raw => "raw",
            PreprocessPass::Equalized => "equalized",
            PreprocessPass::Sharpened => "sharpened",
            PreprocessPass::Upscaled { .. } => "upscaled",
        }
    }

    fn apply(&self, gray: &GrayImage) -> Option<GrayImage> {
        match *self {
            PreprocessPass::Raw => None,
            PreprocessPass::Equalized => Some(imageproc::contrast::equalize_histogram(gray)),
            PreprocessPass::Sharpened => Some(imageproc::filter::sharpen3x3(gray)),
            PreprocessPass::Upscaled { factor } => {
                let w = ((gray.width() as f32) * factor).round().max(1.0) as u32;
                let h = ((gray.height() as f32) * factor).round().max(1.0) as u32;
                Some(imageops::resize(gray, w, h, FilterType::CatmullRom))
            }
        }
    }

    fn scale(&self) -> f32 {
        match *self {
            PreprocessPass::Upscaled { factor } if factor > 0.0 => factor,
            _ => 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialParams {
    pub dictionary: String,
    pub corner_map: CornerMap,
    /// Passes run in order until every mapped marker is found.
    pub passes: Vec<PreprocessPass>,
    pub detector: DetectorParams,
}

impl Default for FiducialParams {
    fn default() -> Self {
        Self {
            dictionary: "DICT_4X4_50".to_string(),
            corner_map: CornerMap::default(),
            passes: vec![
                PreprocessPass::Raw,
                PreprocessPass::Equalized,
                PreprocessPass::Sharpened,
                PreprocessPass::Upscaled { factor: 1.5 },
            ],
            detector: DetectorParams::default(),
        }
    }
}

/// A case corner whose marker was not found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MissingCorner {
    pub corner: CaseCorner,
    pub marker_id: u32,
}

impl fmt::Display for MissingCorner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (marker id {})", self.corner, self.marker_id)
    }
}

fn join_missing(missing: &[MissingCorner]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(thiserror::Error, Debug)]
pub enum FiducialError {
    #[error("unknown marker dictionary {0:?}")]
    UnknownDictionary(String),
    #[error("invalid corner map: {0}")]
    InvalidCornerMap(String),
    #[error("marker id {id} is not in dictionary {dictionary} ({size} ids)")]
    MarkerIdOutOfRange {
        id: u32,
        dictionary: &'static str,
        size: usize,
    },
    #[error("missing case corners: {}", join_missing(.0))]
    MissingCorners(Vec<MissingCorner>),
}

/// Result of a successful fiducial search.
#[derive(Clone, Debug, Serialize)]
pub struct FiducialDetection {
    pub corners: CornerSet,
    /// The mapped markers, keyed by id.
    pub markers: BTreeMap<u32, MarkerDetection>,
    /// Number of preprocessing passes that ran.
    pub passes_run: usize,
}

/// Finds the four case-corner markers, retrying with alternative
/// preprocessing when a pass misses some of them.
#[derive(Clone, Debug)]
pub struct FiducialDetector {
    params: FiducialParams,
    detector: MarkerDetector,
}

impl FiducialDetector {
    pub fn new(params: FiducialParams) -> Result<Self, FiducialError> {
        let dict = builtin_dictionary(&params.dictionary)
            .ok_or_else(|| FiducialError::UnknownDictionary(params.dictionary.clone()))?;
        params.corner_map.validate()?;
        if let Some(id) = params
            .corner_map
            .marker_ids()
            .find(|&id| id as usize >= dict.codes.len())
        {
            return Err(FiducialError::MarkerIdOutOfRange {
                id,
                dictionary: dict.name,
                size: dict.codes.len(),
            });
        }

        let detector = MarkerDetector::new(dict, params.detector.clone());
        Ok(Self { params, detector })
    }

    #[inline]
    pub fn params(&self) -> &FiducialParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(w = image.width(), h = image.height()))
    )]
    pub fn detect(&self, image: &RgbImage) -> Result<FiducialDetection, FiducialError> {
        let gray = imageops::grayscale(image);
        self.detect_gray(&gray)
    }

    pub fn detect_gray(&self, gray: &GrayImage) -> Result<FiducialDetection, FiducialError> {
        let wanted: HashSet<u32> = self.params.corner_map.marker_ids().collect();
        let mut found: BTreeMap<u32, MarkerDetection> = BTreeMap::new();
        let mut passes_run = 0;

        for pass in &self.params.passes {
            if wanted.iter().all(|id| found.contains_key(id)) {
                break;
            }
            passes_run += 1;

            let prepared = pass.apply(gray);
            let img = prepared.as_ref().unwrap_or(gray);
            let view = GrayImageView {
                width: img.width() as usize,
                height: img.height() as usize,
                data: img.as_raw(),
            };

            let detections = self.detector.detect(&view);
            let new_ids = merge_pass(&mut found, &wanted, detections, pass.scale());
            info!("fiducial pass {}: new marker ids {:?}", pass.name(), new_ids);
        }

        let mut pts = [None; 4];
        let mut missing = Vec::new();
        for rule in &self.params.corner_map.rules {
            match found.get(&rule.marker_id) {
                Some(det) => {
                    pts[rule.case_corner.index()] = Some(det.corners[rule.marker_corner.index()])
                }
                None => missing.push(MissingCorner {
                    corner: rule.case_corner,
                    marker_id: rule.marker_id,
                }),
            }
        }
        missing.sort_by_key(|m| m.corner);

        let corners = CornerSet::from_partial(pts).ok_or(FiducialError::MissingCorners(missing))?;
        debug!("case corners: {:?}", corners.to_array());

        Ok(FiducialDetection {
            corners,
            markers: found,
            passes_run,
        })
    }
}

/// Add detections of wanted ids not seen in an earlier pass, mapping
/// corners from the pass image back to the input image. Returns the ids
/// added.
fn merge_pass(
    found: &mut BTreeMap<u32, MarkerDetection>,
    wanted: &HashSet<u32>,
    detections: Vec<MarkerDetection>,
    scale: f32,
) -> Vec<u32> {
    let mut added = Vec::new();
    for det in detections {
        if !wanted.contains(&det.id) || found.contains_key(&det.id) {
            continue;
        }
        added.push(det.id);
        found.insert(det.id, det.scaled(1.0 / scale));
    }
    added
}
