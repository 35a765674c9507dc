//! Single-pass marker detection on a grayscale image.

use crate::decode::{decode_quad, DecodeParams};
use crate::quad::{dedup_quads, find_quads, Quad, QuadParams};
use crate::refine::{refine_corner, CornerRefineParams};
use crate::threshold::adaptive_threshold_inv;
use crate::{Dictionary, Matcher};
use drawer_scan_core::GrayImageView;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters for [`MarkerDetector`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest adaptive-threshold window (pixels, odd).
    pub adaptive_win_min: usize,
    /// Largest adaptive-threshold window (pixels, odd).
    pub adaptive_win_max: usize,
    pub adaptive_win_step: usize,
    /// A pixel is foreground when it is this much darker than its window mean.
    pub adaptive_constant: f32,
    /// Hamming tolerance, capped by the dictionary's correction capacity.
    pub max_hamming: u8,
    pub quad: QuadParams,
    pub decode: DecodeParams,
    pub refine: CornerRefineParams,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_win_min: 3,
            adaptive_win_max: 23,
            adaptive_win_step: 10,
            adaptive_constant: 7.0,
            max_hamming: 1,
            quad: QuadParams::default(),
            decode: DecodeParams::default(),
            refine: CornerRefineParams::default(),
        }
    }
}

impl DetectorParams {
    fn window_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        let lo = self.adaptive_win_min.max(3);
        let hi = self.adaptive_win_max.max(lo);
        (lo..=hi).step_by(self.adaptive_win_step.max(1))
    }
}

/// One decoded marker.
#[derive(Clone, Debug, Serialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Corners in the marker's own upright order: top-left, top-right,
    /// bottom-right, bottom-left. Pixel-center image coordinates.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns between the upright marker and its appearance.
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
}

impl MarkerDetection {
    /// Same detection with coordinates multiplied by `factor`.
    pub fn scaled(mut self, factor: f32) -> Self {
        for c in &mut self.corners {
            *c = Point2::new(c.x * factor, c.y * factor);
        }
        self
    }
}

/// Adaptive-threshold quad detector with dictionary decoding.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    params: DetectorParams,
    matcher: Matcher,
}

impl MarkerDetector {
    pub fn new(dict: Dictionary, params: DetectorParams) -> Self {
        let matcher = Matcher::new(dict, params.max_hamming);
        Self { params, matcher }
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Detect markers, keeping the best-scoring detection per id.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<MarkerDetection> {
        // 1) candidate quads over all threshold windows
        let mut quads = Vec::new();
        for win in self.params.window_sizes() {
            let mask = adaptive_threshold_inv(image, win, self.params.adaptive_constant);
            let found = find_quads(&mask, &self.params.quad);
            debug!("threshold window {win}: {} candidate quads", found.len());
            quads.extend(found);
        }
        let quads = dedup_quads(quads, &self.params.quad);

        // 2) decode and orient; quads arrive largest first, so a decoded
        // quad nested inside an earlier one is a border's inner edge
        let mut decoded_quads: Vec<Quad> = Vec::new();
        let mut best: HashMap<u32, MarkerDetection> = HashMap::new();
        for quad in quads {
            let Some(decoded) =
                decode_quad(image, &quad.corners, &self.params.decode, &self.matcher)
            else {
                continue;
            };
            if decoded_quads.iter().any(|outer| outer.contains(&quad)) {
                debug!("dropping nested decode of id {}", decoded.found.id);
                continue;
            }
            decoded_quads.push(quad);
            let m = decoded.found;
            let r = m.rotation as usize;
            let mut corners = [0usize, 1, 2, 3].map(|k| quad.corners[(k + r) % 4]);

            // 3) sub-pixel refinement
            if self.params.refine.enabled {
                for c in &mut corners {
                    *c = refine_corner(image, *c, &self.params.refine);
                }
            }

            let det = MarkerDetection {
                id: m.id,
                corners,
                rotation: m.rotation,
                hamming: m.hamming,
                score: decoded.score,
            };
            match best.get(&det.id) {
                Some(prev) if prev.score >= det.score => {}
                _ => {
                    best.insert(det.id, det);
                }
            }
        }

        let mut out: Vec<MarkerDetection> = best.into_values().collect();
        out.sort_by_key(|d| d.id);
        out
    }
}
