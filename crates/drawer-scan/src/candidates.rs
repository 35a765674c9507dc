//! White label candidates in the rectified case image.

use drawer_scan_core::PixelRect;
use drawer_scan_grid::LabelCandidate;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::point::Point;
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Color and shape filters for label regions.
///
/// Saturation and value use the 0-255 HSV scale.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelCandidateParams {
    pub max_saturation: u8,
    pub min_value: u8,
    /// Radius of the square opening element (radius 3 is a 7×7 square).
    pub open_radius: u8,
    /// Radius of the square closing element.
    pub close_radius: u8,
    /// Width must exceed this.
    pub min_width: u32,
    /// Height must lie strictly between these.
    pub min_height: u32,
    pub max_height: u32,
    /// Width / height must exceed this.
    pub min_aspect: f32,
    /// Enclosed area must exceed this.
    pub min_area: f32,
    /// Regions must stay strictly further than this from every image edge.
    pub edge_margin: u32,
    /// Keep the raw, opened and closed masks for diagnostics.
    pub keep_masks: bool,
}

impl Default for LabelCandidateParams {
    fn default() -> Self {
        Self {
            max_saturation: 40,
            min_value: 180,
            open_radius: 3,
            close_radius: 5,
            min_width: 100,
            min_height: 20,
            max_height: 150,
            min_aspect: 2.0,
            min_area: 3000.0,
            edge_margin: 50,
            keep_masks: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CandidateExtraction {
    /// Sorted by top edge, then left edge.
    pub candidates: Vec<LabelCandidate>,
    /// Raw, opened and closed masks when `keep_masks` is set.
    pub masks: Option<[GrayImage; 3]>,
}

/// Near-white pixels: low saturation, high value.
fn white_mask(img: &RgbImage, params: &LabelCandidateParams) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let s = if v == 0 {
            0
        } else {
            ((255 * (v - min) as u32 + v as u32 / 2) / v as u32) as u8
        };
        if s <= params.max_saturation && v >= params.min_value {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Shoelace area of a closed pixel polygon.
fn polygon_area(points: &[Point<i32>]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    twice.unsigned_abs() as f32 * 0.5
}

fn bounding_rect(points: &[Point<i32>]) -> Option<PixelRect> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(PixelRect::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

impl LabelCandidateParams {
    fn accepts(&self, bbox: &PixelRect, area: f32, img_w: u32, img_h: u32) -> bool {
        let (w, h) = (bbox.width, bbox.height);
        let m = self.edge_margin;
        w > self.min_width
            && h > self.min_height
            && h < self.max_height
            && w as f32 / h as f32 > self.min_aspect
            && area > self.min_area
            && bbox.x > m
            && bbox.y > m
            && bbox.right() + m < img_w
            && bbox.bottom() + m < img_h
    }
}

/// Find label-shaped near-white regions.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(w = img.width(), h = img.height()))
)]
pub fn extract_label_candidates(
    img: &RgbImage,
    params: &LabelCandidateParams,
) -> CandidateExtraction {
    let raw = white_mask(img, params);
    let opened = morphology::open(&raw, Norm::LInf, params.open_radius);
    let closed = morphology::close(&opened, Norm::LInf, params.close_radius);

    let mut candidates = Vec::new();
    for contour in find_contours::<i32>(&closed) {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let Some(bbox) = bounding_rect(&contour.points) else {
            continue;
        };
        let area = polygon_area(&contour.points);
        if params.accepts(&bbox, area, img.width(), img.height()) {
            candidates.push(LabelCandidate::from_bbox(bbox, area));
        } else {
            debug!("rejected region {bbox:?} (area {area:.0})");
        }
    }
    candidates.sort_by_key(|c| (c.bbox.y, c.bbox.x));
    debug!("{} label candidates", candidates.len());

    CandidateExtraction {
        candidates,
        masks: params.keep_masks.then(|| [raw, opened, closed]),
    }
}
