use drawer_scan_core::PixelRect;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A bright, label-shaped region in the rectified image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub bbox: PixelRect,
    pub center: Point2<f32>,
    /// Area enclosed by the region boundary, in square pixels.
    pub area: f32,
}

impl LabelCandidate {
    /// Candidate whose center is the bounding-box center.
    pub fn from_bbox(bbox: PixelRect, area: f32) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            bbox,
            center: Point2::new(cx, cy),
            area,
        }
    }
}
