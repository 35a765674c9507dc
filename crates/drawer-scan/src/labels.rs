use drawer_scan_core::PixelRect;
use drawer_scan_grid::CellPosition;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelCropParams {
    /// Pixels trimmed from every side of the candidate box.
    pub padding: u32,
}

impl Default for LabelCropParams {
    fn default() -> Self {
        Self { padding: 3 }
    }
}

/// Crop a label, shrunk by `padding` and clamped to the image.
///
/// Returns `None` when nothing is left after padding.
pub fn crop_label(image: &RgbImage, bbox: &PixelRect, padding: u32) -> Option<RgbImage> {
    let bounds = PixelRect::from_size(image.width(), image.height());
    let r = bbox.shrink_within(padding, &bounds);
    if r.is_empty() {
        return None;
    }
    Some(imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image())
}

/// File name used to persist the crop for a drawer.
pub fn label_file_name(pos: CellPosition) -> String {
    format!("label_r{}_c{}.png", pos.row, pos.col)
}
