//! Perspective rectification of the case region.

use drawer_scan_core::{homography_from_4pt, CornerSet, Homography, PixelRect};
use image::{Rgb, RgbImage};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyParams {
    /// Fixed `[width, height]`; derived from the corner quad when absent.
    pub output_size: Option<[u32; 2]>,
}

#[derive(thiserror::Error, Debug)]
pub enum RectifyError {
    #[error("degenerate rectified size {width}x{height}")]
    DegenerateSize { width: u32, height: u32 },
    #[error("corner quad does not define a perspective transform")]
    Homography,
}

/// Upright view of the case.
#[derive(Clone, Debug)]
pub struct Rectified {
    pub image: RgbImage,
    /// Always `(0, 0, width, height)`.
    pub bounds: PixelRect,
    /// Maps rectified pixel coordinates into the source image.
    pub img_from_rect: Homography,
}

/// Output size from the longer of each pair of opposite edges.
pub fn rectified_size(corners: &CornerSet) -> (u32, u32) {
    let d = |a: Point2<f32>, b: Point2<f32>| (b - a).norm();
    let width = d(corners.tl, corners.tr).max(d(corners.bl, corners.br));
    let height = d(corners.tl, corners.bl).max(d(corners.tr, corners.br));
    (width.round() as u32, height.round() as u32)
}

/// Warp the quad spanned by `corners` onto an axis-aligned rectangle.
///
/// TL, TR, BR, BL land on `(0,0)`, `(w-1,0)`, `(w-1,h-1)`, `(0,h-1)`.
/// Samples falling outside the source read as black.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, corners, params), fields(w = image.width(), h = image.height()))
)]
pub fn rectify(
    image: &RgbImage,
    corners: &CornerSet,
    params: &RectifyParams,
) -> Result<Rectified, RectifyError> {
    let (width, height) = match params.output_size {
        Some([w, h]) => (w, h),
        None => rectified_size(corners),
    };
    if width < 2 || height < 2 {
        return Err(RectifyError::DegenerateSize { width, height });
    }

    let (wf, hf) = ((width - 1) as f32, (height - 1) as f32);
    let rect_pts = [
        Point2::new(0.0, 0.0),
        Point2::new(wf, 0.0),
        Point2::new(wf, hf),
        Point2::new(0.0, hf),
    ];
    let img_from_rect =
        homography_from_4pt(&rect_pts, &corners.to_array()).ok_or(RectifyError::Homography)?;

    let out = RgbImage::from_fn(width, height, |x, y| {
        match img_from_rect.try_apply(x as f64, y as f64) {
            Some((sx, sy)) => sample_rgb_bilinear(image, sx as f32, sy as f32),
            None => Rgb([0, 0, 0]),
        }
    });

    Ok(Rectified {
        image: out,
        bounds: PixelRect::from_size(width, height),
        img_from_rect,
    })
}

#[inline]
fn rgb_at(img: &RgbImage, x: i64, y: i64) -> [f32; 3] {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return [0.0; 3];
    }
    let p = img.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

fn sample_rgb_bilinear(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    if !x.is_finite() || !y.is_finite() {
        return Rgb([0, 0, 0]);
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = rgb_at(img, x0, y0);
    let p10 = rgb_at(img, x0 + 1, y0);
    let p01 = rgb_at(img, x0, y0 + 1);
    let p11 = rgb_at(img, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
