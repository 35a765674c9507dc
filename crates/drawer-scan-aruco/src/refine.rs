//! Sub-pixel corner refinement.
//!
//! Each corner moves to the point where the image gradients inside a small
//! window are orthogonal to the vectors from that point, the same criterion
//! used by OpenCV's `cornerSubPix`.

use drawer_scan_core::{sample_bilinear, GrayImageView};
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerRefineParams {
    pub enabled: bool,
    /// Half-size of the search window in pixels.
    pub window: u32,
    pub max_iterations: u32,
    /// Stop once a step moves the corner less than this many pixels.
    pub epsilon: f32,
}

impl Default for CornerRefineParams {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 5,
            max_iterations: 30,
            epsilon: 0.01,
        }
    }
}

/// Refine one corner; returns the input unchanged when the solve is
/// ill-conditioned or drifts outside the window.
pub(crate) fn refine_corner(
    img: &GrayImageView<'_>,
    start: Point2<f32>,
    params: &CornerRefineParams,
) -> Point2<f32> {
    let win = params.window.max(1) as i32;
    let sigma = win as f32;
    let mut c = start;

    for _ in 0..params.max_iterations {
        let mut g = Matrix2::<f32>::zeros();
        let mut b = Vector2::<f32>::zeros();

        for j in -win..=win {
            for i in -win..=win {
                let p = Point2::new(c.x + i as f32, c.y + j as f32);
                let gx = 0.5
                    * (sample_bilinear(img, p.x + 1.0, p.y) - sample_bilinear(img, p.x - 1.0, p.y));
                let gy = 0.5
                    * (sample_bilinear(img, p.x, p.y + 1.0) - sample_bilinear(img, p.x, p.y - 1.0));
                let w = (-((i * i + j * j) as f32) / (2.0 * sigma * sigma)).exp();

                let gxx = w * gx * gx;
                let gxy = w * gx * gy;
                let gyy = w * gy * gy;
                g[(0, 0)] += gxx;
                g[(0, 1)] += gxy;
                g[(1, 0)] += gxy;
                g[(1, 1)] += gyy;
                b[0] += gxx * p.x + gxy * p.y;
                b[1] += gxy * p.x + gyy * p.y;
            }
        }

        let Some(next) = g.try_inverse().map(|inv| inv * b) else {
            return start;
        };
        let next = Point2::new(next[0], next[1]);
        let step = (next - c).norm();
        c = next;
        if !step.is_finite() {
            return start;
        }
        if step < params.epsilon {
            break;
        }
    }

    if (c - start).norm() > win as f32 {
        return start;
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn converges_to_corner_of_dark_square() {
        // Dark square covering pixels 20..=59; its top-left corner in
        // pixel-center coordinates is (19.5, 19.5).
        let (w, h) = (80usize, 80usize);
        let mut data = vec![230u8; w * h];
        for y in 20..60 {
            for x in 20..60 {
                data[y * w + x] = 20;
            }
        }
        let view = GrayImageView::new(w, h, &data).expect("view");

        let got = refine_corner(&view, Point2::new(21.0, 21.5), &CornerRefineParams::default());
        assert_abs_diff_eq!(got.x, 19.5, epsilon = 0.3);
        assert_abs_diff_eq!(got.y, 19.5, epsilon = 0.3);
    }

    #[test]
    fn flat_region_keeps_input() {
        let data = vec![128u8; 40 * 40];
        let view = GrayImageView::new(40, 40, &data).expect("view");
        let p = Point2::new(20.0, 20.0);
        assert_eq!(refine_corner(&view, p, &CornerRefineParams::default()), p);
    }
}
