//! Bit sampling and dictionary lookup for a candidate quad.

use crate::threshold::{otsu_threshold, std_dev};
use crate::{Match, Matcher};
use drawer_scan_core::{homography_from_4pt, sample_bilinear_u8, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Marker bit-reading parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Fraction of each cell side ignored near its edges.
    pub ignored_margin_per_cell: f32,
    /// Samples per cell side inside the non-ignored area.
    pub samples_per_cell: usize,
    /// Candidates whose samples vary less than this are blank patches.
    pub min_otsu_std_dev: f32,
    /// Maximum fraction of border cells allowed to read as white.
    pub max_erroneous_border_rate: f32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            border_bits: 1,
            ignored_margin_per_cell: 0.13,
            samples_per_cell: 4,
            min_otsu_std_dev: 5.0,
            max_erroneous_border_rate: 0.35,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DecodedQuad {
    pub found: Match,
    /// Fraction of border cells that read as black.
    pub border_score: f32,
    pub score: f32,
}

/// Read the bits inside `corners` (clockwise, image space) and match them.
///
/// Corner coordinates follow the pixel-center convention: pixel `(i, j)`
/// covers `[i - 0.5, i + 0.5) × [j - 0.5, j + 0.5)`.
pub(crate) fn decode_quad(
    img: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    params: &DecodeParams,
    matcher: &Matcher,
) -> Option<DecodedQuad> {
    let bits = matcher.dictionary().marker_size;
    let cells = bits + 2 * params.border_bits;
    let k = params.samples_per_cell.max(1);

    let side = cells as f32;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(side, 0.0),
        Point2::new(side, side),
        Point2::new(0.0, side),
    ];
    let h = homography_from_4pt(&square, corners)?;

    let samples = sample_cells(img, &h, cells, k, params.ignored_margin_per_cell);
    if std_dev(&samples) < params.min_otsu_std_dev {
        return None;
    }
    let thr = otsu_threshold(&samples);

    let per_cell = k * k;
    let is_black = |cx: usize, cy: usize| {
        let start = (cy * cells + cx) * per_cell;
        let dark = samples[start..start + per_cell]
            .iter()
            .filter(|&&v| v <= thr)
            .count();
        2 * dark > per_cell
    };

    let border = params.border_bits;
    let mut border_total = 0usize;
    let mut border_black = 0usize;
    let mut code = 0u64;
    for cy in 0..cells {
        for cx in 0..cells {
            let black = is_black(cx, cy);
            let in_border =
                cx < border || cy < border || cx >= cells - border || cy >= cells - border;
            if in_border {
                border_total += 1;
                border_black += black as usize;
            } else if black {
                code |= 1u64 << ((cy - border) * bits + (cx - border));
            }
        }
    }

    let border_errors = border_total - border_black;
    if border_errors as f32 > params.max_erroneous_border_rate * border_total as f32 {
        return None;
    }
    let border_score = if border_total == 0 {
        1.0
    } else {
        border_black as f32 / border_total as f32
    };

    let found = matcher.match_code(code)?;
    let ham_pen = 1.0 - found.hamming as f32 / matcher.dictionary().bit_count().max(1) as f32;
    Some(DecodedQuad {
        found,
        border_score,
        score: (border_score * ham_pen).clamp(0.0, 1.0),
    })
}

/// Samples grouped per cell, row-major over cells, `k × k` per cell.
fn sample_cells(
    img: &GrayImageView<'_>,
    h: &Homography,
    cells: usize,
    k: usize,
    margin: f32,
) -> Vec<u8> {
    let margin = margin.clamp(0.0, 0.45);
    let span = 1.0 - 2.0 * margin;
    let step = span / k as f32;

    let mut out = Vec::with_capacity(cells * cells * k * k);
    for cy in 0..cells {
        for cx in 0..cells {
            for sy in 0..k {
                for sx in 0..k {
                    let p = Point2::new(
                        cx as f32 + margin + (sx as f32 + 0.5) * step,
                        cy as f32 + margin + (sy as f32 + 0.5) * step,
                    );
                    let q = h.apply(p);
                    out.push(sample_bilinear_u8(img, q.x, q.y));
                }
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{rotate_code_u64, DICT_4X4_50};

    /// Paint a marker (1-cell black border) of `cell_px` cells at `(x0, y0)`
    /// on a white `w × h` canvas.
    pub(crate) fn paint_marker(
        canvas: &mut [u8],
        w: usize,
        code: u64,
        x0: usize,
        y0: usize,
        cell_px: usize,
    ) {
        let bits = 4;
        let cells = bits + 2;
        for cy in 0..cells {
            for cx in 0..cells {
                let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
                let black = border || (code >> ((cy - 1) * bits + (cx - 1))) & 1 == 1;
                let v = if black { 10u8 } else { 245u8 };
                for yy in 0..cell_px {
                    for xx in 0..cell_px {
                        canvas[(y0 + cy * cell_px + yy) * w + x0 + cx * cell_px + xx] = v;
                    }
                }
            }
        }
    }

    fn square(x0: f32, y0: f32, s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + s, y0),
            Point2::new(x0 + s, y0 + s),
            Point2::new(x0, y0 + s),
        ]
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let (w, h) = (100usize, 100usize);
        let mut data = vec![245u8; w * h];
        paint_marker(&mut data, w, DICT_4X4_50.codes[4], 20, 20, 10);
        let view = GrayImageView::new(w, h, &data).expect("view");

        let matcher = Matcher::new(DICT_4X4_50, 1);
        let d = decode_quad(&view, &square(19.5, 19.5, 60.0), &DecodeParams::default(), &matcher)
            .expect("decoded");
        assert_eq!((d.found.id, d.found.rotation, d.found.hamming), (4, 0, 0));
        assert_eq!(d.border_score, 1.0);
    }

    #[test]
    fn reports_rotation_of_turned_marker() {
        let (w, h) = (100usize, 100usize);
        let mut data = vec![245u8; w * h];
        let turned = rotate_code_u64(DICT_4X4_50.codes[1], 4, 1);
        paint_marker(&mut data, w, turned, 20, 20, 10);
        let view = GrayImageView::new(w, h, &data).expect("view");

        let matcher = Matcher::new(DICT_4X4_50, 1);
        let d = decode_quad(&view, &square(19.5, 19.5, 60.0), &DecodeParams::default(), &matcher)
            .expect("decoded");
        assert_eq!((d.found.id, d.found.rotation), (1, 1));
    }

    #[test]
    fn blank_patch_is_rejected() {
        let data = vec![200u8; 80 * 80];
        let view = GrayImageView::new(80, 80, &data).expect("view");
        let matcher = Matcher::new(DICT_4X4_50, 1);
        assert!(decode_quad(&view, &square(10.0, 10.0, 60.0), &DecodeParams::default(), &matcher)
            .is_none());
    }
}
