//! Global and local thresholding used by marker detection.

use drawer_scan_core::GrayImageView;
use image::GrayImage;

/// Otsu threshold over a set of sample intensities.
///
/// Values strictly greater than the returned threshold are "white".
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    let Some((&min_v, &max_v)) = samples
        .iter()
        .min()
        .zip(samples.iter().max())
    else {
        return 127;
    };
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Population standard deviation of the samples.
pub(crate) fn std_dev(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var.sqrt() as f32
}

/// Inverted adaptive mean threshold.
///
/// A pixel becomes foreground (255) when it is at least `c` darker than the
/// mean of the `window × window` block around it. Blocks are clipped at the
/// image border.
pub(crate) fn adaptive_threshold_inv(src: &GrayImageView<'_>, window: usize, c: f32) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut out = GrayImage::new(w as u32, h as u32);
    if w == 0 || h == 0 {
        return out;
    }

    // Summed-area table with a zero guard row and column.
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += src.data[y * w + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let r = window.max(1) / 2;
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r + 1).min(w);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let mean = sum as f32 / ((y1 - y0) * (x1 - x0)) as f32;
            if (src.data[y * w + x] as f32) <= mean - c {
                out.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }
    out
}
