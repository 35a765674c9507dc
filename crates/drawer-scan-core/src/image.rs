/// Borrowed 8-bit grayscale image, row-major with `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> GrayImageView<'a> {
    /// Wrap a raw buffer. Returns `None` when the length does not match.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if !src.contains(x, y) {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Bilinear sample; pixels outside the image read as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let data = [0u8, 100, 200, 50];
        let view = GrayImageView::new(2, 2, &data).expect("view");
        assert_eq!(sample_bilinear(&view, 0.0, 0.0), 0.0);
        assert_eq!(sample_bilinear(&view, 0.5, 0.0), 50.0);
        assert_eq!(sample_bilinear(&view, 0.5, 0.5), 87.5);
    }

    #[test]
    fn view_rejects_mismatched_length() {
        assert!(GrayImageView::new(3, 3, &[0u8; 8]).is_none());
    }
}
