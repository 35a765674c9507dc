use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle in pixel coordinates.
///
/// `x..x + width` and `y..y + height` are the covered pixel ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width × height` image.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shrink by `pad` on every side, then clip to `bounds`.
    pub fn shrink_within(&self, pad: u32, bounds: &PixelRect) -> PixelRect {
        let x0 = (self.x + pad).max(bounds.x);
        let y0 = (self.y + pad).max(bounds.y);
        let x1 = self.right().saturating_sub(pad).min(bounds.right());
        let y1 = self.bottom().saturating_sub(pad).min(bounds.bottom());
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrink_pads_and_clips() {
        let bounds = PixelRect::from_size(100, 50);
        let r = PixelRect::new(10, 10, 200, 20).shrink_within(3, &bounds);
        assert_eq!(r, PixelRect::new(13, 13, 87, 14));
    }

    #[test]
    fn shrinking_thin_rect_collapses_to_empty() {
        let bounds = PixelRect::from_size(100, 100);
        let r = PixelRect::new(10, 10, 4, 40).shrink_within(3, &bounds);
        assert!(r.is_empty());
    }

    #[test]
    fn center_uses_half_extent() {
        let r = PixelRect::new(100, 200, 150, 40);
        assert_eq!(r.center(), (175.0, 220.0));
        assert_eq!(r.area(), 6000);
    }
}
