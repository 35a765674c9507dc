use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four outer corners of a drawer case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseCorner {
    #[serde(rename = "TL")]
    TopLeft,
    #[serde(rename = "TR")]
    TopRight,
    #[serde(rename = "BR")]
    BottomRight,
    #[serde(rename = "BL")]
    BottomLeft,
}

impl CaseCorner {
    /// Clockwise order starting at the top-left corner.
    pub const ALL: [CaseCorner; 4] = [
        CaseCorner::TopLeft,
        CaseCorner::TopRight,
        CaseCorner::BottomRight,
        CaseCorner::BottomLeft,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            CaseCorner::TopLeft => 0,
            CaseCorner::TopRight => 1,
            CaseCorner::BottomRight => 2,
            CaseCorner::BottomLeft => 3,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            CaseCorner::TopLeft => "TL",
            CaseCorner::TopRight => "TR",
            CaseCorner::BottomRight => "BR",
            CaseCorner::BottomLeft => "BL",
        }
    }
}

impl fmt::Display for CaseCorner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Image-space positions of the four case corners.
///
/// A `CornerSet` only exists when all four corners are known.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub tl: Point2<f32>,
    pub tr: Point2<f32>,
    pub br: Point2<f32>,
    pub bl: Point2<f32>,
}

impl CornerSet {
    /// Build from corners in `CaseCorner::ALL` order.
    pub fn from_array(pts: [Point2<f32>; 4]) -> Self {
        Self {
            tl: pts[0],
            tr: pts[1],
            br: pts[2],
            bl: pts[3],
        }
    }

    /// Build from a partially filled table, `None` when any corner is missing.
    pub fn from_partial(pts: [Option<Point2<f32>>; 4]) -> Option<Self> {
        Some(Self::from_array([pts[0]?, pts[1]?, pts[2]?, pts[3]?]))
    }

    /// Corners in `CaseCorner::ALL` order (TL, TR, BR, BL).
    pub fn to_array(&self) -> [Point2<f32>; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    pub fn get(&self, corner: CaseCorner) -> Point2<f32> {
        self.to_array()[corner.index()]
    }
}
