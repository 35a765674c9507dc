//! Candidate quadrilaterals from a binarized image.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Shape filters applied to contour polygons.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadParams {
    /// Minimum contour length relative to the larger image side.
    pub min_perimeter_rate: f32,
    /// Maximum contour length relative to the larger image side.
    pub max_perimeter_rate: f32,
    /// Polygon approximation tolerance relative to the contour length.
    pub poly_accuracy_rate: f32,
    /// Shortest allowed side relative to the quad perimeter.
    pub min_corner_distance_rate: f32,
    /// Corners closer than this to the image border are rejected.
    pub min_distance_to_border: f32,
    /// Quads whose corners are on average closer than this fraction of the
    /// perimeter are treated as the same marker.
    pub min_marker_distance_rate: f32,
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            min_perimeter_rate: 0.01,
            max_perimeter_rate: 4.0,
            poly_accuracy_rate: 0.08,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3.0,
            min_marker_distance_rate: 0.05,
        }
    }
}

/// A convex quad with corners in clockwise image order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Quad {
    pub corners: [Point2<f32>; 4],
    pub perimeter: f32,
}

/// Extract marker-like quads from a foreground mask.
pub(crate) fn find_quads(mask: &GrayImage, params: &QuadParams) -> Vec<Quad> {
    let (w, h) = mask.dimensions();
    let max_side = w.max(h) as f32;
    let min_len = (params.min_perimeter_rate * max_side) as usize;
    let max_len = (params.max_perimeter_rate * max_side) as usize;

    let mut out = Vec::new();
    for contour in find_contours::<i32>(mask) {
        let n = contour.points.len();
        if n < min_len.max(4) || n > max_len {
            continue;
        }

        let eps = arc_length(&contour.points, true) * params.poly_accuracy_rate as f64;
        if eps <= 0.0 {
            continue;
        }
        let poly = approximate_closed(&contour.points, eps);
        let Some(corners) = as_quad(&poly) else {
            continue;
        };
        let Some(quad) = Quad::from_corners(corners) else {
            continue;
        };

        let min_side = quad.min_side();
        if min_side < params.min_corner_distance_rate * quad.perimeter {
            continue;
        }
        let b = params.min_distance_to_border;
        if quad.corners.iter().any(|p| {
            p.x < b || p.y < b || p.x > (w as f32 - 1.0 - b) || p.y > (h as f32 - 1.0 - b)
        }) {
            continue;
        }
        out.push(quad);
    }
    out
}

/// Douglas-Peucker on a closed contour.
///
/// The contour is split at the point farthest from its start so that both
/// halves are open chains, then vertices that end up collinear with their
/// neighbours are dropped.
fn approximate_closed(points: &[Point<i32>], eps: f64) -> Vec<Point<i32>> {
    let Some(&start) = points.first() else {
        return Vec::new();
    };
    let dist2 = |p: &Point<i32>| {
        let (dx, dy) = ((p.x - start.x) as i64, (p.y - start.y) as i64);
        dx * dx + dy * dy
    };
    let Some((far, _)) = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| dist2(p))
        .filter(|(i, _)| *i > 0)
    else {
        return Vec::new();
    };

    let mut second: Vec<Point<i32>> = points[far..].to_vec();
    second.push(start);

    let mut poly = approximate_polygon_dp(&points[..=far], eps, false);
    let tail = approximate_polygon_dp(&second, eps, false);
    if tail.len() > 2 {
        poly.extend_from_slice(&tail[1..tail.len() - 1]);
    }
    drop_collinear(poly, eps)
}

fn drop_collinear(mut poly: Vec<Point<i32>>, eps: f64) -> Vec<Point<i32>> {
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    loop {
        let n = poly.len();
        if n <= 3 {
            return poly;
        }
        let flat = (0..n).find(|&i| {
            let a = poly[(i + n - 1) % n];
            let b = poly[i];
            let c = poly[(i + 1) % n];
            distance_to_line(b, a, c) <= eps
        });
        match flat {
            Some(i) => {
                poly.remove(i);
            }
            None => return poly,
        }
    }
}

fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        return ((p.x - a.x) as f64).hypot((p.y - a.y) as f64);
    }
    (dy * (p.x - a.x) as f64 - dx * (p.y - a.y) as f64).abs() / len
}

fn as_quad(poly: &[Point<i32>]) -> Option<[Point2<f32>; 4]> {
    if poly.len() != 4 {
        return None;
    }
    Some([0, 1, 2, 3].map(|i| Point2::new(poly[i].x as f32, poly[i].y as f32)))
}

impl Quad {
    /// Validate convexity and reorder clockwise (y axis down).
    pub(crate) fn from_corners(mut corners: [Point2<f32>; 4]) -> Option<Self> {
        let mut sign = 0.0f32;
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            let c = corners[(i + 2) % 4];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < f32::EPSILON {
                return None;
            }
            if sign != 0.0 && cross.signum() != sign {
                return None;
            }
            sign = cross.signum();
        }
        if sign < 0.0 {
            corners.swap(1, 3);
        }

        let perimeter = (0..4)
            .map(|i| (corners[(i + 1) % 4] - corners[i]).norm())
            .sum();
        Some(Self { corners, perimeter })
    }

    fn min_side(&self) -> f32 {
        (0..4)
            .map(|i| (self.corners[(i + 1) % 4] - self.corners[i]).norm())
            .fold(f32::INFINITY, f32::min)
    }

    /// Mean corner distance to `other` under the best cyclic alignment.
    fn mean_corner_distance(&self, other: &Quad) -> f32 {
        (0..4)
            .map(|shift| {
                (0..4)
                    .map(|i| (self.corners[i] - other.corners[(i + shift) % 4]).norm())
                    .sum::<f32>()
                    / 4.0
            })
            .fold(f32::INFINITY, f32::min)
    }
}

/// Collapse near-duplicate quads, keeping the one with the larger perimeter.
///
/// The same marker seen at several threshold window sizes produces such
/// duplicates. Nested quads (a border's inner edge, a white quiet zone
/// around a marker) are all kept; decoding tells them apart.
pub(crate) fn dedup_quads(mut quads: Vec<Quad>, params: &QuadParams) -> Vec<Quad> {
    quads.sort_by(|a, b| b.perimeter.total_cmp(&a.perimeter));
    let mut kept: Vec<Quad> = Vec::with_capacity(quads.len());
    for q in quads {
        let dup = kept.iter().any(|k| {
            let limit = params.min_marker_distance_rate * k.perimeter.min(q.perimeter);
            k.mean_corner_distance(&q) < limit.max(1.0)
        });
        if !dup {
            kept.push(q);
        }
    }
    kept
}

impl Quad {
    /// True when every corner of `other` lies inside this quad and the two
    /// are of comparable size.
    pub(crate) fn contains(&self, other: &Quad) -> bool {
        if other.perimeter < 0.6 * self.perimeter {
            return false;
        }
        other.corners.iter().all(|p| self.contains_point(*p))
    }

    fn contains_point(&self, p: Point2<f32>) -> bool {
        (0..4).all(|i| {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
        })
    }
}
