//! Label-to-drawer assignment.
//!
//! Two policies share one entry point:
//! - `Uniform`: the case is `columns × rows` equal cells and a candidate
//!   belongs to the cell its center falls in.
//! - `VariableSize`: each drawer spans `width_units × height_units` cells;
//!   a candidate goes to the drawer with the nearest center, provided it
//!   lies inside that drawer's rectangle grown by a relative margin.
//!
//! In both cases a drawer keeps the largest candidate that maps to it.

use crate::{CellPosition, LabelCandidate, LayoutTemplate, SizeClass};
use drawer_scan_core::PixelRect;
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPolicy {
    Uniform,
    VariableSize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMapperParams {
    /// Force a policy; by default `VariableSize` is used whenever size
    /// classes are available.
    pub policy: Option<MappingPolicy>,
    /// Variable-size acceptance margin as a fraction of the larger side of
    /// the target drawer.
    pub match_margin: f32,
}

impl Default for GridMapperParams {
    fn default() -> Self {
        Self {
            policy: None,
            match_margin: 0.3,
        }
    }
}

/// Pixel rectangle of one drawer in the rectified image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellBoundary {
    pub position: CellPosition,
    pub size_class: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CellBoundary {
    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            0.5 * (self.left + self.right),
            0.5 * (self.top + self.bottom),
        )
    }

    /// Whether `p` lies inside the rectangle grown by `margin` on every side.
    pub fn contains_with_margin(&self, p: Point2<f32>, margin: f32) -> bool {
        p.x >= self.left - margin
            && p.x <= self.right + margin
            && p.y >= self.top - margin
            && p.y <= self.bottom + margin
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellAssignment {
    /// Index into the candidate slice passed to [`GridMapper::map`].
    pub candidate_index: usize,
    pub candidate: LabelCandidate,
}

/// Outcome of one mapping run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridMapping {
    pub policy: MappingPolicy,
    pub bounds: PixelRect,
    pub unit_width: f32,
    pub unit_height: f32,
    /// Drawer rectangles in layout order; drawers with an unknown size class
    /// are absent.
    pub boundaries: Vec<CellBoundary>,
    /// Serialized as a list of `{row, col, candidate_index, candidate}`.
    #[serde(serialize_with = "assignments_as_list")]
    pub assignments: BTreeMap<CellPosition, CellAssignment>,
}

fn assignments_as_list<S: Serializer>(
    map: &BTreeMap<CellPosition, CellAssignment>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Entry<'a> {
        #[serde(flatten)]
        position: &'a CellPosition,
        #[serde(flatten)]
        assignment: &'a CellAssignment,
    }
    serializer.collect_seq(
        map.iter()
            .map(|(position, assignment)| Entry { position, assignment }),
    )
}

impl GridMapping {
    pub fn get(&self, pos: CellPosition) -> Option<&CellAssignment> {
        self.assignments.get(&pos)
    }

    fn offer(&mut self, pos: CellPosition, candidate_index: usize, candidate: &LabelCandidate) {
        match self.assignments.get(&pos) {
            Some(prev) if candidate.area <= prev.candidate.area => {
                debug!(
                    "cell {pos}: keeping candidate {} (area {:.0}) over {candidate_index} (area {:.0})",
                    prev.candidate_index, prev.candidate.area, candidate.area
                );
            }
            _ => {
                self.assignments.insert(
                    pos,
                    CellAssignment {
                        candidate_index,
                        candidate: candidate.clone(),
                    },
                );
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GridMapper {
    params: GridMapperParams,
}

impl GridMapper {
    pub fn new(params: GridMapperParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &GridMapperParams {
        &self.params
    }

    /// Policy used for a run with the given size classes.
    pub fn select_policy(&self, sizes: &[SizeClass]) -> MappingPolicy {
        match self.params.policy {
            Some(p) => p,
            None if sizes.is_empty() => MappingPolicy::Uniform,
            None => MappingPolicy::VariableSize,
        }
    }

    /// Assign candidates (in discovery order) to the layout's drawers.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(layout = %layout.name, candidates = candidates.len()))
    )]
    pub fn map(
        &self,
        candidates: &[LabelCandidate],
        bounds: &PixelRect,
        layout: &LayoutTemplate,
        sizes: &[SizeClass],
    ) -> GridMapping {
        let policy = self.select_policy(sizes);
        let unit_width = bounds.width as f32 / layout.columns.max(1) as f32;
        let unit_height = bounds.height as f32 / layout.rows.max(1) as f32;

        let mut mapping = GridMapping {
            policy,
            bounds: *bounds,
            unit_width,
            unit_height,
            boundaries: Vec::new(),
            assignments: BTreeMap::new(),
        };
        if layout.cells.is_empty() || layout.columns == 0 || layout.rows == 0 {
            return mapping;
        }

        match policy {
            MappingPolicy::Uniform => {
                mapping.boundaries = unit_boundaries(layout, bounds, unit_width, unit_height);
                for (i, cand) in candidates.iter().enumerate() {
                    let pos = uniform_cell(cand.center, layout, bounds, unit_width, unit_height);
                    if layout.contains(pos) {
                        mapping.offer(pos, i, cand);
                    } else {
                        debug!("candidate {i} falls in undefined cell {pos}");
                    }
                }
            }
            MappingPolicy::VariableSize => {
                mapping.boundaries =
                    sized_boundaries(layout, sizes, bounds, unit_width, unit_height);
                for (i, cand) in candidates.iter().enumerate() {
                    let Some(cell) = nearest_boundary(&mapping.boundaries, cand.center) else {
                        continue;
                    };
                    let margin = self.params.match_margin * cell.width().max(cell.height());
                    if cell.contains_with_margin(cand.center, margin) {
                        let pos = cell.position;
                        mapping.offer(pos, i, cand);
                    } else {
                        debug!("candidate {i} too far from nearest drawer {}", cell.position);
                    }
                }
            }
        }

        debug!(
            "{:?} mapping: {} of {} candidates assigned",
            policy,
            mapping.assignments.len(),
            candidates.len()
        );
        mapping
    }
}

fn uniform_cell(
    center: Point2<f32>,
    layout: &LayoutTemplate,
    bounds: &PixelRect,
    unit_width: f32,
    unit_height: f32,
) -> CellPosition {
    let index = |offset: f32, unit: f32, count: u32| -> u32 {
        let i = (offset / unit).floor();
        if i.is_nan() || i < 0.0 {
            0
        } else {
            (i as u32).min(count - 1)
        }
    };
    let col = index(center.x - bounds.x as f32, unit_width, layout.columns);
    let row = index(center.y - bounds.y as f32, unit_height, layout.rows);
    CellPosition::new(row + 1, col + 1)
}

fn unit_boundaries(
    layout: &LayoutTemplate,
    bounds: &PixelRect,
    unit_width: f32,
    unit_height: f32,
) -> Vec<CellBoundary> {
    layout
        .cells
        .iter()
        .map(|cell| {
            boundary_at(cell.position(), cell.size.clone(), 1, 1, bounds, unit_width, unit_height)
        })
        .collect()
}

fn sized_boundaries(
    layout: &LayoutTemplate,
    sizes: &[SizeClass],
    bounds: &PixelRect,
    unit_width: f32,
    unit_height: f32,
) -> Vec<CellBoundary> {
    let by_name: HashMap<&str, &SizeClass> = sizes.iter().map(|s| (s.name.as_str(), s)).collect();
    let mut out = Vec::with_capacity(layout.cells.len());
    for cell in &layout.cells {
        let Some(size) = by_name.get(cell.size.as_str()) else {
            warn!(
                "unknown drawer size {:?} at {}; skipping",
                cell.size,
                cell.position()
            );
            continue;
        };
        out.push(boundary_at(
            cell.position(),
            cell.size.clone(),
            size.width_units,
            size.height_units,
            bounds,
            unit_width,
            unit_height,
        ));
    }
    out
}

fn boundary_at(
    pos: CellPosition,
    size_class: String,
    width_units: u32,
    height_units: u32,
    bounds: &PixelRect,
    unit_width: f32,
    unit_height: f32,
) -> CellBoundary {
    let left = bounds.x as f32 + pos.col.saturating_sub(1) as f32 * unit_width;
    let top = bounds.y as f32 + pos.row.saturating_sub(1) as f32 * unit_height;
    CellBoundary {
        position: pos,
        size_class,
        left,
        top,
        right: left + width_units as f32 * unit_width,
        bottom: top + height_units as f32 * unit_height,
    }
}

/// Nearest drawer center; ties keep the earlier drawer in layout order.
fn nearest_boundary(boundaries: &[CellBoundary], p: Point2<f32>) -> Option<&CellBoundary> {
    let mut best: Option<(&CellBoundary, f32)> = None;
    for b in boundaries {
        let d2 = (b.center() - p).norm_squared();
        if best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((b, d2));
        }
    }
    best.map(|(b, _)| b)
}
