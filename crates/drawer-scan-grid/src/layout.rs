use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-indexed grid position of a drawer; orders row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: u32,
    pub col: u32,
}

impl CellPosition {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One drawer in a layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDefinition {
    pub row: u32,
    pub col: u32,
    /// Name of the drawer's size class.
    pub size: String,
}

impl CellDefinition {
    pub fn position(&self) -> CellPosition {
        CellPosition::new(self.row, self.col)
    }
}

/// A named case layout as served by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    pub name: String,
    pub columns: u32,
    pub rows: u32,
    #[serde(rename = "layoutData", default)]
    pub cells: Vec<CellDefinition>,
}

impl LayoutTemplate {
    pub fn contains(&self, pos: CellPosition) -> bool {
        self.cells.iter().any(|c| c.position() == pos)
    }

    pub fn positions(&self) -> impl Iterator<Item = CellPosition> + '_ {
        self.cells.iter().map(CellDefinition::position)
    }
}

/// Drawer footprint in grid units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeClass {
    pub name: String,
    pub width_units: u32,
    pub height_units: u32,
}

/// First template whose name contains `selector`, ignoring case.
pub fn select_layout<'a>(
    templates: &'a [LayoutTemplate],
    selector: &str,
) -> Option<&'a LayoutTemplate> {
    let needle = selector.to_lowercase();
    templates
        .iter()
        .find(|t| t.name.to_lowercase().contains(&needle))
}

/// One-line summary, e.g. `"Parts case (8x4, 28 drawers)"`.
pub fn describe_layout(t: &LayoutTemplate) -> String {
    format!(
        "{} ({}x{}, {} drawers)",
        t.name,
        t.columns,
        t.rows,
        t.cells.len()
    )
}
