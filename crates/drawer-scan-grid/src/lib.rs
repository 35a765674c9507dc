//! Drawer layouts and the mapping of detected label regions onto them.
//!
//! A [`LayoutTemplate`] describes a case as `columns × rows` grid units with
//! a sparse list of drawers, each anchored at a 1-indexed `(row, col)` and
//! spanning a named [`SizeClass`]. [`GridMapper`] turns label candidates
//! found in the rectified case image into at most one candidate per drawer.

mod candidate;
mod layout;
mod mapper;

pub use candidate::LabelCandidate;
pub use layout::{
    describe_layout, select_layout, CellDefinition, CellPosition, LayoutTemplate, SizeClass,
};
pub use mapper::{
    CellAssignment, CellBoundary, GridMapper, GridMapperParams, GridMapping, MappingPolicy,
};
