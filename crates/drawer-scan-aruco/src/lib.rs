//! ArUco marker detection for drawer-case fiducials.
//!
//! The crate is layered bottom-up:
//! - an embedded 4×4 dictionary and a rotation-aware Hamming matcher,
//! - a single-pass [`MarkerDetector`] (adaptive threshold, quad extraction,
//!   bit decoding, sub-pixel corner refinement),
//! - a multi-pass [`FiducialDetector`] that retries with alternative
//!   preprocessing and maps marker ids to the four case corners through an
//!   explicit [`CornerMap`].

mod decode;
mod detector;
mod dictionary;
mod fiducial;
mod matcher;
mod quad;
mod refine;
mod threshold;

pub use drawer_scan_core::{CaseCorner, CornerSet};

pub use decode::DecodeParams;
pub use detector::{DetectorParams, MarkerDetection, MarkerDetector};
pub use dictionary::{builtin_dictionary, Dictionary, DICT_4X4_50};
pub use fiducial::{
    CornerMap, CornerRule, FiducialDetection, FiducialDetector, FiducialError, FiducialParams,
    MarkerCorner, MissingCorner, PreprocessPass,
};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use quad::QuadParams;
pub use refine::CornerRefineParams;
