//! Core types and utilities shared by the drawer-scan crates.
//!
//! This crate is small and purely geometric: projective transforms, a
//! borrowed grayscale view with sub-pixel sampling, the four case corners
//! and integer pixel rectangles. It does not depend on any image codec.

mod corner;
mod homography;
mod image;
mod logger;
mod rect;

pub use corner::{CaseCorner, CornerSet};
pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImageView};
pub use rect::PixelRect;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
