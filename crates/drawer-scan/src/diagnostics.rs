//! Annotated overview image for auditing a scan.
//!
//! `row,col` tags are rendered with a TrueType font when one can be loaded,
//! either from [`DiagnosticsParams::font_path`] or from a common system
//! location. Without a font the outlines are still drawn.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use drawer_scan_core::PixelRect;
use drawer_scan_grid::{GridMapping, LabelCandidate, MappingPolicy};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const CANDIDATE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOUNDARY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsParams {
    /// Output size relative to the rectified image.
    pub scale: f32,
    /// Outline thickness for candidates and matches.
    pub line_thickness: u32,
    /// Font for the `row,col` tags. `None` tries the system fonts.
    pub font_path: Option<PathBuf>,
    /// Tag height in output pixels.
    pub font_scale: f32,
}

impl Default for DiagnosticsParams {
    fn default() -> Self {
        Self {
            scale: 0.25,
            line_thickness: 2,
            font_path: None,
            font_scale: 16.0,
        }
    }
}

impl DiagnosticsParams {
    /// Font used for position tags, if any can be loaded.
    ///
    /// An explicit `font_path` that fails to load disables text; it does not
    /// fall back to the system fonts.
    pub fn load_font(&self) -> Option<FontVec> {
        match &self.font_path {
            Some(path) => match read_font(path) {
                Ok(font) => Some(font),
                Err(err) => {
                    warn!("diagnostics font {}: {err}; tags disabled", path.display());
                    None
                }
            },
            None => {
                let font = SYSTEM_FONTS
                    .iter()
                    .find_map(|p| read_font(Path::new(p)).ok());
                if font.is_none() {
                    debug!("no system font found, diagnostics tags disabled");
                }
                font
            }
        }
    }
}

fn read_font(path: &Path) -> Result<FontVec, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;
    FontVec::try_from_vec(data).map_err(|_| "not a valid font file".to_string())
}

/// Downscaled copy of `rectified` with candidates in blue, assigned labels
/// in green tagged `row,col`, and drawer boundaries in red.
pub fn render_diagnostics(
    rectified: &RgbImage,
    candidates: &[LabelCandidate],
    mapping: &GridMapping,
    params: &DiagnosticsParams,
) -> RgbImage {
    let scale = if params.scale > 0.0 { params.scale } else { 1.0 };
    let out_w = ((rectified.width() as f32 * scale) as u32).max(1);
    let out_h = ((rectified.height() as f32 * scale) as u32).max(1);
    let mut img = imageops::resize(rectified, out_w, out_h, imageops::FilterType::Triangle);
    let font = params.load_font();

    let s = |v: f32| (v * scale).floor() as i32;
    let scaled = |r: &PixelRect| {
        (
            s(r.x as f32),
            s(r.y as f32),
            s(r.right() as f32),
            s(r.bottom() as f32),
        )
    };

    for c in candidates {
        let (x1, y1, x2, y2) = scaled(&c.bbox);
        outline(&mut img, x1, y1, x2, y2, params.line_thickness, CANDIDATE_COLOR);
    }

    let text_h = params.font_scale.max(1.0);
    for (pos, a) in &mapping.assignments {
        let (x1, y1, x2, y2) = scaled(&a.candidate.bbox);
        outline(&mut img, x1, y1, x2, y2, params.line_thickness, MATCH_COLOR);
        if let Some(font) = &font {
            let tag = format!("{},{}", pos.row, pos.col);
            let ty = y1 - 5 - text_h.ceil() as i32;
            draw_text_mut(&mut img, MATCH_COLOR, x1, ty, text_h, font, &tag);
        }
    }
    match mapping.policy {
        MappingPolicy::VariableSize => {
            for b in &mapping.boundaries {
                let (x1, y1, x2, y2) = (s(b.left), s(b.top), s(b.right), s(b.bottom));
                outline(&mut img, x1, y1, x2, y2, 1, BOUNDARY_COLOR);
            }
        }
        MappingPolicy::Uniform => {
            let bx = mapping.bounds.x as f32;
            let by = mapping.bounds.y as f32;
            let (left, top) = (bx * scale, by * scale);
            let right = (bx + mapping.bounds.width as f32) * scale;
            let bottom = (by + mapping.bounds.height as f32) * scale;
            if mapping.unit_width > 0.0 {
                let cols = (mapping.bounds.width as f32 / mapping.unit_width).round() as u32;
                for i in 0..=cols {
                    let x = (bx + i as f32 * mapping.unit_width) * scale;
                    draw_line_segment_mut(&mut img, (x, top), (x, bottom), BOUNDARY_COLOR);
                }
            }
            if mapping.unit_height > 0.0 {
                let rows = (mapping.bounds.height as f32 / mapping.unit_height).round() as u32;
                for i in 0..=rows {
                    let y = (by + i as f32 * mapping.unit_height) * scale;
                    draw_line_segment_mut(&mut img, (left, y), (right, y), BOUNDARY_COLOR);
                }
            }
        }
    }

    img
}

/// Rectangle outline grown outward `thickness - 1` pixels.
fn outline(
    img: &mut RgbImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    thickness: u32,
    color: Rgb<u8>,
) {
    if x2 <= x1 || y2 <= y1 {
        return;
    }
    for t in 0..thickness.max(1) as i32 {
        let w = (x2 - x1 + 2 * t) as u32;
        let h = (y2 - y1 + 2 * t) as u32;
        draw_hollow_rect_mut(img, Rect::at(x1 - t, y1 - t).of_size(w, h), color);
    }
}
