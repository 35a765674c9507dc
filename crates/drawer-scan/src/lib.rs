//! Read drawer labels from a single photo of a storage case.
//!
//! The case carries four ArUco markers at its corners. A scan runs:
//!
//! 1. fiducial detection ([`drawer_scan_aruco::FiducialDetector`]),
//! 2. perspective rectification ([`rectify()`]),
//! 3. white label candidate extraction ([`extract_label_candidates`]),
//! 4. grid mapping onto the selected layout ([`drawer_scan_grid::GridMapper`]),
//! 5. per-drawer label cropping and text extraction ([`TextExtractor`]),
//! 6. diagnostics and result artifacts.
//!
//! [`DrawerScanner`] wires the stages together; layouts and drawer sizes come
//! from a [`LayoutCatalog`].
//!
//! ```no_run
//! use drawer_scan::{DrawerScanner, HttpCatalog, LayoutCatalog, OllamaTextExtractor, ScanConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = HttpCatalog::new("http://localhost:3002", std::time::Duration::from_secs(10))?;
//! let templates = catalog.layout_templates()?;
//! let sizes = catalog.size_classes()?;
//! let layout = drawer_scan::select_layout(&templates, "10x10").ok_or("no layout")?;
//!
//! let config = ScanConfig::default();
//! let extractor = OllamaTextExtractor::new(config.ollama.clone())?;
//! let scanner = DrawerScanner::new(config, Box::new(extractor))?;
//! let image = image::open("case.jpg")?.to_rgb8();
//! let outcome = scanner.scan(&image, layout, &sizes, Some("out".as_ref()))?;
//! println!("{}", outcome.summary_line());
//! # Ok(())
//! # }
//! ```

mod candidates;
mod catalog;
mod config;
mod diagnostics;
mod labels;
mod pipeline;
mod rectify;
mod report;
mod text;

pub use candidates::{extract_label_candidates, CandidateExtraction, LabelCandidateParams};
pub use catalog::{CatalogError, CatalogSnapshot, FileCatalog, HttpCatalog, LayoutCatalog};
pub use config::{ConfigError, ScanConfig};
pub use diagnostics::{render_diagnostics, DiagnosticsParams};
pub use labels::{crop_label, label_file_name, LabelCropParams};
pub use pipeline::{DrawerScanner, ScanError, ScanOutcome};
pub use rectify::{rectified_size, rectify, Rectified, RectifyError, RectifyParams};
pub use report::{ResultRecord, ScanReport, ScanSummary, TimingsMs};
pub use text::{
    clean_ocr_text, OcrBackend, OllamaParams, OllamaTextExtractor, TesseractParams,
    TesseractTextExtractor, TextError, TextExtractor,
};

pub use drawer_scan_aruco::{CornerMap, FiducialDetector, FiducialError, FiducialParams};
pub use drawer_scan_core::{init_with_level, CaseCorner, CornerSet, PixelRect};
pub use drawer_scan_grid::{
    describe_layout, select_layout, CellDefinition, CellPosition, GridMapper, GridMapperParams,
    GridMapping, LabelCandidate, LayoutTemplate, MappingPolicy, SizeClass,
};

#[cfg(feature = "tracing")]
pub use drawer_scan_core::init_tracing;
