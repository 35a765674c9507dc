//! End-to-end scan of one case photo.

use crate::candidates::extract_label_candidates;
use crate::catalog::CatalogError;
use crate::config::{ConfigError, ScanConfig};
use crate::diagnostics::render_diagnostics;
use crate::labels::{crop_label, label_file_name};
use crate::rectify::{rectify, Rectified, RectifyError};
use crate::report::{ResultRecord, ScanReport, ScanSummary, TimingsMs};
use crate::text::{clean_ocr_text, TextError, TextExtractor};
use drawer_scan_aruco::{FiducialDetection, FiducialDetector, FiducialError};
use drawer_scan_grid::{CellPosition, GridMapper, LayoutTemplate, SizeClass};
use image::RgbImage;
use log::{debug, info, warn};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Fiducial(#[from] FiducialError),
    #[error(transparent)]
    Rectify(#[from] RectifyError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Text(#[from] TextError),
}

/// Everything a scan produced.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub fiducials: FiducialDetection,
    pub rectified: Rectified,
    pub report: ScanReport,
}

impl ScanOutcome {
    /// One record per drawer, in layout order.
    pub fn results(&self) -> &[ResultRecord] {
        &self.report.results
    }

    pub fn summary(&self) -> ScanSummary {
        self.report.summary
    }

    pub fn summary_line(&self) -> String {
        let s = self.summary();
        format!(
            "{} of {} cells have detected text",
            s.cells_with_text, s.total_cells
        )
    }
}

/// Runs fiducial detection, rectification, label search, grid mapping and
/// text extraction for one image.
pub struct DrawerScanner {
    config: ScanConfig,
    fiducials: FiducialDetector,
    mapper: GridMapper,
    extractor: Box<dyn TextExtractor>,
}

impl DrawerScanner {
    pub fn new(config: ScanConfig, extractor: Box<dyn TextExtractor>) -> Result<Self, ScanError> {
        let fiducials = FiducialDetector::new(config.fiducial.clone())?;
        let mapper = GridMapper::new(config.mapper.clone());
        Ok(Self {
            config,
            fiducials,
            mapper,
            extractor,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `image` against `layout`. Artifacts are written to `output_dir`
    /// when given.
    ///
    /// Missing fiducials, a degenerate rectification and output I/O errors
    /// abort the scan. Text extraction failures only blank the affected
    /// drawer.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(layout = %layout.name, w = image.width(), h = image.height()))
    )]
    pub fn scan(
        &self,
        image: &RgbImage,
        layout: &LayoutTemplate,
        sizes: &[SizeClass],
        output_dir: Option<&Path>,
    ) -> Result<ScanOutcome, ScanError> {
        let started = Instant::now();
        let mut timings = TimingsMs::default();
        let mut writing = Duration::ZERO;

        if let Some(dir) = output_dir {
            fs::create_dir_all(dir)?;
        }

        let t = Instant::now();
        let fiducials = self.fiducials.detect(image)?;
        timings.detect_fiducials = ms(t.elapsed());
        info!(
            "case corners found after {} pass(es): {:?}",
            fiducials.passes_run, fiducials.corners
        );

        let t = Instant::now();
        let rectified = rectify(image, &fiducials.corners, &self.config.rectify)?;
        timings.rectify = ms(t.elapsed());
        info!(
            "perspective transform: {}x{} -> {}x{}",
            image.width(),
            image.height(),
            rectified.image.width(),
            rectified.image.height()
        );
        if let Some(dir) = output_dir {
            let t = Instant::now();
            rectified.image.save(dir.join("rectified.png"))?;
            writing += t.elapsed();
        }

        let t = Instant::now();
        let extraction = extract_label_candidates(&rectified.image, &self.config.candidates);
        timings.candidates = ms(t.elapsed());
        info!("found {} potential labels", extraction.candidates.len());
        if let (Some(dir), Some(masks)) = (output_dir, &extraction.masks) {
            let t = Instant::now();
            for (i, mask) in masks.iter().enumerate() {
                mask.save(dir.join(format!("debug_mask_{}.png", i + 1)))?;
            }
            writing += t.elapsed();
        }
        let candidates = extraction.candidates;

        let t = Instant::now();
        let mapping = self
            .mapper
            .map(&candidates, &rectified.bounds, layout, sizes);
        timings.mapping = ms(t.elapsed());
        info!(
            "assigned {} labels to grid positions ({:?})",
            mapping.assignments.len(),
            mapping.policy
        );

        let mut results = Vec::with_capacity(layout.cells.len());
        let mut extracting = Duration::ZERO;
        for cell in &layout.cells {
            let pos = cell.position();
            let padding = self.config.crop.padding;
            let crop = mapping
                .get(pos)
                .and_then(|a| crop_label(&rectified.image, &a.candidate.bbox, padding));
            let text = match crop {
                Some(crop) => {
                    if let Some(dir) = output_dir {
                        let t = Instant::now();
                        crop.save(dir.join(label_file_name(pos)))?;
                        writing += t.elapsed();
                    }
                    let t = Instant::now();
                    let text = self.read_label(&crop, pos);
                    extracting += t.elapsed();
                    text
                }
                None => {
                    debug!("row {}, col {}: no label detected", pos.row, pos.col);
                    String::new()
                }
            };
            results.push(ResultRecord {
                row: pos.row,
                col: pos.col,
                text,
            });
        }
        timings.text_extraction = ms(extracting);

        let summary = ScanSummary::from_records(&results);
        let mut report = ScanReport {
            layout: layout.name.clone(),
            image_size: [image.width(), image.height()],
            corners: fiducials.corners,
            fiducial_passes: fiducials.passes_run,
            rectified_size: [rectified.image.width(), rectified.image.height()],
            candidates,
            mapping,
            text_backend: self.extractor.name().to_string(),
            results,
            timings_ms: timings,
            summary,
        };

        if let Some(dir) = output_dir {
            let t = Instant::now();
            let debug_img = render_diagnostics(
                &rectified.image,
                &report.candidates,
                &report.mapping,
                &self.config.diagnostics,
            );
            debug_img.save(dir.join("debug_detection.png"))?;
            fs::write(
                dir.join("ocr_results.json"),
                serde_json::to_string_pretty(&report.results)?,
            )?;
            writing += t.elapsed();
        }
        report.timings_ms.write_outputs = ms(writing);
        report.timings_ms.total = ms(started.elapsed());
        if let Some(dir) = output_dir {
            report.write_json(dir.join("scan_report.json"))?;
            info!("saved results to {}", dir.display());
        }

        Ok(ScanOutcome {
            fiducials,
            rectified,
            report,
        })
    }

    fn read_label(&self, crop: &RgbImage, pos: CellPosition) -> String {
        match self.extractor.extract_text(crop) {
            Ok(raw) if self.extractor.needs_cleanup() => clean_ocr_text(&raw),
            Ok(raw) => raw.trim().to_string(),
            Err(err) => {
                warn!(
                    "{} failed on row {}, col {}: {err}",
                    self.extractor.name(),
                    pos.row,
                    pos.col
                );
                String::new()
            }
        }
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
