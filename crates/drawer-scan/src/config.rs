//! JSON run configuration.

use crate::candidates::LabelCandidateParams;
use crate::diagnostics::DiagnosticsParams;
use crate::labels::LabelCropParams;
use crate::rectify::RectifyParams;
use crate::text::{
    OcrBackend, OllamaParams, OllamaTextExtractor, TesseractParams, TesseractTextExtractor,
    TextError, TextExtractor,
};
use drawer_scan_aruco::FiducialParams;
use drawer_scan_grid::GridMapperParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Every tunable of a scan. Missing sections and fields fall back to their
/// defaults, so `{}` is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub fiducial: FiducialParams,
    pub rectify: RectifyParams,
    pub candidates: LabelCandidateParams,
    pub mapper: GridMapperParams,
    pub crop: LabelCropParams,
    pub diagnostics: DiagnosticsParams,
    pub ocr: OcrBackend,
    pub ollama: OllamaParams,
    pub tesseract: TesseractParams,
}

impl ScanConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build the adapter selected by `ocr`.
    pub fn text_extractor(&self) -> Result<Box<dyn TextExtractor>, TextError> {
        Ok(match self.ocr {
            OcrBackend::Ollama => Box::new(OllamaTextExtractor::new(self.ollama.clone())?),
            OcrBackend::Tesseract => {
                Box::new(TesseractTextExtractor::new(self.tesseract.clone()))
            }
        })
    }
}
