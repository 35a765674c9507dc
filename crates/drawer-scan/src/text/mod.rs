//! Text extraction from label crops.
//!
//! The pipeline only sees [`TextExtractor`]; each backend lives in its own
//! module.

mod cleanup;
mod ollama;
mod tesseract;

pub use cleanup::clean_ocr_text;
pub use ollama::{OllamaParams, OllamaTextExtractor};
pub use tesseract::{TesseractParams, TesseractTextExtractor};

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum TextError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service answered with status {0}")]
    Status(u16),
    #[error("failed to encode label image: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("text extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("OCR engine failed: {0}")]
    Engine(String),
}

/// Opaque "image in, text out" capability.
pub trait TextExtractor: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &str;

    fn extract_text(&self, crop: &RgbImage) -> Result<String, TextError>;

    /// Whether raw output should go through [`clean_ocr_text`].
    fn needs_cleanup(&self) -> bool {
        false
    }
}

/// Which adapter the CLI builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OcrBackend {
    /// Vision-language model served by Ollama.
    #[default]
    Ollama,
    /// Local `tesseract` binary.
    Tesseract,
}

pub(crate) fn encode_png(img: &RgbImage) -> Result<Vec<u8>, TextError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
