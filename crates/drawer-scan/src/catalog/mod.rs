//! Layout templates and drawer sizes from an external catalog.

mod file;
mod http;

pub use file::{CatalogSnapshot, FileCatalog};
pub use http::HttpCatalog;

use drawer_scan_grid::{LayoutTemplate, SizeClass};
use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("catalog at {url} reported failure")]
    Rejected { url: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Source of layout templates and drawer size classes.
pub trait LayoutCatalog {
    fn layout_templates(&self) -> Result<Vec<LayoutTemplate>, CatalogError>;
    fn size_classes(&self) -> Result<Vec<SizeClass>, CatalogError>;
}

/// Catalog responses come either wrapped as `{"success": .., "data": [..]}`
/// or as a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped {
        #[serde(default)]
        success: Option<bool>,
        data: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> Envelope<T> {
    pub(crate) fn into_items(self, url: &str) -> Result<Vec<T>, CatalogError> {
        match self {
            Envelope::Wrapped {
                success: Some(false),
                ..
            } => Err(CatalogError::Rejected {
                url: url.to_string(),
            }),
            Envelope::Wrapped { data, .. } => Ok(data),
            Envelope::Bare(items) => Ok(items),
        }
    }
}
