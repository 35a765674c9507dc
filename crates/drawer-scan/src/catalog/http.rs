use super::{CatalogError, Envelope, LayoutCatalog};
use drawer_scan_grid::{LayoutTemplate, SizeClass};
use log::info;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3002";

/// REST catalog serving `/api/v1/layout-templates` and `/api/v1/drawer-sizes`.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CatalogError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, CatalogError> {
        let url = self.url(path);
        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(source) => return Err(CatalogError::Http { url, source }),
        };
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let envelope: Envelope<T> = match resp.json() {
            Ok(envelope) => envelope,
            Err(source) => return Err(CatalogError::Http { url, source }),
        };
        let items = envelope.into_items(&url)?;
        info!("fetched {} entries from {url}", items.len());
        Ok(items)
    }
}

impl Default for HttpCatalog {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl LayoutCatalog for HttpCatalog {
    fn layout_templates(&self) -> Result<Vec<LayoutTemplate>, CatalogError> {
        self.get_list("layout-templates")
    }

    fn size_classes(&self) -> Result<Vec<SizeClass>, CatalogError> {
        self.get_list("drawer-sizes")
    }
}
