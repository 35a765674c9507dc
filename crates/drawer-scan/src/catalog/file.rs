use super::{CatalogError, LayoutCatalog};
use drawer_scan_grid::{LayoutTemplate, SizeClass};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Offline copy of the catalog.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub layout_templates: Vec<LayoutTemplate>,
    #[serde(default)]
    pub drawer_sizes: Vec<SizeClass>,
}

impl CatalogSnapshot {
    /// Write this snapshot to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Catalog backed by a JSON snapshot file.
#[derive(Clone, Debug, Default)]
pub struct FileCatalog {
    snapshot: CatalogSnapshot,
}

impl FileCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }
}

impl LayoutCatalog for FileCatalog {
    fn layout_templates(&self) -> Result<Vec<LayoutTemplate>, CatalogError> {
        Ok(self.snapshot.layout_templates.clone())
    }

    fn size_classes(&self) -> Result<Vec<SizeClass>, CatalogError> {
        Ok(self.snapshot.drawer_sizes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawer_scan_grid::CellDefinition;

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        let snapshot = CatalogSnapshot {
            layout_templates: vec![LayoutTemplate {
                name: "Bench".to_string(),
                columns: 2,
                rows: 1,
                cells: vec![CellDefinition {
                    row: 1,
                    col: 2,
                    size: "small".to_string(),
                }],
            }],
            drawer_sizes: vec![SizeClass {
                name: "small".to_string(),
                width_units: 1,
                height_units: 1,
            }],
        };
        snapshot.write_json(&path).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"layoutTemplates\""));
        assert!(raw.contains("\"layoutData\""));

        let catalog = FileCatalog::load(&path).expect("load");
        assert_eq!(catalog.layout_templates().expect("templates"), snapshot.layout_templates);
        assert_eq!(catalog.size_classes().expect("sizes"), snapshot.drawer_sizes);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            FileCatalog::load("/nonexistent/catalog.json"),
            Err(CatalogError::Io(_))
        ));
    }
}
