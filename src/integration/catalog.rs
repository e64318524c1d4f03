//! Label-to-SKU lookup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Maps detector labels to catalog SKUs.
///
/// Labels the catalog does not know are never tracked.
pub trait Catalog {
    fn lookup_sku(&self, label: &str) -> Option<&str>;

    fn contains(&self, label: &str) -> bool {
        self.lookup_sku(label).is_some()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read SKU map {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse SKU map {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("SKU map entry {label:?} has an empty SKU")]
    EmptySku { label: String },
    #[error("SKU map contains an empty label")]
    EmptyLabel,
    #[error("SKU map has no entries")]
    Empty,
}

/// Either `"apple": "SKU00101"` or `"apple": {"sku": "SKU00101", ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkuEntry {
    Plain(String),
    Detailed { sku: String },
}

impl SkuEntry {
    fn into_sku(self) -> String {
        match self {
            SkuEntry::Plain(sku) | SkuEntry::Detailed { sku } => sku,
        }
    }
}

/// In-memory catalog loaded from a JSON SKU map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuCatalog {
    skus: HashMap<String, String>,
}

impl SkuCatalog {
    pub fn from_json_str(input: &str) -> Result<Self, CatalogError> {
        Self::parse(input, "<inline>")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.display().to_string();
        let content = fs::read_to_string(path_ref).map_err(|source| CatalogError::Io {
            path: path_str.clone(),
            source,
        })?;
        Self::parse(&content, &path_str)
    }

    fn parse(input: &str, path: &str) -> Result<Self, CatalogError> {
        let raw: HashMap<String, SkuEntry> =
            serde_json::from_str(input).map_err(|source| CatalogError::Parse {
                path: path.to_string(),
                source,
            })?;
        if raw.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut skus = HashMap::with_capacity(raw.len());
        for (label, entry) in raw {
            let sku = entry.into_sku();
            if label.trim().is_empty() {
                return Err(CatalogError::EmptyLabel);
            }
            if sku.trim().is_empty() {
                return Err(CatalogError::EmptySku { label });
            }
            skus.insert(label, sku);
        }
        Ok(Self { skus })
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }
}

impl<L: Into<String>, S: Into<String>> FromIterator<(L, S)> for SkuCatalog {
    fn from_iter<I: IntoIterator<Item = (L, S)>>(iter: I) -> Self {
        Self {
            skus: iter
                .into_iter()
                .map(|(label, sku)| (label.into(), sku.into()))
                .collect(),
        }
    }
}

impl Catalog for SkuCatalog {
    fn lookup_sku(&self, label: &str) -> Option<&str> {
        self.skus.get(label).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_plain_and_detailed_entries() {
        let catalog = SkuCatalog::from_json_str(
            r#"{"apple": "SKU00101", "orange": {"sku": "SKU00102", "name": "Navel orange"}}"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup_sku("apple"), Some("SKU00101"));
        assert_eq!(catalog.lookup_sku("orange"), Some("SKU00102"));
        assert_eq!(catalog.lookup_sku("person"), None);
        assert!(!catalog.contains("person"));
    }

    #[test]
    fn test_malformed_map_fails() {
        let err = SkuCatalog::from_json_str(r#"{"apple": 101}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));

        let err = SkuCatalog::from_json_str(r#"["apple"]"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_empty_entries_fail() {
        assert!(matches!(
            SkuCatalog::from_json_str("{}").unwrap_err(),
            CatalogError::Empty
        ));
        assert!(matches!(
            SkuCatalog::from_json_str(r#"{"apple": " "}"#).unwrap_err(),
            CatalogError::EmptySku { .. }
        ));
        assert!(matches!(
            SkuCatalog::from_json_str(r#"{"": "SKU1"}"#).unwrap_err(),
            CatalogError::EmptyLabel
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"apple": "SKU00101"}}"#).unwrap();
        let catalog = SkuCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.lookup_sku("apple"), Some("SKU00101"));

        let err = SkuCatalog::from_file("/nonexistent/sku_map.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_from_pairs() {
        let catalog: SkuCatalog = [("apple", "SKU00101")].into_iter().collect();
        assert_eq!(catalog.lookup_sku("apple"), Some("SKU00101"));
    }
}
