//! Item catalog: the words a learner can study.
//!
//! Only `id` and `tags` mean anything to scheduling; the rest is carried for
//! display.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("could not read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode catalog {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(alias = "korean")]
    pub term: String,
    pub translation: String,
    #[serde(default, alias = "transcription_rr", skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_translation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        term: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            term: term.into(),
            translation: translation.into(),
            transcription: None,
            example: None,
            example_translation: None,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

pub fn item_id(item: &Item) -> &str {
    &item.id
}

pub trait ItemCatalog {
    fn load_items(&self) -> Result<Vec<Item>>;
}

/// A JSON file holding a bare array of items.
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ItemCatalog for JsonFileCatalog {
    fn load_items(&self) -> Result<Vec<Item>> {
        let text = fs::read_to_string(&self.path).map_err(|source| CatalogError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CatalogError::Decode {
            path: self.path.clone(),
            source,
        })
    }
}

/// Uses `fallback` when `primary` fails or has nothing to offer.
pub struct FallbackCatalog<P, F> {
    primary: P,
    fallback: F,
}

impl<P: ItemCatalog, F: ItemCatalog> FallbackCatalog<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ItemCatalog, F: ItemCatalog> ItemCatalog for FallbackCatalog<P, F> {
    fn load_items(&self) -> Result<Vec<Item>> {
        match self.primary.load_items() {
            Ok(items) if !items.is_empty() => Ok(items),
            Ok(_) => {
                log::warn!("primary catalog is empty, using fallback");
                self.fallback.load_items()
            }
            Err(e) => {
                log::warn!("primary catalog failed ({}), using fallback", e);
                self.fallback.load_items()
            }
        }
    }
}

impl ItemCatalog for Vec<Item> {
    fn load_items(&self) -> Result<Vec<Item>> {
        Ok(self.clone())
    }
}
