//! # Instrument Catalog
//!
//! Loads the funding-instrument collection from a local JSON file or an HTTP
//! URL, validates every record up front, and publishes the result as an
//! immutable snapshot. A reload validates the fresh copy fully and only then
//! swaps the shared `Arc`, so in-flight scoring passes keep their snapshot
//! and never observe a half-updated catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

use crate::profile::{NeedType, Stage};
use std::collections::BTreeSet;

/// Where an instrument applies geographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeographyScope {
    /// Nationwide program; subsumes any region of the profile.
    National,
    /// Limited to the listed regions.
    Regional(Vec<String>),
    /// EU-wide program; subsumes any member state.
    Eu,
    Other,
}

/// One funding program as loaded from the catalog. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Empty means no stage restriction.
    #[serde(default)]
    pub eligible_stages: Vec<Stage>,
    /// Free-text tokens; empty (or containing "all") means unrestricted.
    #[serde(default)]
    pub eligible_industries: Vec<String>,
    #[serde(default)]
    pub need_types: BTreeSet<NeedType>,
    pub geography_scope: GeographyScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<i64>,
    /// Application deadline; absent for continuously open instruments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

/// Catalog load/validation failures. Fatal: the engine must never operate on
/// a partially valid catalog, so the first bad record aborts the whole load.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to fetch catalog from '{url}': {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("catalog source '{source_name}' is not a JSON array of records")]
    NotAnArray { source_name: String },
    #[error("catalog record '{id}' is malformed: {source}")]
    Record { id: String, source: serde_json::Error },
    #[error("duplicate instrument id '{id}' in catalog")]
    DuplicateId { id: String },
    #[error("instrument '{id}' has inverted amount range (min {min} > max {max})")]
    InvertedAmountRange { id: String, min: i64, max: i64 },
}

/// Ordered, validated, immutable set of instruments plus an id index.
#[derive(Debug)]
pub struct Catalog {
    source: String,
    records: Vec<InstrumentRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load and validate from a filesystem path or an http(s) URL.
    pub async fn load(source: &str) -> Result<Self, CatalogLoadError> {
        let raw = if source.starts_with("http://") || source.starts_with("https://") {
            let resp = reqwest::get(source)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| CatalogLoadError::Fetch {
                    url: source.to_string(),
                    source: e,
                })?;
            resp.json::<serde_json::Value>()
                .await
                .map_err(|e| CatalogLoadError::Fetch {
                    url: source.to_string(),
                    source: e,
                })?
        } else {
            let text = fs::read_to_string(source).map_err(|e| CatalogLoadError::Read {
                path: source.to_string(),
                source: e,
            })?;
            serde_json::from_str(&text).map_err(|e| CatalogLoadError::Record {
                id: source.to_string(),
                source: e,
            })?
        };
        Self::from_json_value(source, raw)
    }

    /// Validate an already-parsed JSON array. Public for tests and tools.
    pub fn from_json_value(
        source: &str,
        value: serde_json::Value,
    ) -> Result<Self, CatalogLoadError> {
        let items = value
            .as_array()
            .cloned()
            .ok_or_else(|| CatalogLoadError::NotAnArray {
                source_name: source.to_string(),
            })?;

        let mut records = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());

        for (pos, item) in items.into_iter().enumerate() {
            // Pull the id first so schema errors can name the record.
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{pos}"));

            let record: InstrumentRecord = serde_json::from_value(item)
                .map_err(|e| CatalogLoadError::Record { id: id.clone(), source: e })?;

            if let (Some(min), Some(max)) = (record.amount_min, record.amount_max) {
                if min > max {
                    return Err(CatalogLoadError::InvertedAmountRange {
                        id: record.id,
                        min,
                        max,
                    });
                }
            }
            if index.insert(record.id.clone(), records.len()).is_some() {
                return Err(CatalogLoadError::DuplicateId { id: record.id });
            }
            records.push(record);
        }

        Ok(Self {
            source: source.to_string(),
            records,
            index,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn records(&self) -> &[InstrumentRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&InstrumentRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Shared handle over the active catalog. Readers take a cheap `Arc` clone
/// as their snapshot; a reload swaps the inner `Arc` in one write.
#[derive(Clone)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// Consistent snapshot for the duration of a scoring pass.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.inner.read().expect("catalog lock poisoned").clone()
    }

    /// Validate a fresh copy from `source` and install it atomically.
    /// On any load error the active catalog stays as-is.
    pub async fn reload(&self, source: &str) -> Result<usize, CatalogLoadError> {
        let fresh = Catalog::load(source).await?;
        let count = fresh.len();
        {
            let mut guard = self.inner.write().expect("catalog lock poisoned");
            *guard = Arc::new(fresh);
        }
        info!(source, count, "catalog reloaded");
        Ok(count)
    }
}
