//! index-v2.json and entry.json
//!
//! The v2 index carries per-version release notes under
//! `manifest.whatsNew`. After the index tool has run, changelog files from
//! the metadata tree are injected there and the entry document's digest of
//! the v2 index is refreshed to match the rewritten bytes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::RepoIndex;
use crate::fs_util::write_atomic;
use crate::layout::RepoLayout;
use crate::{MetascoopError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexV2 {
    #[serde(default)]
    pub repo: Map<String, Value>,
    #[serde(default)]
    pub packages: BTreeMap<String, V2Package>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct V2Package {
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Versions keyed by file hash
    #[serde(default)]
    pub versions: BTreeMap<String, V2Version>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct V2Version {
    #[serde(default)]
    pub added: i64,
    #[serde(default)]
    pub file: Map<String, Value>,
    #[serde(default)]
    pub manifest: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// entry.json, pointing at the current v2 index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub index: Map<String, Value>,
    #[serde(default)]
    pub diffs: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexV2 {
    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

impl Entry {
    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| MetascoopError::index(path, e))?;
    serde_json::from_str(&content).map_err(|e| MetascoopError::index(path, e))
}

/// Inject changelogs into index-v2.json and refresh entry.json.
///
/// Returns the number of versions that received release notes, or `None`
/// when the repository has no v2 index / entry document.
pub fn sync_whats_new(layout: &RepoLayout, index: &RepoIndex) -> Result<Option<usize>> {
    let v2_path = layout.index_v2();
    let entry_path = layout.entry();
    if !v2_path.exists() || !entry_path.exists() {
        debug!("No v2 index at {}, skipping release notes sync", v2_path.display());
        return Ok(None);
    }

    let mut v2 = IndexV2::read(&v2_path)?;
    let mut entry = Entry::read(&entry_path)?;

    let mut updated = 0;
    for (package, variants) in &index.packages {
        for variant in variants {
            let changelog = layout.changelog(package, variant.version_code);
            let Ok(notes) = std::fs::read_to_string(&changelog) else {
                continue;
            };
            let Some(version) = v2
                .packages
                .get_mut(package)
                .and_then(|p| p.versions.get_mut(&variant.hash))
            else {
                debug!(
                    "No v2 entry for {} ({}), skipping release notes",
                    package, variant.hash
                );
                continue;
            };
            version
                .manifest
                .insert("whatsNew".to_string(), json!({ "en-US": notes }));
            updated += 1;
        }
    }

    let bytes = serde_json::to_vec(&v2)?;
    write_atomic(&v2_path, &bytes)?;

    let digest = hex::encode(Sha256::digest(&bytes));
    entry.index.insert("sha256".to_string(), Value::String(digest));
    entry.index.insert("size".to_string(), json!(bytes.len()));
    write_atomic(&entry_path, &serde_json::to_vec(&entry)?)?;

    info!("Injected release notes into {} v2 index versions", updated);
    Ok(Some(updated))
}
