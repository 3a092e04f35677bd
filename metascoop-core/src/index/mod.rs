//! Repository index parsing
//!
//! `index-v1.json` is written by `fdroid update` and lists every published
//! binary grouped by package name. The engine only ever reads it; it is
//! re-read after each tool run and never cached across one.

pub mod resolver;
pub mod v2;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{MetascoopError, Result};

/// The repository index (index-v1.json)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoIndex {
    /// Repo-level description
    #[serde(default)]
    pub repo: Map<String, Value>,

    #[serde(default)]
    pub requests: Map<String, Value>,

    /// Per-app descriptive maps (name, summary, sourceCode, ...)
    #[serde(default)]
    pub apps: Vec<Map<String, Value>>,

    /// All published variants, keyed by package name
    #[serde(default)]
    pub packages: BTreeMap<String, Vec<PackageVariant>>,
}

/// One published binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVariant {
    #[serde(default)]
    pub added: i64,
    pub apk_name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub hash_type: String,
    #[serde(default)]
    pub min_sdk_version: u32,
    #[serde(default)]
    pub nativecode: Vec<String>,
    pub package_name: String,
    #[serde(default)]
    pub sig: String,
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub target_sdk_version: u32,
    #[serde(default)]
    pub version_code: u64,
    #[serde(default)]
    pub version_name: String,
}

impl RepoIndex {
    /// Load the index from disk
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MetascoopError::index(path, e))?;
        Self::from_json(&content).map_err(|e| MetascoopError::index(path, e))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// All variants of a package, in index order
    pub fn variants(&self, package: &str) -> &[PackageVariant] {
        self.packages.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Packages with at least one artifact owned by the given app key
    pub fn packages_owned_by<'a>(&'a self, app_key: &'a str) -> impl Iterator<Item = &'a str> {
        self.packages
            .iter()
            .filter(move |(_, variants)| {
                variants.iter().any(|v| owns_artifact(app_key, &v.apk_name))
            })
            .map(|(name, _)| name.as_str())
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn variant_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }
}

/// Whether an artifact file was staged for the given app key.
///
/// Staged artifacts are named `<key>_<tag>.apk` or `<key>_pr_<n>_<sha>.apk`,
/// so the key must be followed by an underscore.
pub fn owns_artifact(app_key: &str, apk_name: &str) -> bool {
    apk_name
        .strip_prefix(app_key)
        .is_some_and(|rest| rest.starts_with('_'))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_index_json() -> &'static str {
        r#"{
  "repo": {"name": "Demo repo", "timestamp": 1700000000000},
  "requests": {"install": [], "uninstall": []},
  "apps": [
    {"packageName": "org.demo", "name": "Demo", "summary": "A demo", "suggestedVersionName": "1.1"}
  ],
  "packages": {
    "org.demo": [
      {"added": 1, "apkName": "demo_1.1.apk", "hash": "bb", "hashType": "sha256",
       "minSdkVersion": 21, "nativecode": [], "packageName": "org.demo", "sig": "s",
       "signer": "k", "size": 100, "targetSdkVersion": 34, "versionCode": 2, "versionName": "1.1"},
      {"added": 1, "apkName": "demo_1.0.apk", "hash": "aa", "hashType": "sha256",
       "minSdkVersion": 21, "packageName": "org.demo", "sig": "s",
       "signer": "k", "size": 90, "targetSdkVersion": 34, "versionCode": 1, "versionName": "1.0"}
    ],
    "org.other": [
      {"apkName": "other_v3.apk", "packageName": "org.other", "versionCode": 3, "versionName": "3"}
    ]
  }
}"#
    }

    #[test]
    fn test_parse_index() {
        let index = RepoIndex::from_json(sample_index_json()).unwrap();
        assert_eq!(index.package_count(), 2);
        assert_eq!(index.variant_count(), 3);
        assert_eq!(index.variants("org.demo")[0].apk_name, "demo_1.1.apk");
        assert_eq!(index.variants("org.other")[0].hash, "");
        assert!(index.variants("org.missing").is_empty());
    }

    #[test]
    fn test_read_missing_index_is_index_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = RepoIndex::read(&dir.path().join("index-v1.json")).unwrap_err();
        assert!(matches!(err, MetascoopError::Index { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_read_invalid_index_is_index_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index-v1.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RepoIndex::read(&path),
            Err(MetascoopError::Index { .. })
        ));
    }

    #[test]
    fn test_owns_artifact() {
        assert!(owns_artifact("demo", "demo_1.0.apk"));
        assert!(owns_artifact("demo", "demo_pr_42_abc.apk"));
        assert!(!owns_artifact("demo", "demo2_1.0.apk"));
        assert!(!owns_artifact("demo", "demonstration_1.0.apk"));
        assert!(!owns_artifact("demo", "other_demo_1.0.apk"));
    }

    #[test]
    fn test_packages_owned_by() {
        let index = RepoIndex::from_json(sample_index_json()).unwrap();
        let owned: Vec<&str> = index.packages_owned_by("demo").collect();
        assert_eq!(owned, vec!["org.demo"]);
        assert_eq!(index.packages_owned_by("nobody").count(), 0);
    }
}
