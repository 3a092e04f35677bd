//! The declarative app list (apps.yaml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

use crate::source::RepoRef;
use crate::{MetascoopError, Result};

/// Root of apps.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppFile {
    /// Android build-tools version used to locate `apksigner`
    #[serde(default)]
    pub build_tools_version: String,

    /// Configured apps, keyed by stable app key
    #[serde(default)]
    pub apps: BTreeMap<String, AppDescriptor>,
}

/// One configured application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Source repository URL
    pub git: String,

    #[serde(default)]
    pub summary: String,

    /// Explicit author; derived from the URL when empty
    #[serde(default, rename = "author")]
    pub author_name: String,

    /// Display name override
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub anti_features: Vec<String>,

    #[serde(default)]
    pub license: String,

    #[serde(default)]
    pub website: String,

    #[serde(default)]
    pub issue_tracker: String,

    /// Debug apps get their badge from the highest build across packages
    #[serde(default)]
    pub debug: bool,

    /// Release notes for the build being processed this cycle
    #[serde(skip)]
    pub release_notes: String,

    #[serde(skip)]
    key: String,

    #[serde(skip)]
    repo_author: String,
}

impl AppFile {
    /// Load and validate the app list
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MetascoopError::Config(format!("Failed to read app file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            MetascoopError::Config(msg) => {
                MetascoopError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut file: AppFile = serde_yaml_ng::from_str(content)
            .map_err(|e| MetascoopError::Config(format!("Failed to parse app file: {e}")))?;

        for (key, app) in file.apps.iter_mut() {
            app.key = key.clone();

            let url = Url::parse(&app.git).map_err(|e| {
                MetascoopError::Config(format!(
                    "problem with given git URL {:?} for app with key={:?}, name={:?}: {}",
                    app.git, key, app.name, e
                ))
            })?;
            app.repo_author = url
                .path_segments()
                .and_then(|mut segments| segments.find(|s| !s.is_empty()))
                .unwrap_or_default()
                .to_string();
        }

        Ok(file)
    }

    pub fn get(&self, key: &str) -> Result<&AppDescriptor> {
        self.apps
            .get(key)
            .ok_or_else(|| MetascoopError::NotFound(format!("unknown app: {key}")))
    }
}

impl AppDescriptor {
    /// Stable key from apps.yaml
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn author(&self) -> &str {
        if self.author_name.is_empty() {
            &self.repo_author
        } else {
            &self.author_name
        }
    }

    /// Friendly name, falling back to the key
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.key
        } else {
            &self.name
        }
    }

    pub fn repo(&self) -> Result<RepoRef> {
        RepoRef::from_git_url(&self.git).ok_or_else(|| {
            MetascoopError::source_lookup(
                &self.key,
                format!("cannot determine repository from {}", self.git),
            )
        })
    }

    /// Artifact file name for a release build
    pub fn release_artifact_name(&self, tag: &str) -> String {
        format!("{}_{}.apk", self.key, tag)
    }

    /// Artifact file name for a pull request build
    pub fn pr_artifact_name(&self, pr_number: u64, sha: &str) -> String {
        format!("{}_pr_{}_{}.apk", self.key, pr_number, sha)
    }

    /// Prefix shared by every artifact of one pull request
    pub fn pr_artifact_prefix(key: &str, pr_number: u64) -> String {
        format!("{key}_pr_{pr_number}_")
    }
}

/// Apps touched by one lifecycle operation, keyed by artifact file name
pub type TouchedApps = BTreeMap<String, AppDescriptor>;
