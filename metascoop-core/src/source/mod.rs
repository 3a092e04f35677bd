//! Code hosting and version control collaborators
//!
//! The engine talks to the hosting API through [`SourceHost`] and to
//! version control through [`SourceCheckout`]. Real implementations live in
//! [`github`] and [`git`]; tests substitute in-memory fakes.

pub mod git;
pub mod github;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;
use url::Url;

use crate::Result;

/// Owner and name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Extract `<owner>/<name>` from a clone URL, stripping a `.git` suffix
    pub fn from_git_url(git: &str) -> Option<Self> {
        let url = Url::parse(git).ok()?;
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let name = segments.next()?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository description as reported by the host
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<LicenseInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseInfo {
    #[serde(default)]
    pub spdx_id: Option<String>,
}

impl RepositoryInfo {
    pub fn spdx_license(&self) -> Option<&str> {
        self.license.as_ref()?.spdx_id.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The single `.apk` asset of a release
    pub fn apk_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(".apk"))
    }

    pub fn notes(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// The hosting API (repositories, releases, pull requests, CI artifacts)
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo>;

    /// All releases, in the order the host lists them
    async fn releases(&self, repo: &RepoRef) -> Result<Vec<Release>>;

    /// A single release; `NotFound` when the tag has no release
    async fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Release>;

    async fn download_release_asset(&self, repo: &RepoRef, asset: &ReleaseAsset)
        -> Result<Vec<u8>>;

    /// Raw bytes of a CI artifact (a zip archive)
    async fn download_artifact(&self, repo: &RepoRef, artifact_id: u64) -> Result<Vec<u8>>;

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest>;

    /// Backend identifier for logging
    fn name(&self) -> &'static str;
}

/// Version control operations. Checkouts are temporary directories removed on drop.
#[async_trait]
pub trait SourceCheckout: Send + Sync {
    async fn clone_repo(&self, url: &str) -> Result<TempDir>;

    /// Subject line of a pull request commit
    async fn pr_commit_subject(&self, url: &str, pr_number: u64, sha: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_from_url() {
        let repo = RepoRef::from_git_url("https://github.com/owner/app.git").unwrap();
        assert_eq!(repo.owner, "owner");
        assert_eq!(repo.name, "app");
        assert_eq!(repo.to_string(), "owner/app");

        let repo = RepoRef::from_git_url("https://github.com/owner/app/").unwrap();
        assert_eq!(repo.name, "app");

        assert!(RepoRef::from_git_url("https://github.com/owner").is_none());
        assert!(RepoRef::from_git_url("not a url").is_none());
    }

    #[test]
    fn test_release_apk_asset() {
        let release: Release = serde_json::from_str(
            r#"{"tag_name": "v1.0.0", "prerelease": true, "assets": [
                {"id": 1, "name": "checksums.txt"},
                {"id": 2, "name": "app-release.apk", "size": 10}
            ]}"#,
        )
        .unwrap();
        assert_eq!(release.apk_asset().unwrap().id, 2);
        assert_eq!(release.notes(), "");
    }

    #[test]
    fn test_spdx_license() {
        let info: RepositoryInfo =
            serde_json::from_str(r#"{"description": "d", "license": {"spdx_id": "MIT"}}"#)
                .unwrap();
        assert_eq!(info.spdx_license(), Some("MIT"));
        assert_eq!(RepositoryInfo::default().spdx_license(), None);
    }
}
