use std::path::{Path, PathBuf};

/// Name of the index document produced by `fdroid update`
pub const INDEX_V1_FILE: &str = "index-v1.json";
pub const INDEX_V2_FILE: &str = "index-v2.json";
pub const ENTRY_FILE: &str = "entry.json";

/// Path management for an F-Droid repository checkout
///
/// Everything is derived from the artifact directory (`fdroid/repo`):
/// its parent is the F-Droid directory holding `config.yml` and
/// `metadata/`, and the parent of that is the project root with
/// `README.md` and `badges.yaml`.
#[derive(Debug, Clone)]
pub struct RepoLayout {
    /// Artifact directory (fdroid/repo)
    pub repo_dir: PathBuf,
    /// Working directory of the index tool (fdroid/)
    pub fdroid_dir: PathBuf,
    /// Metadata root (fdroid/metadata)
    pub metadata_root: PathBuf,
    /// Project root holding README.md and badges.yaml
    pub project_root: PathBuf,
}

impl RepoLayout {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        let fdroid_dir = parent_or_current(&repo_dir);
        let metadata_root = fdroid_dir.join("metadata");
        let project_root = parent_or_current(&fdroid_dir);
        Self {
            repo_dir,
            fdroid_dir,
            metadata_root,
            project_root,
        }
    }

    pub fn index_v1(&self) -> PathBuf {
        self.repo_dir.join(INDEX_V1_FILE)
    }

    pub fn index_v2(&self) -> PathBuf {
        self.repo_dir.join(INDEX_V2_FILE)
    }

    pub fn entry(&self) -> PathBuf {
        self.repo_dir.join(ENTRY_FILE)
    }

    pub fn fdroid_config(&self) -> PathBuf {
        self.fdroid_dir.join("config.yml")
    }

    pub fn artifact(&self, apk_name: &str) -> PathBuf {
        self.repo_dir.join(apk_name)
    }

    /// Per-package asset directory the index tool maintains inside the repo
    pub fn repo_package_dir(&self, package: &str) -> PathBuf {
        self.repo_dir.join(package)
    }

    pub fn metadata_record(&self, package: &str) -> PathBuf {
        self.metadata_root.join(format!("{package}.yml"))
    }

    pub fn metadata_package_dir(&self, package: &str) -> PathBuf {
        self.metadata_root.join(package)
    }

    fn locale_dir(&self, package: &str) -> PathBuf {
        self.metadata_package_dir(package).join("en-US")
    }

    pub fn changelog(&self, package: &str, version_code: u64) -> PathBuf {
        self.locale_dir(package)
            .join("changelogs")
            .join(format!("{version_code}.txt"))
    }

    pub fn icon(&self, package: &str) -> PathBuf {
        self.locale_dir(package).join("icon.png")
    }

    pub fn screenshots_dir(&self, package: &str) -> PathBuf {
        self.locale_dir(package).join("phoneScreenshots")
    }

    pub fn readme(&self) -> PathBuf {
        self.project_root.join("README.md")
    }

    pub fn badges(&self) -> PathBuf {
        self.project_root.join("badges.yaml")
    }
}

fn parent_or_current(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
