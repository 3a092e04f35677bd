//! Shared fixtures for the integration tests
//!
//! The fakes stand in for GitHub, git and `fdroid update`. The fake index
//! builder mimics the parts of the real tool the engine depends on: it
//! indexes the `.apk` files present, creates missing metadata records and
//! copies localized assets into the repo directory.

#![allow(dead_code)]

use async_trait::async_trait;
use metascoop_core::apps::AppFile;
use metascoop_core::layout::RepoLayout;
use metascoop_core::metadata::store;
use metascoop_core::readme::{TABLE_END, TABLE_START};
use metascoop_core::source::{
    PullRequest, Release, ReleaseAsset, RepoRef, RepositoryInfo, SourceCheckout, SourceHost,
};
use metascoop_core::tools::{ArtifactSigner, IndexBuilder};
use metascoop_core::{MetascoopError, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const APPS_YAML: &str = r#"
build_tools_version: "34.0.0"
apps:
  demo:
    git: https://github.com/someone/demo
    name: Demo
    summary: A demo app
    categories: [Games]
  dbg:
    git: https://github.com/someone/dbg
    debug: true
"#;

/// A project checkout with `fdroid/repo`, `fdroid/metadata` and a README
pub struct TestRepo {
    pub dir: TempDir,
    pub layout: RepoLayout,
    pub apps: AppFile,
}

impl TestRepo {
    pub fn new() -> Self {
        Self::with_apps(APPS_YAML)
    }

    pub fn with_apps(yaml: &str) -> Self {
        init_test_logging();
        let dir = TempDir::new().unwrap();
        let layout = RepoLayout::new(dir.path().join("fdroid/repo"));
        std::fs::create_dir_all(&layout.repo_dir).unwrap();
        std::fs::create_dir_all(&layout.metadata_root).unwrap();
        std::fs::write(
            layout.readme(),
            format!("# Apps\n\n{TABLE_START}\n{TABLE_END}\n\nFooter\n"),
        )
        .unwrap();

        let apps = AppFile::from_yaml(yaml).unwrap();
        Self { dir, layout, apps }
    }

    /// Drop an artifact into the repo directory
    pub fn stage(&self, apk: &str, bytes: &[u8]) -> PathBuf {
        let path = self.layout.artifact(apk);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn write_changelog(&self, package: &str, code: u64, text: &str) -> PathBuf {
        let path = self.layout.changelog(package, code);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    pub fn write_record(&self, package: &str, yaml: &str) {
        std::fs::write(self.layout.metadata_record(package), yaml).unwrap();
    }

    pub fn readme(&self) -> String {
        std::fs::read_to_string(self.layout.readme()).unwrap()
    }

    pub fn badges(&self) -> BTreeMap<String, String> {
        let content = std::fs::read_to_string(self.layout.badges()).unwrap();
        serde_yaml_ng::from_str(&content).unwrap()
    }
}

#[derive(Clone)]
struct Registered {
    package: String,
    version_code: u64,
    version_name: String,
}

/// Indexes the `.apk` files present using registered package details
#[derive(Default)]
pub struct FakeIndexBuilder {
    registry: Mutex<BTreeMap<String, Registered>>,
    runs: AtomicUsize,
}

impl FakeIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare what the tool would read from an artifact's manifest
    pub fn register(&self, apk: &str, package: &str, version_code: u64, version_name: &str) {
        self.registry.lock().unwrap().insert(
            apk.to_string(),
            Registered {
                package: package.to_string(),
                version_code,
                version_name: version_name.to_string(),
            },
        );
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn build(&self, layout: &RepoLayout) -> std::io::Result<()> {
        let registry = self.registry.lock().unwrap().clone();

        let mut apks: Vec<String> = std::fs::read_dir(&layout.repo_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".apk"))
            .collect();
        apks.sort();

        let mut packages: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for apk in &apks {
            let Some(info) = registry.get(apk) else {
                continue;
            };
            packages.entry(info.package.clone()).or_default().push(json!({
                "added": 1700000000000u64,
                "apkName": apk,
                "hash": format!("hash-{apk}"),
                "hashType": "sha256",
                "minSdkVersion": 21,
                "nativecode": [],
                "packageName": info.package,
                "sig": "sig",
                "signer": "signer",
                "size": 1024,
                "targetSdkVersion": 34,
                "versionCode": info.version_code,
                "versionName": info.version_name,
            }));
        }

        let mut apps = Vec::new();
        let mut v2_packages = Map::new();
        for (package, variants) in packages.iter_mut() {
            variants.sort_by_key(|v| std::cmp::Reverse(v["versionCode"].as_u64()));

            let record_path = layout.metadata_record(package);
            if !record_path.exists() {
                std::fs::write(&record_path, "AutoUpdateMode: None\nUpdateCheckMode: None\n")?;
            }
            let record = store::read(&record_path).unwrap_or_default();

            let icon = layout.icon(package);
            if icon.exists() {
                let target = layout.repo_package_dir(package).join("en-US/icon.png");
                std::fs::create_dir_all(target.parent().unwrap())?;
                std::fs::copy(&icon, target)?;
            }

            apps.push(json!({
                "packageName": package,
                "name": record.name.clone().unwrap_or_else(|| package.clone()),
                "summary": record.summary.clone().unwrap_or_default(),
                "sourceCode": record.source_code.clone().unwrap_or_default(),
                "suggestedVersionName": variants[0]["versionName"],
            }));

            let versions: Map<String, Value> = variants
                .iter()
                .map(|v| {
                    let hash = v["hash"].as_str().unwrap_or_default().to_string();
                    let version = json!({
                        "added": 1,
                        "file": {"name": format!("/{}", v["apkName"].as_str().unwrap_or_default())},
                        "manifest": {"versionCode": v["versionCode"], "versionName": v["versionName"]},
                    });
                    (hash, version)
                })
                .collect();
            v2_packages.insert(package.clone(), json!({"metadata": {}, "versions": versions}));
        }

        let index = json!({
            "repo": {"name": "Test repo", "timestamp": 1700000000000u64},
            "requests": {"install": [], "uninstall": []},
            "apps": apps,
            "packages": packages,
        });
        std::fs::write(layout.index_v1(), serde_json::to_vec_pretty(&index)?)?;

        let v2 = json!({"repo": {"name": "Test repo"}, "packages": v2_packages});
        std::fs::write(layout.index_v2(), serde_json::to_vec(&v2)?)?;
        std::fs::write(
            layout.entry(),
            r#"{"timestamp": 1, "version": 20002, "index": {"name": "/index-v2.json", "sha256": "stale"}}"#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl IndexBuilder for FakeIndexBuilder {
    async fn rebuild(&self, layout: &RepoLayout) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.build(layout)
            .map_err(|e| MetascoopError::external_tool("fake-fdroid", e))
    }
}

/// In-memory hosting API
#[derive(Default)]
pub struct FakeHost {
    pub releases: Mutex<BTreeMap<String, Vec<Release>>>,
    pub assets: Mutex<BTreeMap<u64, Vec<u8>>>,
    pub artifacts: Mutex<BTreeMap<u64, Vec<u8>>>,
    pub pulls: Mutex<BTreeMap<u64, PullRequest>>,
    pub repositories: Mutex<BTreeMap<String, RepositoryInfo>>,
    /// Repositories whose lookups all fail
    pub broken: Mutex<Vec<String>>,
    pub downloads: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a release with a single `.apk` asset
    pub fn add_release(&self, repo: &str, tag: &str, prerelease: bool, asset_id: u64, bytes: &[u8]) {
        let release = Release {
            tag_name: tag.to_string(),
            name: Some(tag.to_string()),
            body: Some(format!("Notes for {tag}")),
            prerelease,
            assets: vec![ReleaseAsset {
                id: asset_id,
                name: "app-release.apk".to_string(),
                size: bytes.len() as u64,
                browser_download_url: String::new(),
            }],
        };
        self.releases
            .lock()
            .unwrap()
            .entry(repo.to_string())
            .or_default()
            .push(release);
        self.assets.lock().unwrap().insert(asset_id, bytes.to_vec());
    }

    /// Publish a CI artifact: a zip holding one `.apk`
    pub fn add_artifact(&self, artifact_id: u64, apk_bytes: &[u8]) {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("app-debug.apk", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(apk_bytes).unwrap();
        let archive = writer.finish().unwrap().into_inner();
        self.artifacts.lock().unwrap().insert(artifact_id, archive);
    }

    pub fn add_pull(&self, number: u64, body: &str) {
        self.pulls.lock().unwrap().insert(
            number,
            PullRequest {
                number,
                title: format!("PR {number}"),
                body: Some(body.to_string()),
            },
        );
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn check(&self, repo: &RepoRef) -> Result<()> {
        if self.broken.lock().unwrap().contains(&repo.to_string()) {
            return Err(MetascoopError::source_lookup(repo.to_string(), "HTTP 500"));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceHost for FakeHost {
    async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo> {
        self.check(repo)?;
        Ok(self
            .repositories
            .lock()
            .unwrap()
            .get(&repo.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn releases(&self, repo: &RepoRef) -> Result<Vec<Release>> {
        self.check(repo)?;
        Ok(self
            .releases
            .lock()
            .unwrap()
            .get(&repo.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Release> {
        self.releases(repo)
            .await?
            .into_iter()
            .find(|r| r.tag_name == tag)
            .ok_or_else(|| MetascoopError::NotFound(format!("release {tag}")))
    }

    async fn download_release_asset(
        &self,
        repo: &RepoRef,
        asset: &ReleaseAsset,
    ) -> Result<Vec<u8>> {
        self.check(repo)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.assets
            .lock()
            .unwrap()
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| MetascoopError::NotFound(format!("asset {}", asset.id)))
    }

    async fn download_artifact(&self, repo: &RepoRef, artifact_id: u64) -> Result<Vec<u8>> {
        self.check(repo)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .lock()
            .unwrap()
            .get(&artifact_id)
            .cloned()
            .ok_or_else(|| MetascoopError::NotFound(format!("artifact {artifact_id}")))
    }

    async fn pull_request(&self, _repo: &RepoRef, number: u64) -> Result<PullRequest> {
        self.pulls
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| MetascoopError::NotFound(format!("pull request {number}")))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Materializes a source tree with an icon and two screenshots
#[derive(Default)]
pub struct FakeCheckout {
    pub clones: AtomicUsize,
}

impl FakeCheckout {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceCheckout for FakeCheckout {
    async fn clone_repo(&self, _url: &str) -> Result<TempDir> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        let checkout = TempDir::new()?;
        let images = checkout.path().join("metadata/en-US/images");
        std::fs::create_dir_all(images.join("phoneScreenshots"))?;
        std::fs::write(images.join("icon.png"), b"icon")?;
        std::fs::write(images.join("phoneScreenshots/main.png"), b"main")?;
        std::fs::write(images.join("phoneScreenshots/settings.png"), b"settings")?;
        Ok(checkout)
    }

    async fn pr_commit_subject(&self, _url: &str, _pr: u64, _sha: &str) -> Result<String> {
        Ok("Fix the frobnicator".to_string())
    }
}

/// Records which artifacts were signed
#[derive(Default)]
pub struct RecordingSigner {
    pub signed: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ArtifactSigner for RecordingSigner {
    async fn sign(&self, apk: &Path) -> Result<()> {
        assert!(apk.exists(), "signing a missing artifact");
        self.signed.lock().unwrap().push(apk.to_path_buf());
        Ok(())
    }
}
