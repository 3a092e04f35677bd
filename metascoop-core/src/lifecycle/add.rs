use tracing::{debug, info, info_span, warn, Instrument};

use super::for_app;
use crate::apps::{AppDescriptor, TouchedApps};
use crate::download::{extract_apk, stage_artifact};
use crate::pipeline::{Engine, Staged};
use crate::source::{Release, RepoRef};
use crate::tools::ArtifactSigner;
use crate::version::{compare_tags, is_valid_tag};
use crate::{MetascoopError, Result};

impl Engine<'_> {
    /// Stage the `.apk` of one release of one app
    pub async fn add_release(&self, key: &str, tag: &str) -> Result<Staged> {
        let configured = self.apps.get(key)?;
        let repo = configured.repo()?;
        info!("Looking up {} release {}", repo, tag);

        let mut app = configured.clone();
        self.enrich_from_repository(&mut app, &repo).await;

        let release = self.host.release_by_tag(&repo, tag).await?;
        let artifact = self.stage_release(&app, &repo, &release).await?;
        app.release_notes = release.notes().to_string();

        let mut touched = TouchedApps::new();
        touched.insert(artifact, app);
        Ok(Staged::new(touched))
    }

    /// Stage every semver-tagged pre-release of every app.
    ///
    /// An app whose releases cannot be listed is logged and skipped.
    pub async fn add_all_releases(&self) -> Result<Staged> {
        let mut touched = TouchedApps::new();

        for (key, app) in &self.apps.apps {
            let span = info_span!("app", key = %key);
            match self.stage_all_releases(app).instrument(span).await {
                Ok(staged) => touched.extend(staged),
                Err(e) if !e.is_fatal() => warn!(app = %key, "Skipping app: {}", e),
                Err(e) => return Err(e),
            }
        }

        info!("Staged {} release artifacts", touched.len());
        Ok(Staged::new(touched))
    }

    /// Stage a pull request's CI artifact, enrich the app with the PR and
    /// commit details, and re-sign the artifact.
    pub async fn add_pr(
        &self,
        key: &str,
        pr_number: u64,
        artifact_id: u64,
        sha: &str,
        signer: &dyn ArtifactSigner,
    ) -> Result<Staged> {
        let configured = self.apps.get(key)?;
        let repo = configured.repo()?;

        let artifact = configured.pr_artifact_name(pr_number, sha);
        let target = self.layout.artifact(&artifact);
        stage_artifact(&target, || async {
            let archive = self.host.download_artifact(&repo, artifact_id).await?;
            extract_apk(&archive)
        })
        .await?;

        let subject = self
            .checkout
            .pr_commit_subject(&configured.git, pr_number, sha)
            .await?;
        let pr = self.host.pull_request(&repo, pr_number).await?;

        let mut app = configured.clone();
        app.summary = format!("PR #{}\n{}", pr_number, pr.body.unwrap_or_default());
        app.name = format!("{} PR: {}", configured.display_name(), pr_number);
        app.release_notes = format!("Commit ({sha}): {subject}");

        signer.sign(&target).await?;

        let mut touched = TouchedApps::new();
        touched.insert(artifact, app);
        Ok(Staged::new(touched))
    }

    async fn stage_all_releases(&self, configured: &AppDescriptor) -> Result<TouchedApps> {
        let key = configured.key();
        let repo = configured.repo()?;
        info!("App: {}/{}", configured.author(), configured.display_name());

        let mut app = configured.clone();
        self.enrich_from_repository(&mut app, &repo).await;

        let mut releases = self
            .host
            .releases(&repo)
            .await
            .map_err(|e| for_app(key, e))?;
        releases.sort_by(|a, b| compare_tags(&a.tag_name, &b.tag_name));
        info!("Received {} releases", releases.len());

        let mut touched = TouchedApps::new();
        for release in &releases {
            if !release.prerelease {
                debug!("Skipping non prerelease {}", release.tag_name);
                continue;
            }
            if !is_valid_tag(&release.tag_name) {
                debug!("{} is not a semantic version", release.tag_name);
                continue;
            }

            match self.stage_release(&app, &repo, release).await {
                Ok(artifact) => {
                    let mut copy = app.clone();
                    copy.release_notes = release.notes().to_string();
                    touched.insert(artifact, copy);
                }
                Err(e) if !e.is_fatal() || e.is_not_found() => {
                    warn!("Release {}: {}", release.tag_name, e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(touched)
    }

    /// Download a release's `.apk` unless it is already staged
    async fn stage_release(
        &self,
        app: &AppDescriptor,
        repo: &RepoRef,
        release: &Release,
    ) -> Result<String> {
        let asset = release.apk_asset().ok_or_else(|| {
            MetascoopError::NotFound(format!(
                "release asset with extension .apk in {} {}",
                repo, release.tag_name
            ))
        })?;

        let artifact = app.release_artifact_name(&release.tag_name);
        debug!("Target artifact name: {}", artifact);
        stage_artifact(&self.layout.artifact(&artifact), || {
            self.host.download_release_asset(repo, asset)
        })
        .await?;
        Ok(artifact)
    }

    /// Repository description and license overwrite the configured ones
    async fn enrich_from_repository(&self, app: &mut AppDescriptor, repo: &RepoRef) {
        match self.host.repository(repo).await {
            Ok(info) => {
                if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
                    app.summary = description.to_string();
                }
                if let Some(license) = info.spdx_license() {
                    app.license = license.to_string();
                }
                debug!("From {}: summary={:?}, license={:?}", self.host.name(), app.summary, app.license);
            }
            Err(e) => warn!("Looking up {}: {}", repo, e),
        }
    }
}
