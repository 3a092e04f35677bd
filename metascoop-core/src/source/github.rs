//! GitHub REST API backend

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{PullRequest, Release, ReleaseAsset, RepoRef, RepositoryInfo, SourceHost};
use crate::{MetascoopError, Result};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Bound for metadata requests
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound for asset and artifact downloads
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for api.github.com. Anonymous when `token` is empty.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("metascoop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.get_url(&format!("{}{}", self.base_url, path))
    }

    fn get_url(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, repo: &RepoRef, path: &str) -> Result<T> {
        let response = self.send_api(repo, self.get(path), path).await?;
        parse_json(repo, response).await
    }

    async fn send_api(
        &self,
        repo: &RepoRef,
        request: RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        debug!("GET {}", what);
        let response = request
            .header(ACCEPT, "application/vnd.github+json")
            .timeout(API_TIMEOUT)
            .send()
            .await
            .map_err(|e| MetascoopError::source_lookup(repo.to_string(), e))?;
        check_status(repo, what, response)
    }

    async fn get_bytes(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}", path);
        let response = self
            .get(path)
            .header(ACCEPT, "application/octet-stream")
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| MetascoopError::source_lookup(repo.to_string(), e))?;
        let response = check_status(repo, path, response)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MetascoopError::source_lookup(repo.to_string(), e))?;
        Ok(bytes.to_vec())
    }
}

async fn parse_json<T: DeserializeOwned>(repo: &RepoRef, response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| MetascoopError::source_lookup(repo.to_string(), e))
}

/// URL of the `rel="next"` page in a `Link` response header
fn next_page(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .trim()
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn check_status(
    repo: &RepoRef,
    path: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(MetascoopError::NotFound(format!("{path} on {repo}"))),
        status => Err(MetascoopError::source_lookup(
            repo.to_string(),
            format!("HTTP {status} for {path}"),
        )),
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo> {
        self.get_json(repo, &format!("/repos/{}/{}", repo.owner, repo.name))
            .await
    }

    async fn releases(&self, repo: &RepoRef) -> Result<Vec<Release>> {
        let mut releases = Vec::new();
        let mut url = Some(format!(
            "{}/repos/{}/{}/releases?per_page=100",
            self.base_url, repo.owner, repo.name
        ));

        while let Some(page_url) = url.take() {
            let response = self.send_api(repo, self.get_url(&page_url), &page_url).await?;
            url = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page);
            let page: Vec<Release> = parse_json(repo, response).await?;
            releases.extend(page);
        }
        Ok(releases)
    }

    async fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Release> {
        self.get_json(
            repo,
            &format!("/repos/{}/{}/releases/tags/{}", repo.owner, repo.name, tag),
        )
        .await
    }

    async fn download_release_asset(
        &self,
        repo: &RepoRef,
        asset: &ReleaseAsset,
    ) -> Result<Vec<u8>> {
        self.get_bytes(
            repo,
            &format!("/repos/{}/{}/releases/assets/{}", repo.owner, repo.name, asset.id),
        )
        .await
    }

    async fn download_artifact(&self, repo: &RepoRef, artifact_id: u64) -> Result<Vec<u8>> {
        self.get_bytes(
            repo,
            &format!(
                "/repos/{}/{}/actions/artifacts/{}/zip",
                repo.owner, repo.name, artifact_id
            ),
        )
        .await
    }

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest> {
        self.get_json(
            repo,
            &format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
