//! `git` command line backend

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use super::SourceCheckout;
use crate::{MetascoopError, Result};

const GIT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct GitCli {
    program: String,
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            timeout: GIT_TIMEOUT,
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run git with `args` in `dir`, returning stdout
    async fn run(&self, url: &str, dir: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(dir).kill_on_drop(true);
        debug!("Running {:?}", cmd);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                MetascoopError::source_lookup(
                    url,
                    format!("git {} timed out after {:?}", args.join(" "), self.timeout),
                )
            })?
            .map_err(|e| MetascoopError::source_lookup(url, format!("cannot run git: {e}")))?;

        if !output.status.success() {
            return Err(MetascoopError::source_lookup(
                url,
                format!(
                    "git {} exited with {}: {}",
                    args.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SourceCheckout for GitCli {
    async fn clone_repo(&self, url: &str) -> Result<TempDir> {
        let checkout = tempfile::Builder::new().prefix("metascoop-").tempdir()?;
        info!("Cloning {} into {}", url, checkout.path().display());

        let target = checkout.path().to_string_lossy().into_owned();
        self.run(url, checkout.path(), &["clone", "--quiet", url, &target])
            .await?;
        Ok(checkout)
    }

    async fn pr_commit_subject(&self, url: &str, pr_number: u64, sha: &str) -> Result<String> {
        let checkout = self.clone_repo(url).await?;
        let dir = checkout.path();

        let refspec = format!("pull/{pr_number}/head");
        self.run(url, dir, &["pull", "--quiet", "origin", &refspec])
            .await?;
        self.run(url, dir, &["checkout", "--quiet", sha]).await?;
        let subject = self.run(url, dir, &["show", "-s", "--format=%s"]).await?;

        Ok(subject.trim().to_string())
    }
}
