//! Pull request CLI commands
//!
//! Adds a PR's CI build to the repository, or removes every build of a PR.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use metascoop_core::tools::{ApkSigner, FdroidConfig};

use crate::{report, Workspace};

#[derive(Parser, Debug)]
pub enum PrCommand {
    /// Stage, sign and publish the CI build of a pull request
    Add {
        /// App key from the app list
        app: String,

        /// Pull request number
        number: u64,

        /// ID of the CI artifact holding the build
        #[clap(long)]
        artifact_id: u64,

        /// Head commit the artifact was built from
        #[clap(long)]
        sha: String,
    },

    /// Remove every build of a pull request
    Delete {
        /// App key from the app list
        app: String,

        /// Pull request number
        number: u64,
    },
}

impl PrCommand {
    pub(crate) async fn execute(&self, ws: &Workspace) -> Result<()> {
        match self {
            PrCommand::Add {
                app,
                number,
                artifact_id,
                sha,
            } => pr_add(ws, app, *number, *artifact_id, sha).await,
            PrCommand::Delete { app, number } => pr_delete(ws, app, *number).await,
        }
    }
}

async fn pr_add(ws: &Workspace, app: &str, number: u64, artifact_id: u64, sha: &str) -> Result<()> {
    let config_path = ws.layout.fdroid_config();
    let config = FdroidConfig::load(&config_path)
        .with_context(|| format!("Failed to load signing config {}", config_path.display()))?;
    let signer = ApkSigner::new(
        config,
        ws.apps.build_tools_version.clone(),
        ws.layout.fdroid_dir.clone(),
    );

    info!("Adding PR #{} of {} (artifact {}, {})", number, app, artifact_id, sha);
    let engine = ws.engine();
    let staged = engine
        .add_pr(app, number, artifact_id, sha, &signer)
        .await
        .with_context(|| format!("Failed to add PR #{number} of {app}"))?;

    let published = engine.run(staged).await.context("Failed to update the repository")?;
    report(&published);
    Ok(())
}

async fn pr_delete(ws: &Workspace, app: &str, number: u64) -> Result<()> {
    info!("Deleting PR #{} of {}", number, app);
    let outcome = ws
        .engine()
        .delete_pr(app, number)
        .await
        .with_context(|| format!("Failed to delete PR #{number} of {app}"))?;

    for (package, removed) in &outcome.removal.packages {
        if removed.whole_package {
            info!("Removed package {}", package);
        } else {
            info!(
                "Removed versions {:?} of {}",
                removed.version_codes, package
            );
        }
    }
    report(&outcome.published);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct Harness {
        #[clap(subcommand)]
        command: PrCommand,
    }

    #[test]
    fn test_add_requires_artifact_and_sha() {
        assert!(Harness::try_parse_from(["pr", "add", "demo", "42"]).is_err());

        let parsed = Harness::try_parse_from([
            "pr",
            "add",
            "demo",
            "42",
            "--artifact-id",
            "77",
            "--sha",
            "abc123",
        ])
        .unwrap();
        match parsed.command {
            PrCommand::Add {
                app,
                number,
                artifact_id,
                sha,
            } => {
                assert_eq!(app, "demo");
                assert_eq!(number, 42);
                assert_eq!(artifact_id, 77);
                assert_eq!(sha, "abc123");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_delete_rejects_non_numeric_pr() {
        assert!(Harness::try_parse_from(["pr", "delete", "demo", "forty-two"]).is_err());
        let parsed = Harness::try_parse_from(["pr", "delete", "demo", "42"]).unwrap();
        assert!(matches!(
            parsed.command,
            PrCommand::Delete { number: 42, .. }
        ));
    }
}
