//! External repository tooling
//!
//! The index is produced by an opaque repository-building tool and PR
//! artifacts are re-signed with the Android SDK signer. Both are reached
//! through traits so the pipeline can run against fakes.

mod fdroid;
mod signer;

pub use fdroid::FdroidUpdate;
pub use signer::{ApkSigner, FdroidConfig};

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::layout::RepoLayout;
use crate::{MetascoopError, Result};

/// Regenerates the repository index from the artifact directory
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn rebuild(&self, layout: &RepoLayout) -> Result<()>;
}

/// Signs a staged artifact in place
#[async_trait]
pub trait ArtifactSigner: Send + Sync {
    async fn sign(&self, apk: &Path) -> Result<()>;
}

/// Run an external tool to completion within `timeout`.
///
/// Spawn failures and timeouts are `ExternalTool` errors; the exit status
/// is left to the caller.
pub(crate) async fn run_tool(tool: &str, cmd: &mut Command, timeout: Duration) -> Result<Output> {
    cmd.kill_on_drop(true);
    debug!("Running {:?}", cmd);

    tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| MetascoopError::external_tool(tool, format!("timed out after {timeout:?}")))?
        .map_err(|e| MetascoopError::external_tool(tool, format!("failed to start: {e}")))
}

/// Like [`run_tool`] but a non-zero exit is an error carrying stderr
pub(crate) async fn run_tool_checked(
    tool: &str,
    cmd: &mut Command,
    timeout: Duration,
) -> Result<Output> {
    let output = run_tool(tool, cmd, timeout).await?;
    if !output.status.success() {
        return Err(MetascoopError::external_tool(
            tool,
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(output)
}
