use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::{run_tool_checked, IndexBuilder};
use crate::layout::RepoLayout;
use crate::Result;

const UPDATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `fdroid update`, run in the F-Droid directory
pub struct FdroidUpdate {
    program: String,
    timeout: Duration,
}

impl Default for FdroidUpdate {
    fn default() -> Self {
        Self {
            program: "fdroid".to_string(),
            timeout: UPDATE_TIMEOUT,
        }
    }
}

impl FdroidUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args() -> [&'static str; 5] {
        [
            "update",
            "--pretty",
            "--create-metadata",
            "--delete-unknown",
            "--use-date-from-apk",
        ]
    }
}

#[async_trait]
impl IndexBuilder for FdroidUpdate {
    async fn rebuild(&self, layout: &RepoLayout) -> Result<()> {
        info!("Rebuilding index in {}", layout.fdroid_dir.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args()).current_dir(&layout.fdroid_dir);
        let output = run_tool_checked(&self.program, &mut cmd, self.timeout).await?;

        debug!("{}", String::from_utf8_lossy(&output.stdout));
        Ok(())
    }
}
