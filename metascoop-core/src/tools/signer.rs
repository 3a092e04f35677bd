use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::{run_tool, run_tool_checked, ArtifactSigner};
use crate::fs_util::{move_file, remove_path};
use crate::{MetascoopError, Result};

const SIGN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Signing settings from the F-Droid `config.yml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FdroidConfig {
    #[serde(default)]
    pub sdk_path: String,
    pub keystore: String,
    #[serde(rename = "keystorepass")]
    pub keystore_pass: String,
    #[serde(rename = "keypass")]
    pub key_pass: String,
    #[serde(rename = "repo_keyalias")]
    pub key_alias: String,
}

impl FdroidConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MetascoopError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            MetascoopError::Config(msg) => {
                MetascoopError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: FdroidConfig = serde_yaml_ng::from_str(content)
            .map_err(|e| MetascoopError::Config(format!("invalid config: {e}")))?;
        config.sdk_path = shellexpand::full(&config.sdk_path)
            .map_err(|e| MetascoopError::Config(format!("sdk_path: {e}")))?
            .into_owned();
        Ok(config)
    }

    /// JKS keystore converted from the PKCS#12 one, next to it
    pub fn jks_keystore(&self) -> String {
        let stem = self.keystore.strip_suffix(".p12").unwrap_or(&self.keystore);
        format!("{stem}.jks")
    }
}

/// Re-signs artifacts with the repository key using `apksigner`
pub struct ApkSigner {
    config: FdroidConfig,
    build_tools_version: String,
    /// Directory keystore paths are relative to
    fdroid_dir: PathBuf,
}

impl ApkSigner {
    pub fn new(
        config: FdroidConfig,
        build_tools_version: impl Into<String>,
        fdroid_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            build_tools_version: build_tools_version.into(),
            fdroid_dir: fdroid_dir.into(),
        }
    }

    fn apksigner(&self) -> PathBuf {
        Path::new(&self.config.sdk_path)
            .join("build-tools")
            .join(&self.build_tools_version)
            .join("apksigner")
    }

    /// `keytool` conversion; the JKS may already exist so failures only log
    async fn convert_keystore(&self) {
        let c = &self.config;
        let jks = c.jks_keystore();
        let mut cmd = Command::new("keytool");
        cmd.args([
            "-importkeystore",
            "-srckeystore",
            c.keystore.as_str(),
            "-srcstoretype",
            "pkcs12",
            "-srckeypass",
            c.key_pass.as_str(),
            "-srcstorepass",
            c.keystore_pass.as_str(),
            "-srcalias",
            c.key_alias.as_str(),
            "-destkeystore",
            jks.as_str(),
            "-destkeypass",
            c.key_pass.as_str(),
            "-deststorepass",
            c.keystore_pass.as_str(),
            "-destalias",
            c.key_alias.as_str(),
        ])
        .current_dir(&self.fdroid_dir);

        match run_tool("keytool", &mut cmd, SIGN_TIMEOUT).await {
            Ok(output) if output.status.success() => debug!("Converted keystore to {}", jks),
            Ok(output) => debug!("keytool exited with {}", output.status),
            Err(e) => debug!("keytool unavailable: {}", e),
        }
    }
}

#[async_trait]
impl ArtifactSigner for ApkSigner {
    async fn sign(&self, apk: &Path) -> Result<()> {
        self.convert_keystore().await;

        let mut out = apk.as_os_str().to_owned();
        out.push(".apk");
        let out = PathBuf::from(out);
        let c = &self.config;

        info!("Signing {}", apk.display());
        let mut cmd = Command::new(self.apksigner());
        cmd.arg("sign")
            .arg("--ks")
            .arg(self.fdroid_dir.join(c.jks_keystore()))
            .arg("--ks-key-alias")
            .arg(&c.key_alias)
            .arg("--ks-pass")
            .arg(format!("pass:{}", c.keystore_pass))
            .arg("--key-pass")
            .arg(format!("pass:{}", c.key_pass))
            .arg("--out")
            .arg(&out)
            .arg(apk);
        run_tool_checked("apksigner", &mut cmd, SIGN_TIMEOUT).await?;

        move_file(&out, apk)?;
        let mut idsig = out.into_os_string();
        idsig.push(".idsig");
        remove_path(Path::new(&idsig))?;
        Ok(())
    }
}
