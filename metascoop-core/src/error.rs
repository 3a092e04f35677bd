use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the reconciliation engine.
///
/// The first six variants are the engine's failure classes. Callers decide
/// whether to abort or keep going with [`MetascoopError::is_fatal`].
#[derive(Error, Debug)]
pub enum MetascoopError {
    /// Malformed app list, tool config or credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// The hosting API or a git checkout failed for one app
    #[error("Source lookup failed for {app}: {message}")]
    SourceLookup { app: String, message: String },

    /// Index document missing, unreadable or invalid
    #[error("Failed to read repository index {path}: {message}")]
    Index { path: PathBuf, message: String },

    /// Metadata, changelog or asset handling failed for one package
    #[error("Package {package}: {message}")]
    Package { package: String, message: String },

    /// An external tool exited unsuccessfully or timed out
    #[error("External tool `{tool}` failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// Requested app, release, PR, artifact or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl MetascoopError {
    pub fn package(package: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Package {
            package: package.into(),
            message: message.to_string(),
        }
    }

    pub fn source_lookup(app: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::SourceLookup {
            app: app.into(),
            message: message.to_string(),
        }
    }

    pub fn index(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Index {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn external_tool(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Per-package and per-app failures are logged and skipped; everything
    /// else aborts the invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Package { .. } | Self::SourceLookup { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, MetascoopError>;
