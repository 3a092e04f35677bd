//! Reading and writing metadata records

use std::path::Path;

use super::MetadataRecord;
use crate::fs_util::write_atomic;
use crate::{MetascoopError, Result};

/// Load a record. A missing file is `NotFound`, malformed YAML a package error.
pub fn read(path: &Path) -> Result<MetadataRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MetascoopError::NotFound(format!(
                "metadata record {}",
                path.display()
            )));
        }
        Err(e) => return Err(MetascoopError::package(package_of(path), e)),
    };

    if content.trim().is_empty() {
        return Ok(MetadataRecord::default());
    }

    serde_yaml_ng::from_str(&content).map_err(|e| {
        MetascoopError::package(
            package_of(path),
            format!("failed to parse {}: {}", path.display(), e),
        )
    })
}

/// Persist a record atomically
pub fn write(path: &Path, record: &MetadataRecord) -> Result<()> {
    let content = serde_yaml_ng::to_string(record)
        .map_err(|e| MetascoopError::package(package_of(path), e))?;
    write_atomic(path, content.as_bytes())
        .map_err(|e| MetascoopError::package(package_of(path), e))
}

fn package_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
