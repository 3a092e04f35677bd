//! Staging downloaded artifacts into the artifact directory
//!
//! Downloads land in a `.tmp` sibling and are renamed into place only once
//! complete. A target that already exists is never fetched again.

use std::future::Future;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{MetascoopError, Result};

/// Outcome of staging one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    Downloaded,
    AlreadyPresent,
}

/// Stage `target`, invoking `fetch` only if it does not exist yet
pub async fn stage_artifact<F, Fut>(target: &Path, fetch: F) -> Result<Staged>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    if target.exists() {
        info!("{} already present, skipping download", target.display());
        return Ok(Staged::AlreadyPresent);
    }

    let bytes = fetch().await?;
    write_via_temp(target, &bytes)?;
    info!("Staged {} ({} bytes)", target.display(), bytes.len());
    Ok(Staged::Downloaded)
}

/// Write `<target>.tmp`, then rename it to `target`. The temp file is
/// removed if anything fails.
pub fn write_via_temp(target: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(target);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let result = std::fs::write(&temp, bytes).and_then(|()| std::fs::rename(&temp, target));
    if let Err(e) = result {
        debug!("Removing partial download {}", temp.display());
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Pull the first `.apk` entry out of a CI artifact archive
pub fn extract_apk(archive: &[u8]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if !entry.is_file() || !entry.name().ends_with(".apk") {
            continue;
        }
        debug!("Extracting {} from artifact", entry.name());
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        return Ok(bytes);
    }
    Err(MetascoopError::NotFound(
        "no .apk file in artifact archive".to_string(),
    ))
}
