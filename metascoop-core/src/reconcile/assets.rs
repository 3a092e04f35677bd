//! Icon and screenshot relocation from a source checkout

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::fs_util::{move_file, remove_path};
use crate::layout::RepoLayout;
use crate::{MetascoopError, Result};

/// Where app assets live inside a source repository
const SOURCE_IMAGES: [&str; 3] = ["metadata", "en-US", "images"];

fn images_dir(checkout: &Path) -> PathBuf {
    SOURCE_IMAGES
        .iter()
        .fold(checkout.to_path_buf(), |path, part| path.join(part))
}

/// Screenshot files of a checkout, sorted by path
pub fn find_screenshots(checkout: &Path) -> Vec<PathBuf> {
    let dir = images_dir(checkout).join("phoneScreenshots");
    let mut screenshots: Vec<PathBuf> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    screenshots.sort();
    screenshots
}

/// Move the icon and screenshots of `checkout` into the package's metadata
/// directory, appending every path written to `written` as it goes so a
/// failure part way still leaves them for cleanup.
///
/// A missing icon is logged. The screenshots directory is replaced
/// wholesale and files are renumbered from 1; files without an extension
/// are skipped.
pub fn relocate(
    layout: &RepoLayout,
    package: &str,
    checkout: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let icon_source = images_dir(checkout).join("icon.png");
    let icon = layout.icon(package);
    match move_file(&icon_source, &icon) {
        Ok(()) => {
            info!("Wrote icon to {}", icon.display());
            written.push(icon);
        }
        Err(e) if e.is_not_found() => debug!("No icon in source repository"),
        Err(e) => warn!("Moving icon {}: {}", icon_source.display(), e),
    }

    let screenshots = find_screenshots(checkout);
    debug!("Found {} screenshots", screenshots.len());
    place_screenshots(layout, package, &screenshots, written)
}

fn place_screenshots(
    layout: &RepoLayout,
    package: &str,
    screenshots: &[PathBuf],
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let target_dir = layout.screenshots_dir(package);
    remove_path(&target_dir).map_err(|e| MetascoopError::package(package, e))?;
    written.push(target_dir.clone());

    let mut counter = 1;
    for screenshot in screenshots {
        let Some(ext) = screenshot.extension() else {
            warn!(
                "Skipping screenshot {}: file extension is empty",
                screenshot.display()
            );
            continue;
        };
        let target = target_dir.join(format!("{}.{}", counter, ext.to_string_lossy()));
        move_file(screenshot, &target).map_err(|e| {
            MetascoopError::package(
                package,
                format!("moving screenshot {}: {}", screenshot.display(), e),
            )
        })?;
        debug!("Wrote screenshot to {}", target.display());
        counter += 1;
    }
    Ok(())
}
