//! Metadata reconciliation
//!
//! Brings every metadata record under the metadata root into agreement with
//! the current index and the apps touched by the running operation. Each
//! package is handled independently: a failure is logged and recorded in
//! the [`ReconcileReport`], and the walk moves on.

pub mod assets;

use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn, Instrument};
use walkdir::WalkDir;

use crate::apps::{AppDescriptor, TouchedApps};
use crate::index::{PackageVariant, RepoIndex};
use crate::layout::RepoLayout;
use crate::metadata::{
    set_if_informative, store, truncate_summary, BuildEntry, MetadataRecord, TagList,
};
use crate::source::SourceCheckout;
use crate::{MetascoopError, Result};

/// What happened to each package during one pass
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Packages whose record was rewritten
    pub updated: Vec<String>,
    /// Packages with no variant in the index or no touched app
    pub skipped: Vec<String>,
    /// Packages abandoned this cycle, with the reason
    pub failed: Vec<(String, String)>,
    /// Icon and screenshot paths moved into the metadata tree
    pub moved_assets: Vec<PathBuf>,
}

enum Outcome {
    Updated,
    Skipped,
}

/// Record files directly under the metadata root, sorted by package name
pub fn metadata_records(layout: &RepoLayout) -> Vec<(String, PathBuf)> {
    let mut records: Vec<(String, PathBuf)> = WalkDir::new(&layout.metadata_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            if path.extension().is_some_and(|ext| ext == "yml") {
                let package = path.file_stem()?.to_string_lossy().into_owned();
                Some((package, path))
            } else {
                None
            }
        })
        .collect();
    records.sort();
    records
}

/// Reconcile all records against `index` for the apps in `touched`
pub async fn reconcile(
    layout: &RepoLayout,
    index: &RepoIndex,
    touched: &TouchedApps,
    checkout: &dyn SourceCheckout,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (package, path) in metadata_records(layout) {
        let span = info_span!("package", name = %package);
        let result = reconcile_package(
            layout,
            index,
            touched,
            checkout,
            &package,
            &path,
            &mut report.moved_assets,
        )
        .instrument(span)
        .await;

        match result {
            Ok(Outcome::Updated) => report.updated.push(package),
            Ok(Outcome::Skipped) => report.skipped.push(package),
            Err(e) => {
                warn!(package = %package, "Abandoning package this cycle: {}", e);
                report.failed.push((package, e.to_string()));
            }
        }
    }

    info!(
        "Reconciled {} packages ({} skipped, {} failed)",
        report.updated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}

async fn reconcile_package(
    layout: &RepoLayout,
    index: &RepoIndex,
    touched: &TouchedApps,
    checkout: &dyn SourceCheckout,
    package: &str,
    path: &Path,
    moved: &mut Vec<PathBuf>,
) -> Result<Outcome> {
    let Some(latest) = index.latest(package) else {
        debug!("No variants in index, skipping");
        return Ok(Outcome::Skipped);
    };

    let Some(app) = touched.get(&latest.apk_name) else {
        if !touched.is_empty() {
            warn!("No app matches {}, skipping", latest.apk_name);
        }
        return Ok(Outcome::Skipped);
    };

    info!(
        version_code = latest.version_code,
        "Updating metadata for {} {}",
        app.display_name(),
        latest.version_name
    );

    let mut record = store::read(path).map_err(|e| match e {
        MetascoopError::NotFound(msg) => MetascoopError::package(package, msg),
        other => other,
    })?;
    apply_descriptor(&mut record, app);
    apply_versions(&mut record, latest, index.variants(package));
    store::write(path, &record)?;

    if !app.release_notes.is_empty() {
        write_changelog(layout, package, latest.version_code, &app.release_notes);
    }

    debug!("Cloning {} to look for assets", app.git);
    let source = checkout.clone_repo(&app.git).await?;
    assets::relocate(layout, package, source.path(), moved)?;

    Ok(Outcome::Updated)
}

/// Copy descriptive fields from the app, never erasing data with blanks
pub fn apply_descriptor(record: &mut MetadataRecord, app: &AppDescriptor) {
    set_if_informative(&mut record.author_name, app.author());
    set_if_informative(&mut record.name, app.display_name());
    set_if_informative(&mut record.source_code, &app.git);
    set_if_informative(&mut record.license, &app.license);
    set_if_informative(&mut record.website, &app.website);
    set_if_informative(&mut record.issue_tracker, &app.issue_tracker);
    set_if_informative(&mut record.description, &app.description);
    set_if_informative(&mut record.summary, &truncate_summary(&app.summary));

    if !app.categories.is_empty() {
        record.categories = Some(app.categories.clone());
    }
    if !app.anti_features.is_empty() {
        record.anti_features = Some(TagList::joined(&app.anti_features));
    }
}

/// Current version from the resolved latest variant, build history from all.
///
/// Extra keys of an existing build entry carry over to the rebuilt entry
/// with the same version code.
pub fn apply_versions(
    record: &mut MetadataRecord,
    latest: &PackageVariant,
    variants: &[PackageVariant],
) {
    let previous = record.builds.take().unwrap_or_default();
    let builds = variants
        .iter()
        .map(|v| {
            let mut build = BuildEntry::new(v.version_code, v.version_name.clone());
            if let Some(old) = previous.iter().find(|b| b.version_code == v.version_code) {
                build.extra = old.extra.clone();
            }
            build
        })
        .collect();

    record.set_current_version(&latest.version_name, latest.version_code);
    record.set_builds(builds);
}

/// Failures are logged; the rest of the package's steps still run
fn write_changelog(layout: &RepoLayout, package: &str, version_code: u64, notes: &str) {
    let path = layout.changelog(package, version_code);
    let result = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(&path, notes));
    match result {
        Ok(()) => info!("Wrote release notes to {}", path.display()),
        Err(e) => warn!("Writing changelog {}: {}", path.display(), e),
    }
}
