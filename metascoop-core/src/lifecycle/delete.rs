use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::apps::{AppDescriptor, TouchedApps};
use crate::fs_util::remove_path;
use crate::index::{owns_artifact, RepoIndex};
use crate::layout::RepoLayout;
use crate::metadata::store;
use crate::pipeline::{Engine, Published, Staged};
use crate::Result;

/// Builds removed from one package
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RemovedPackage {
    pub version_codes: BTreeSet<u64>,
    pub removed_files: Vec<PathBuf>,
    /// Every variant of the package was removed, so was its metadata
    pub whole_package: bool,
}

/// Everything removed for one pull request
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrRemoval {
    pub prefix: String,
    pub packages: BTreeMap<String, RemovedPackage>,
}

impl PrRemoval {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn removed_codes(&self, package: &str) -> Option<&BTreeSet<u64>> {
        self.packages.get(package).map(|p| &p.version_codes)
    }
}

#[derive(Debug)]
pub struct DeleteOutcome {
    pub removal: PrRemoval,
    /// Records whose current version and builds were rewritten
    pub rewritten: Vec<String>,
    pub published: Published,
}

impl Engine<'_> {
    /// Delete every build of a pull request and bring derived documents
    /// back in line. Nothing matching is not an error.
    pub async fn delete_pr(&self, key: &str, pr_number: u64) -> Result<DeleteOutcome> {
        let removal = self.remove_pr_builds(key, pr_number)?;
        if removal.is_empty() {
            info!("No files found for PR {} of {}", pr_number, key);
        }

        // The index still lists the removed builds, so this rebuild runs
        // even in debug mode
        let indexed = Staged::new(TouchedApps::new()).rebuild(self).await?;
        let rewritten = apply_removals(self.layout, indexed.index(), &removal);
        let published = indexed.reconcile(self).await?.publish(self)?;

        Ok(DeleteOutcome {
            removal,
            rewritten,
            published,
        })
    }

    /// Remove artifacts and changelogs named `<key>_pr_<n>_*` from the
    /// packages owned by `key`, dropping a package's metadata entirely once
    /// none of its variants remain.
    pub fn remove_pr_builds(&self, key: &str, pr_number: u64) -> Result<PrRemoval> {
        self.apps.get(key)?;
        let index = self.read_index()?;
        let layout = self.layout;

        let mut removal = PrRemoval {
            prefix: AppDescriptor::pr_artifact_prefix(key, pr_number),
            packages: BTreeMap::new(),
        };

        for (package, variants) in &index.packages {
            if !variants.iter().any(|v| owns_artifact(key, &v.apk_name)) {
                continue;
            }

            let matching: Vec<_> = variants
                .iter()
                .filter(|v| v.apk_name.starts_with(&removal.prefix))
                .collect();
            if matching.is_empty() {
                continue;
            }

            let mut removed = RemovedPackage::default();
            for variant in &matching {
                for path in [
                    layout.changelog(package, variant.version_code),
                    layout.artifact(&variant.apk_name),
                ] {
                    match remove_path(&path) {
                        Ok(true) => removed.removed_files.push(path),
                        Ok(false) => {}
                        Err(e) => warn!(package = %package, "Removing {}: {}", path.display(), e),
                    }
                }
                removed.version_codes.insert(variant.version_code);
            }

            if matching.len() == variants.len() {
                info!("Removing all metadata of {}", package);
                for path in [
                    layout.metadata_record(package),
                    layout.metadata_package_dir(package),
                    layout.repo_package_dir(package),
                ] {
                    if let Err(e) = remove_path(&path) {
                        warn!(package = %package, "Removing {}: {}", path.display(), e);
                    }
                }
                removed.whole_package = true;
            }

            info!(
                "Removed {} builds of {} for PR {}",
                removed.version_codes.len(),
                package,
                pr_number
            );
            removal.packages.insert(package.clone(), removed);
        }

        Ok(removal)
    }
}

/// Point each partially emptied record at its remaining latest variant and
/// drop the removed version codes from its build history.
///
/// Returns the packages whose record was rewritten; failures are logged.
pub fn apply_removals(layout: &RepoLayout, index: &RepoIndex, removal: &PrRemoval) -> Vec<String> {
    let mut rewritten = Vec::new();

    for (package, removed) in &removal.packages {
        if removed.whole_package {
            continue;
        }
        let Some(latest) = index.latest(package) else {
            continue;
        };

        let path = layout.metadata_record(package);
        let result = store::read(&path).and_then(|mut record| {
            record.retain_builds(|code| !removed.version_codes.contains(&code));
            record.set_current_version(&latest.version_name, latest.version_code);
            store::write(&path, &record)
        });

        match result {
            Ok(()) => {
                info!(
                    "{} now at {} ({})",
                    package, latest.version_name, latest.version_code
                );
                rewritten.push(package.clone());
            }
            Err(e) => warn!(package = %package, "Updating record after removal: {}", e),
        }
    }

    rewritten
}
