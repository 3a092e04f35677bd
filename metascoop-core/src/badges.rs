//! Version badges (`badges.yaml`)
//!
//! One label per app key, recomputed wholesale from the index on every run.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::apps::AppDescriptor;
use crate::fs_util::write_atomic;
use crate::index::{owns_artifact, RepoIndex};
use crate::layout::RepoLayout;
use crate::version::display_label;
use crate::Result;

/// App key to version label
pub type BadgeMap = BTreeMap<String, String>;

/// Compute the badge map.
///
/// Packages are scanned in name order. The first variant of a package whose
/// artifact belongs to a not-yet-badged app decides that package's owner
/// (an artifact belongs to the longest app key it is prefixed with),
/// and the owner's label is the package's resolved latest version. Debug
/// apps collect one candidate per package and keep the one with the highest
/// version code (the first found on equal codes).
pub fn generate(apps: &BTreeMap<String, AppDescriptor>, index: &RepoIndex) -> BadgeMap {
    let mut badges = BadgeMap::new();
    let mut debug_candidates: BTreeMap<&str, (u64, String)> = BTreeMap::new();

    for (package, variants) in &index.packages {
        let Some(latest) = index.latest(package) else {
            continue;
        };

        let owner = variants.iter().find_map(|variant| {
            owner_of(apps, &variant.apk_name).filter(|(key, _)| !badges.contains_key(key.as_str()))
        });
        let Some((key, app)) = owner else {
            continue;
        };

        let label = display_label(&latest.version_name);
        if app.debug {
            debug!("Debug candidate {} for {} ({})", label, key, package);
            match debug_candidates.get(key.as_str()) {
                Some((code, _)) if *code >= latest.version_code => {}
                _ => {
                    debug_candidates.insert(key, (latest.version_code, label));
                }
            }
        } else {
            badges.insert(key.clone(), label);
        }
    }

    for (key, (_, label)) in debug_candidates {
        badges.insert(key.to_string(), label);
    }
    badges
}

/// The app an artifact was staged for. When one key extends another
/// (`app` and `app_extra`) the longest matching key owns the artifact.
fn owner_of<'a>(
    apps: &'a BTreeMap<String, AppDescriptor>,
    apk_name: &str,
) -> Option<(&'a String, &'a AppDescriptor)> {
    apps.iter()
        .filter(|(key, _)| owns_artifact(key, apk_name))
        .max_by_key(|(key, _)| key.len())
}

/// Regenerate `badges.yaml` from scratch
pub fn write(layout: &RepoLayout, badges: &BadgeMap) -> Result<()> {
    let content = serde_yaml_ng::to_string(badges)?;
    write_atomic(&layout.badges(), content.as_bytes())?;
    info!("Wrote {} badges to {}", badges.len(), layout.badges().display());
    Ok(())
}
