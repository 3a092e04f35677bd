//! Latest-version resolution
//!
//! `versionCode` is the authoritative order. Equal codes should not occur,
//! but when they do the version names are compared as semantic versions: a
//! name that parses beats one that does not, and if that still does not
//! separate them the variant listed first in the index wins.

use std::cmp::Ordering;

use super::{PackageVariant, RepoIndex};
use crate::version::parse_version_name;

impl RepoIndex {
    /// Resolve the canonical latest variant of a package
    pub fn latest(&self, package: &str) -> Option<&PackageVariant> {
        latest_of(self.variants(package))
    }
}

/// Pick the newest variant of a list; `None` for an empty list
pub fn latest_of(variants: &[PackageVariant]) -> Option<&PackageVariant> {
    variants.iter().fold(None, |best, candidate| match best {
        Some(current) if compare_variants(candidate, current) != Ordering::Greater => {
            Some(current)
        }
        _ => Some(candidate),
    })
}

/// Total order used to rank two variants of the same package
pub fn compare_variants(a: &PackageVariant, b: &PackageVariant) -> Ordering {
    a.version_code.cmp(&b.version_code).then_with(|| {
        match (
            parse_version_name(&a.version_name),
            parse_version_name(&b.version_name),
        ) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    })
}
