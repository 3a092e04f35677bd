//! Semantic version helpers
//!
//! Release tags and version names are free-form. A tag is considered a
//! semantic version when it has a leading `v` followed by either a full
//! `MAJOR.MINOR.PATCH[-pre][+build]` version or the `MAJOR` / `MAJOR.MINOR`
//! shorthand (shorthand forms carry no pre-release or build suffix).

use semver::Version;
use std::cmp::Ordering;

/// Parse a `v`-prefixed tag such as `v1.2.0`, `v1.2` or `v2`
pub fn parse_tag(tag: &str) -> Option<Version> {
    parse_core(tag.strip_prefix('v')?)
}

/// Parse a version name, with or without the leading `v`
pub fn parse_version_name(name: &str) -> Option<Version> {
    parse_core(name.strip_prefix('v').unwrap_or(name))
}

pub fn is_valid_tag(tag: &str) -> bool {
    parse_tag(tag).is_some()
}

/// Order two release tags; invalid tags sort before valid ones
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    match (parse_tag(a), parse_tag(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Display label for a version name: `v1.1` for `1.1`, unchanged otherwise
pub fn display_label(version_name: &str) -> String {
    let prefixed = format!("v{version_name}");
    if is_valid_tag(&prefixed) {
        prefixed
    } else {
        version_name.to_string()
    }
}

fn parse_core(rest: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(rest) {
        return Some(version);
    }

    let parts: Vec<&str> = rest.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| is_numeric_identifier(p)) {
        return None;
    }

    let major = parts[0].parse().ok()?;
    let minor = match parts.get(1) {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some(Version::new(major, minor, 0))
}

fn is_numeric_identifier(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'))
}
