use serde::{Deserialize, Serialize};
use serde_yaml_ng::Mapping;

/// Maximum summary length accepted by the F-Droid metadata format
pub const MAX_SUMMARY_LENGTH: usize = 80;

/// Placeholder the index tool writes for fields it could not fill
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// A per-package metadata record (`metadata/<package>.yml`)
///
/// Keys the engine owns are typed fields; every other key lands in
/// `extra` and is written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "AuthorName", default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "SourceCode", default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,

    #[serde(rename = "License", default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(rename = "WebSite", default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(rename = "IssueTracker", default, skip_serializing_if = "Option::is_none")]
    pub issue_tracker: Option<String>,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Summary", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(rename = "Categories", default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(rename = "AntiFeatures", default, skip_serializing_if = "Option::is_none")]
    pub anti_features: Option<TagList>,

    #[serde(rename = "CurrentVersion", default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,

    #[serde(rename = "CurrentVersionCode", default, skip_serializing_if = "Option::is_none")]
    pub current_version_code: Option<u64>,

    #[serde(rename = "Builds", default, skip_serializing_if = "Option::is_none")]
    pub builds: Option<Vec<BuildEntry>>,

    /// Keys not owned by the engine, in document order
    #[serde(flatten)]
    pub extra: Mapping,
}

/// One entry of the build history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEntry {
    pub version_code: u64,
    #[serde(default)]
    pub version_name: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Either the classic comma-joined form or a YAML list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    List(Vec<String>),
    Joined(String),
}

impl TagList {
    pub fn joined(tags: &[String]) -> Self {
        TagList::Joined(tags.join(","))
    }

    pub fn tags(&self) -> Vec<String> {
        match self {
            TagList::List(tags) => tags.clone(),
            TagList::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl BuildEntry {
    pub fn new(version_code: u64, version_name: impl Into<String>) -> Self {
        Self {
            version_code,
            version_name: version_name.into(),
            extra: Mapping::new(),
        }
    }
}

impl MetadataRecord {
    /// Replace the build history, sorted ascending with duplicates removed
    pub fn set_builds(&mut self, builds: Vec<BuildEntry>) {
        self.builds = Some(normalize_builds(builds));
    }

    /// Drop build entries whose version code is rejected by `keep`
    pub fn retain_builds(&mut self, keep: impl Fn(u64) -> bool) {
        let builds = self.builds.take().unwrap_or_default();
        self.set_builds(builds.into_iter().filter(|b| keep(b.version_code)).collect());
    }

    pub fn build_codes(&self) -> Vec<u64> {
        self.builds
            .iter()
            .flatten()
            .map(|b| b.version_code)
            .collect()
    }

    pub fn set_current_version(&mut self, name: &str, code: u64) {
        self.current_version = Some(name.to_string());
        self.current_version_code = Some(code);
    }
}

fn normalize_builds(mut builds: Vec<BuildEntry>) -> Vec<BuildEntry> {
    builds.sort_by_key(|b| b.version_code);
    builds.dedup_by_key(|b| b.version_code);
    builds
}

/// Overwrite `field` unless that would erase good data with an empty value.
///
/// Returns whether the field was written.
pub fn set_if_informative(field: &mut Option<String>, value: &str) -> bool {
    if !value.is_empty() || field.as_deref() == Some(UNKNOWN_SENTINEL) {
        *field = Some(value.to_string());
        true
    } else {
        false
    }
}

/// Cap a summary at [`MAX_SUMMARY_LENGTH`] characters, ending in `...`
pub fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() <= MAX_SUMMARY_LENGTH {
        return summary.to_string();
    }
    let mut truncated: String = summary.chars().take(MAX_SUMMARY_LENGTH - 3).collect();
    truncated.push_str("...");
    truncated
}
