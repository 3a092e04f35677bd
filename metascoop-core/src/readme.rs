//! The generated apps table in README.md

use serde_json::{Map, Value};
use std::fmt::Write as _;
use tera::escape_html;
use tracing::info;
use url::Url;

use crate::fs_util::write_atomic;
use crate::index::RepoIndex;
use crate::layout::RepoLayout;
use crate::{MetascoopError, Result};

pub const TABLE_START: &str = "<!-- This table is auto-generated. Do not edit -->";
pub const TABLE_END: &str = "<!-- end apps table -->";

fn field(app: &Map<String, Value>, key: &str) -> String {
    match app.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Link target safe inside a quoted attribute: valid URLs are
/// percent-encoded by the parser, anything else is escaped as text
fn href(source: &str) -> String {
    match Url::parse(source) {
        Ok(url) => url.as_str().replace('&', "&amp;"),
        Err(_) => escape_html(source),
    }
}

/// Render the table body, one row per app entry of the index.
///
/// Index fields are escaped; the rows are HTML embedded in Markdown.
pub fn render_table(index: &RepoIndex) -> String {
    let mut table = String::from("| Icon | Name | Description | Version |\n| --- | --- | --- | --- |\n");
    for app in &index.apps {
        let source = href(&field(app, "sourceCode"));
        let package = field(app, "packageName");
        let name = escape_html(&field(app, "name"));
        let summary = escape_html(&field(app, "summary")).replace('\n', "<br />");
        let version = escape_html(&field(app, "suggestedVersionName"));

        let _ = writeln!(
            table,
            "| <a href=\"{source}\"><img src=\"fdroid/repo/{package}/en-US/icon.png\" alt=\"{name} icon\" width=\"36px\" height=\"36px\"></a> | [**{name}**]({source}) | {summary} | {version} |"
        );
    }
    table
}

/// Replace everything between the table markers, keeping the rest intact
pub fn splice_table(content: &str, table: &str) -> Option<String> {
    let start = content.find(TABLE_START)?;
    let end = start + content[start..].find(TABLE_END)?;

    let mut out = String::with_capacity(content.len() + table.len());
    out.push_str(&content[..start]);
    out.push_str(TABLE_START);
    out.push('\n');
    out.push_str(table);
    out.push_str(&content[end..]);
    Some(out)
}

/// Regenerate the README table from the index
pub fn regenerate(layout: &RepoLayout, index: &RepoIndex) -> Result<()> {
    let path = layout.readme();
    let content = std::fs::read_to_string(&path)
        .map_err(|e| MetascoopError::NotFound(format!("{}: {}", path.display(), e)))?;

    let updated = splice_table(&content, &render_table(index)).ok_or_else(|| {
        MetascoopError::NotFound(format!("apps table markers in {}", path.display()))
    })?;

    write_atomic(&path, updated.as_bytes())?;
    info!("Regenerated apps table in {}", path.display());
    Ok(())
}
