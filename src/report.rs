//! Static HTML rendering of the extracted entries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

use crate::schema::{Extraction, Field};

/// One row of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub source: String,
    pub permalink: String,
    pub extraction: Extraction,
}

pub struct ReportOptions<'a> {
    pub subreddit: &'a str,
}

const STYLE: &str = "\
<style>
  body { font-family: Arial, sans-serif; margin: 20px; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border: 1px solid #ccc; padding: 8px; }
  th { background: #f4f4f4; }
</style>";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_report(entries: &[Entry], options: &ReportOptions, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        "<head>".to_string(),
        "<meta charset='utf-8'>".to_string(),
        "<title>Extracted Interview Data</title>".to_string(),
        STYLE.to_string(),
        "</head>".to_string(),
        "<body>".to_string(),
        format!(
            "<h1>Extracted Interview Data from r/{}</h1>",
            escape_html(options.subreddit)
        ),
        "<table>".to_string(),
        "<tr>".to_string(),
        "  <th>Source</th>".to_string(),
    ];
    lines.extend(Field::ALL.iter().map(|field| format!("  <th>{}</th>", field.header())));
    lines.push("  <th>Link</th>".to_string());
    lines.push("</tr>".to_string());

    for entry in entries {
        lines.push("<tr>".to_string());
        lines.push(format!("<td>{}</td>", escape_html(&entry.source)));
        for field in Field::ALL {
            lines.push(format!(
                "<td>{}</td>",
                escape_html(entry.extraction.get_or_missing(field))
            ));
        }
        lines.push(format!(
            "<td><a href='{}' target='_blank'>Link</a></td>",
            escape_html(&entry.permalink)
        ));
        lines.push("</tr>".to_string());
    }

    lines.push("</table>".to_string());
    lines.push(format!(
        "<p>Last updated: {} UTC</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push("</body></html>".to_string());

    lines.join("\n")
}

pub fn write_report(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write report to {}", path.display()))
}
