use unicode_width::UnicodeWidthStr;

use crate::filter::FilterEngine;
use crate::warning::Warning;

const UNTAGGED: &str = "(untagged)";
const COLUMN_GAP: &str = "  ";

fn category_label(category: &str) -> &str {
    if category.is_empty() { UNTAGGED } else { category }
}

/// Pad to a display width (not byte length) so wide characters line up
fn pad(text: &str, width: usize) -> String {
    let mut padded = text.to_string();
    let fill = width.saturating_sub(text.width());
    padded.extend(std::iter::repeat_n(' ', fill));
    padded
}

/// Render rows as aligned columns. The last column is never padded.
fn columns(rows: &[Vec<String>]) -> String {
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; column_count];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut out = String::new();
    for row in rows {
        let last = row.len().saturating_sub(1);
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| if i == last { cell.clone() } else { pad(cell, widths[i]) })
            .collect();
        out.push_str(&line.join(COLUMN_GAP));
        out.push('\n');
    }
    out
}

/// Table of warnings. With `full`, continuation lines follow each row,
/// indented by four spaces.
pub fn render_warnings(warnings: &[&Warning], full: bool) -> String {
    let mut rows = vec![vec![
        "#".to_string(),
        "LOCATION".to_string(),
        "CATEGORY".to_string(),
        "MESSAGE".to_string(),
    ]];
    for (index, warn) in warnings.iter().enumerate() {
        rows.push(vec![
            index.to_string(),
            warn.location(),
            category_label(&warn.category).to_string(),
            warn.message().to_string(),
        ]);
    }

    if !full {
        return columns(&rows);
    }

    let table = columns(&rows);
    let mut lines = table.lines();
    let mut out = String::new();
    if let Some(header) = lines.next() {
        out.push_str(header);
        out.push('\n');
    }
    for (line, warn) in lines.zip(warnings) {
        out.push_str(line);
        out.push('\n');
        for note in warn.complete_text.lines().skip(1) {
            out.push_str("    ");
            out.push_str(note);
            out.push('\n');
        }
    }
    out
}

/// Available categories with their warning counts, sorted by name
pub fn render_categories(engine: &FilterEngine) -> String {
    let counts = engine.store().category_counts();
    let rows: Vec<Vec<String>> = engine
        .available_categories()
        .iter()
        .map(|category| {
            let count = counts.get(category.as_str()).copied().unwrap_or(0);
            vec![category_label(category).to_string(), count.to_string()]
        })
        .collect();
    columns(&rows)
}

pub fn render_json(warnings: &[&Warning]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(warnings)
}
