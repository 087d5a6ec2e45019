//! Help listing for a [`Format`].

use crate::format::{Format, OptionFormat};

fn format_option_left(name: &str, format: &OptionFormat) -> String {
    let mut out = format!("--{name}");
    if let Some(placeholder) = format.description_val.as_deref().filter(|p| !p.is_empty()) {
        out.push('=');
        out.push_str(placeholder);
    }
    match format.short {
        Some(short) => format!("-{short}, {out}"),
        None => out,
    }
}

/// Render one line per option, sorted by long name:
///
/// ```text
/// -o, --one  First option
/// --two=N    Second option,
///            described on two lines
/// ```
///
/// Descriptions start two columns after the longest option name;
/// continuation lines are indented to the same column.
pub fn help(format: &Format) -> String {
    let mut rows: Vec<(&str, String, Option<&str>)> = format
        .iter()
        .map(|(name, f)| {
            (
                name,
                format_option_left(name, f),
                f.description.as_deref().filter(|d| !d.is_empty()),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let width = rows
        .iter()
        .map(|(_, left, _)| left.chars().count())
        .max()
        .unwrap_or(0)
        + 2;

    let mut lines: Vec<String> = Vec::new();
    for (_, left, description) in rows {
        let Some(description) = description else {
            lines.push(left);
            continue;
        };
        let mut desc_lines = description.split('\n');
        let first = desc_lines.next().unwrap_or_default();
        lines.push(format!("{left:width$}{first}"));
        for line in desc_lines {
            lines.push(format!("{:width$}{line}", ""));
        }
    }
    lines.join("\n")
}
