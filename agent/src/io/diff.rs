//! Boxed line diff shown before a file change is approved.

use std::fmt::Write as _;

use crossterm::style::Stylize;
use similar::{ChangeTag, TextDiff};

const MIN_WIDTH: usize = 20;

/// Render a numbered line diff of `old` → `new` inside a box titled with `path`.
///
/// Removed lines carry the number of the last kept line, matching how the file
/// will read after the change.
pub fn render_diff(path: &str, old: &str, new: &str, width: usize, color: bool) -> String {
    let width = width.max(MIN_WIDTH);
    let inner = width - 2;
    let mut out = String::new();

    let _ = writeln!(out, "╭{}╮", "─".repeat(inner));
    let _ = writeln!(out, "│{}│", pad(&format!(" Writing to {path}"), inner));
    let _ = writeln!(out, "│{}│", " ".repeat(inner));

    let diff = TextDiff::from_lines(old, new);
    let mut line_number = 0usize;
    for change in diff.iter_all_changes() {
        let text = change.value().trim_end_matches(['\r', '\n']);
        let (sign, plain) = match change.tag() {
            ChangeTag::Insert => {
                line_number += 1;
                ('+', format!("+ {line_number:>4} {text}"))
            }
            ChangeTag::Delete => ('-', format!("- {line_number:>4} {text}")),
            ChangeTag::Equal => {
                line_number += 1;
                (' ', format!("  {line_number:>4} {text}"))
            }
        };
        let padded = pad(&plain, inner - 2);
        let styled = match (color, sign) {
            (true, '+') => padded.green().to_string(),
            (true, '-') => padded.red().to_string(),
            _ => padded,
        };
        let _ = writeln!(out, "│ {styled} │");
    }

    let _ = write!(out, "╰{}╯", "─".repeat(inner));
    out
}

/// Pad (or cut) `text` to exactly `width` characters.
fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count >= width {
        return text.chars().take(width).collect();
    }
    format!("{text}{}", " ".repeat(width - count))
}
