//! Directive lexer for model responses.
//!
//! A model requests an action by wrapping it in a pair of identical marker lines.
//! The lexer looks for each directive kind in priority order (command, replace
//! file, read file) and returns the first complete block. Anything it cannot
//! match, including an opening marker with no closing partner, degrades to
//! plain text. Parsing never fails.

use crate::core::types::ActionDirective;

pub const COMMAND_MARKER: &str = "@@COMMAND@@";
pub const REPLACE_FILE_MARKER: &str = "@@REPLACE_FILE@@";
pub const READ_FILE_MARKER: &str = "@@READ_FILE_DIRECT@@";
pub const OLD_MARKER: &str = "---OLD---";
pub const NEW_MARKER: &str = "---NEW---";

/// A marker-delimited block found in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block<'a> {
    /// Text preceding the opening marker line.
    before: &'a str,
    /// Text between the opening and closing marker lines.
    inner: &'a str,
}

/// Derive at most one directive from a raw model response.
pub fn parse_directive(raw: &str) -> ActionDirective {
    if let Some(block) = find_block(raw, COMMAND_MARKER) {
        return ActionDirective::RunCommand {
            explanation: block.before.trim().to_string(),
            command: block.inner.trim().to_string(),
        };
    }

    if let Some(block) = find_block(raw, REPLACE_FILE_MARKER)
        && let Some((path, old_content, new_content)) = split_replace_body(block.inner)
    {
        return ActionDirective::ReplaceFile {
            explanation: block.before.trim().to_string(),
            path: path.to_string(),
            old_content: old_content.to_string(),
            new_content: new_content.to_string(),
        };
    }

    if let Some(block) = find_block(raw, READ_FILE_MARKER) {
        return ActionDirective::ReadFile {
            explanation: block.before.trim().to_string(),
            path: block.inner.trim().to_string(),
        };
    }

    ActionDirective::PlainText {
        text: raw.to_string(),
    }
}

/// Find the first opening marker line and the next matching closing line.
///
/// A marker counts only when it is the sole content of its line (surrounding
/// whitespace, including `\r`, is ignored).
fn find_block<'a>(raw: &'a str, marker: &str) -> Option<Block<'a>> {
    let mut open: Option<(usize, usize)> = None;
    let mut offset = 0usize;

    for line in raw.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim() != marker {
            continue;
        }
        match open {
            None => open = Some((line_start, offset)),
            Some((open_start, inner_start)) => {
                return Some(Block {
                    before: &raw[..open_start],
                    inner: &raw[inner_start..line_start],
                });
            }
        }
    }

    None
}

/// Split a replace-file body into trimmed `(path, old, new)` parts.
fn split_replace_body(inner: &str) -> Option<(&str, &str, &str)> {
    let (path, rest) = inner.split_once(OLD_MARKER)?;
    let (old_content, new_content) = rest.split_once(NEW_MARKER)?;
    Some((path.trim(), old_content.trim(), new_content.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_command_and_explanation() {
        let raw = "This lists the files.\n@@COMMAND@@\n  ls -la  \n@@COMMAND@@\n";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::RunCommand {
                explanation: "This lists the files.".to_string(),
                command: "ls -la".to_string(),
            }
        );
    }

    #[test]
    fn command_without_explanation() {
        let raw = "@@COMMAND@@\nls\n@@COMMAND@@";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::RunCommand {
                explanation: String::new(),
                command: "ls".to_string(),
            }
        );
    }

    #[test]
    fn multi_line_command_is_kept_whole() {
        let raw = "@@COMMAND@@\nfor f in *; do\n  echo $f\ndone\n@@COMMAND@@";
        match parse_directive(raw) {
            ActionDirective::RunCommand { command, .. } => {
                assert_eq!(command, "for f in *; do\n  echo $f\ndone");
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn crlf_markers_are_recognized() {
        let raw = "Run it.\r\n@@COMMAND@@\r\npwd\r\n@@COMMAND@@\r\n";
        match parse_directive(raw) {
            ActionDirective::RunCommand {
                explanation,
                command,
            } => {
                assert_eq!(explanation, "Run it.");
                assert_eq!(command, "pwd");
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_returned_verbatim() {
        let raw = "  Hello! <think>hmm</think> How can I help?\n";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::PlainText {
                text: raw.to_string()
            }
        );
    }

    #[test]
    fn unterminated_command_degrades_to_plain_text() {
        let raw = "Let me check.\n@@COMMAND@@\nls -la\n";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::PlainText {
                text: raw.to_string()
            }
        );
    }

    #[test]
    fn inline_marker_is_not_a_block() {
        let raw = "Use @@COMMAND@@ ls @@COMMAND@@ to list files.";
        assert!(!parse_directive(raw).is_action());
    }

    #[test]
    fn unterminated_command_falls_through_to_read_file() {
        let raw = "@@COMMAND@@\nls\n@@READ_FILE_DIRECT@@\nsrc/main.rs\n@@READ_FILE_DIRECT@@";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::ReadFile {
                explanation: "@@COMMAND@@\nls".to_string(),
                path: "src/main.rs".to_string(),
            }
        );
    }

    #[test]
    fn command_wins_over_earlier_read_file_block() {
        let raw = "@@READ_FILE_DIRECT@@\na.txt\n@@READ_FILE_DIRECT@@\n@@COMMAND@@\nls\n@@COMMAND@@";
        match parse_directive(raw) {
            ActionDirective::RunCommand { command, .. } => assert_eq!(command, "ls"),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn replace_file_block_is_split_into_parts() {
        let raw = "Fix the greeting.\n@@REPLACE_FILE@@\nsrc/hello.txt\n---OLD---\nhello\n---NEW---\nhello world\n@@REPLACE_FILE@@";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::ReplaceFile {
                explanation: "Fix the greeting.".to_string(),
                path: "src/hello.txt".to_string(),
                old_content: "hello".to_string(),
                new_content: "hello world".to_string(),
            }
        );
    }

    #[test]
    fn replace_file_with_empty_old_signals_creation() {
        let raw = "@@REPLACE_FILE@@\nhello.txt\n---OLD---\n---NEW---\nA\n@@REPLACE_FILE@@";
        match parse_directive(raw) {
            ActionDirective::ReplaceFile {
                old_content,
                new_content,
                ..
            } => {
                assert_eq!(old_content, "");
                assert_eq!(new_content, "A");
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn replace_file_without_sub_markers_falls_through() {
        let raw = "@@REPLACE_FILE@@\nhello.txt\nA\n@@REPLACE_FILE@@";
        assert!(!parse_directive(raw).is_action());
    }

    #[test]
    fn read_file_block_yields_trimmed_path() {
        let raw = "Let me look.\n@@READ_FILE_DIRECT@@\n  Cargo.toml \n@@READ_FILE_DIRECT@@\n";
        assert_eq!(
            parse_directive(raw),
            ActionDirective::ReadFile {
                explanation: "Let me look.".to_string(),
                path: "Cargo.toml".to_string(),
            }
        );
    }
}
