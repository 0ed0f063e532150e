//! Display rendering of `<think>` spans in model output.

use std::sync::LazyLock;

use regex::Regex;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("think regex is valid"));

/// A run of response text, tagged by whether it came from a `<think>` span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Thinking(&'a str),
}

/// Split a response into plain and thinking segments, in order.
///
/// An unclosed `<think>` tag is left in the plain text.
pub fn segments(response: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for caps in THINK_RE.captures_iter(response) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Text(&response[last..whole.start()]));
        }
        out.push(Segment::Thinking(inner.as_str()));
        last = whole.end();
    }
    if last < response.len() {
        out.push(Segment::Text(&response[last..]));
    }
    out
}

/// Render a response for display, keeping or dropping thinking segments.
///
/// `style_thinking` decorates kept thinking text (e.g. dims it on a terminal).
pub fn render_response(
    response: &str,
    show_thinking: bool,
    style_thinking: impl Fn(&str) -> String,
) -> String {
    let mut out = String::with_capacity(response.len());
    for segment in segments(response) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Thinking(text) if show_thinking => out.push_str(&style_thinking(text)),
            Segment::Thinking(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_think_spans() {
        assert_eq!(
            segments("a<think>b</think>c"),
            vec![
                Segment::Text("a"),
                Segment::Thinking("b"),
                Segment::Text("c")
            ]
        );
    }

    #[test]
    fn hides_thinking_when_disabled() {
        let rendered = render_response("<think>\nplan\n</think>Answer", false, str::to_string);
        assert_eq!(rendered, "Answer");
    }

    #[test]
    fn styles_thinking_when_enabled() {
        let rendered = render_response("x<think>y</think>z", true, |t| format!("[{t}]"));
        assert_eq!(rendered, "x[y]z");
    }

    #[test]
    fn unclosed_think_tag_is_plain_text() {
        let rendered = render_response("<think>never closed", false, str::to_string);
        assert_eq!(rendered, "<think>never closed");
    }
}
