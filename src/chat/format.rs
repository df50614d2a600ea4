//! `**emphasis**` markup in message text.

use std::sync::LazyLock;

use regex::Regex;

static EMPHASIS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").ok());

/// A run of text with uniform weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSpan {
    /// Text without markers.
    pub text: String,
    /// Whether the run was wrapped in `**`.
    pub bold: bool,
}

impl TextSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
        }
    }
}

/// Split `text` into plain and bold spans. Unpaired markers stay literal.
#[must_use]
pub fn parse_emphasis(text: &str) -> Vec<TextSpan> {
    let Some(pattern) = EMPHASIS.as_ref() else {
        return vec![TextSpan::plain(text)];
    };

    let mut spans = Vec::new();
    let mut cursor = 0;
    for captures in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            spans.push(TextSpan::plain(&text[cursor..whole.start()]));
        }
        spans.push(TextSpan {
            text: inner.as_str().to_string(),
            bold: true,
        });
        cursor = whole.end();
    }
    if cursor < text.len() {
        spans.push(TextSpan::plain(&text[cursor..]));
    }
    spans
}

/// Text with emphasis markers removed.
#[must_use]
pub fn strip_emphasis(text: &str) -> String {
    parse_emphasis(text).into_iter().map(|span| span.text).collect()
}
