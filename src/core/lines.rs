//! Line handling shared by the `_headers` and `_redirects` parsers.
use crate::core::error::{RuleError, RuleResult};

/// One physical line of a rule file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// 1-based line number
    pub number: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// A line whose first non-blank character is `#`.
    pub fn is_comment(&self) -> bool {
        self.text.trim_start().starts_with('#')
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim_matches(BLANK).is_empty()
    }

    /// Lines starting with a space or tab belong to the rule above them.
    pub fn is_indented(&self) -> bool {
        self.text.starts_with(BLANK)
    }

    /// The line without its inline comment and surrounding blanks.
    pub fn content(&self) -> &'a str {
        strip_inline_comment(self.text).trim_matches(BLANK)
    }
}

const BLANK: &[char] = &[' ', '\t'];

/// Split raw rule file bytes into numbered lines, skipping nothing.
pub(crate) fn split_lines(input: &[u8]) -> RuleResult<Vec<Line<'_>>> {
    let text = std::str::from_utf8(input).map_err(|e| RuleError::Encoding(e.to_string()))?;
    Ok(text
        .split('\n')
        .enumerate()
        .map(|(i, raw)| Line {
            number: i + 1,
            text: raw.strip_suffix('\r').unwrap_or(raw),
        })
        .collect())
}

/// Drop everything from the first `#` that has at least one character after it.
pub(crate) fn strip_inline_comment(text: &str) -> &str {
    match text.find('#') {
        Some(idx) if idx + 1 < text.len() => &text[..idx],
        _ => text,
    }
}

/// Fields separated by runs of spaces or tabs.
pub(crate) fn fields(text: &str) -> Vec<&str> {
    text.split(BLANK).filter(|f| !f.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_numbers_and_crlf() {
        let lines = split_lines(b"/a\r\n\tX: y\n").unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].text, "/a");
        assert_eq!(lines[1].text, "\tX: y");
        assert!(lines[2].is_blank());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(matches!(
            split_lines(&[0xff, 0xfe]),
            Err(RuleError::Encoding(_))
        ));
    }

    #[test]
    fn test_inline_comment_stripping() {
        assert_eq!(strip_inline_comment("/foo # hi"), "/foo ");
        assert_eq!(strip_inline_comment("/foo #"), "/foo #");
        assert_eq!(strip_inline_comment("/foo"), "/foo");
    }

    #[test]
    fn test_line_classification() {
        let comment = Line { number: 1, text: "   # note" };
        assert!(comment.is_comment());
        let indented = Line { number: 2, text: "\tX-Frame-Options: DENY # why" };
        assert!(indented.is_indented());
        assert_eq!(indented.content(), "X-Frame-Options: DENY");
    }

    #[test]
    fn test_only_spaces_and_tabs_indent() {
        assert!(Line { number: 1, text: " X: y" }.is_indented());
        assert!(Line { number: 1, text: "\tX: y" }.is_indented());

        let nbsp = Line { number: 1, text: "\u{a0}/foo" };
        assert!(!nbsp.is_indented());
        assert!(!nbsp.is_blank());
        assert_eq!(nbsp.content(), "\u{a0}/foo");
    }

    #[test]
    fn test_fields_collapse_runs() {
        assert_eq!(fields("/a \t id=:id   /b"), vec!["/a", "id=:id", "/b"]);
    }
}
