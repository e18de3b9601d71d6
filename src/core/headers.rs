//! `_headers` rules: extra response headers and Basic-Auth gates per pattern.
//!
//! ```text
//! /secret/*            # inline comments are allowed
//!   X-Frame-Options: DENY
//!   Link: </style.css>; rel=preload
//!   Link: </app.js>; rel=preload
//!   Basic-Auth: alice:wonder bob:builder
//! ```
//!
//! A non-indented line opens a rule; the indented lines under it are its
//! directives. Repeating a header name appends a value, and the values go out
//! joined with `", "`.
use http::{HeaderName, HeaderValue};

use crate::core::{
    auth::Credential,
    error::{RuleError, RuleResult},
    lines::{Line, split_lines},
    pattern::Pattern,
};

const BASIC_AUTH: &str = "Basic-Auth";

/// One header name with every value configured for it, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    name: HeaderName,
    values: Vec<String>,
    joined: HeaderValue,
}

impl HeaderEntry {
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// All values joined with `", "`, ready to put on a response.
    pub fn value(&self) -> &HeaderValue {
        &self.joined
    }
}

/// A pattern plus the headers and credentials attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pattern: Pattern,
    headers: Vec<HeaderEntry>,
    credentials: Vec<Credential>,
}

impl HeaderRule {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn headers(&self) -> &[HeaderEntry] {
        &self.headers
    }

    /// Value list configured for `name`, if any.
    pub fn header(&self, name: &str) -> Option<&HeaderEntry> {
        self.headers.iter().find(|entry| entry.name == name)
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn requires_auth(&self) -> bool {
        !self.credentials.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path).is_some()
    }
}

/// Rule under construction while its directives are being read.
struct PendingRule<'a> {
    opened_at: Line<'a>,
    pattern: Pattern,
    headers: Vec<HeaderEntry>,
    credentials: Vec<Credential>,
    basic_auth_seen: bool,
}

impl<'a> PendingRule<'a> {
    fn open(line: Line<'a>) -> RuleResult<Self> {
        let pattern =
            Pattern::compile(line.content()).map_err(|source| RuleError::InvalidPattern {
                line: line.number,
                text: line.text.to_string(),
                source,
            })?;
        Ok(Self {
            opened_at: line,
            pattern,
            headers: Vec::new(),
            credentials: Vec::new(),
            basic_auth_seen: false,
        })
    }

    fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.credentials.is_empty()
    }

    fn add_directive(&mut self, line: Line<'_>) -> RuleResult<()> {
        let content = line.content();
        if content.is_empty() {
            return Ok(());
        }

        let malformed = || RuleError::MalformedDirective {
            line: line.number,
            text: line.text.to_string(),
        };
        let (key, value) = content.split_once(':').ok_or_else(malformed)?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            return Err(malformed());
        }

        if key.eq_ignore_ascii_case(BASIC_AUTH) {
            self.add_credentials(line, value)
        } else {
            self.add_header(line, key, value)
        }
    }

    fn add_credentials(&mut self, line: Line<'_>, value: &str) -> RuleResult<()> {
        if self.basic_auth_seen {
            return Err(RuleError::DuplicateBasicAuth {
                line: line.number,
                text: line.text.to_string(),
            });
        }
        self.basic_auth_seen = true;

        if value.is_empty() {
            return Err(RuleError::InvalidCredential {
                line: line.number,
                pair: String::new(),
            });
        }
        for pair in value.split_whitespace() {
            let (username, password) =
                pair.split_once(':')
                    .ok_or_else(|| RuleError::InvalidCredential {
                        line: line.number,
                        pair: pair.to_string(),
                    })?;
            self.credentials.push(Credential::new(username, password));
        }
        Ok(())
    }

    fn add_header(&mut self, line: Line<'_>, key: &str, value: &str) -> RuleResult<()> {
        let invalid = || RuleError::InvalidHeader {
            line: line.number,
            text: line.text.to_string(),
        };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?;
        HeaderValue::from_str(value).map_err(|_| invalid())?;

        match self.headers.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.values.push(value.to_string());
                entry.joined = HeaderValue::from_str(&entry.values.join(", "))
                    .map_err(|_| invalid())?;
            }
            None => {
                let joined = HeaderValue::from_str(value).map_err(|_| invalid())?;
                self.headers.push(HeaderEntry {
                    name,
                    values: vec![value.to_string()],
                    joined,
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> HeaderRule {
        HeaderRule {
            pattern: self.pattern,
            headers: self.headers,
            credentials: self.credentials,
        }
    }
}

/// Parse the contents of a `_headers` file.
pub fn parse_header_rules(input: &[u8]) -> RuleResult<Vec<HeaderRule>> {
    let mut rules = Vec::new();
    let mut current: Option<PendingRule<'_>> = None;

    for line in split_lines(input)? {
        if line.is_comment() || line.is_blank() {
            continue;
        }

        if !line.is_indented() {
            if let Some(rule) = current.take() {
                if rule.is_empty() {
                    return Err(RuleError::MissingDirective {
                        line: line.number,
                        text: line.text.to_string(),
                    });
                }
                rules.push(rule.finish());
            }
            current = Some(PendingRule::open(line)?);
            continue;
        }

        let Some(rule) = current.as_mut() else {
            return Err(RuleError::DanglingDirective {
                line: line.number,
                text: line.text.to_string(),
            });
        };
        rule.add_directive(line)?;
    }

    if let Some(rule) = current {
        if rule.is_empty() {
            return Err(RuleError::UnclosedRule {
                line: rule.opened_at.number,
                text: rule.opened_at.text.to_string(),
            });
        }
        rules.push(rule.finish());
    }

    tracing::debug!("Parsed {} header rules", rules.len());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_only_config_is_empty() {
        let rules = parse_header_rules(b"# just a comment\n\n   # another\n").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_single_rule() {
        let config = "\n/foo\n\tX-TEST-HEADER: bar\n\t";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].pattern().as_str(), "/foo");
        assert!(rules[0].matches("/foo"));
        assert!(!rules[0].requires_auth());
        assert_eq!(rules[0].header("x-test-header").unwrap().value(), "bar");
    }

    #[test]
    fn test_repeated_header_values_are_joined_in_order() {
        let config = "/foo\n  X-TEST-HEADER: bar\n  X-TEST-HEADER: baz\n";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        let entry = rules[0].header("X-TEST-HEADER").unwrap();
        assert_eq!(entry.values(), ["bar", "baz"]);
        assert_eq!(entry.value(), "bar, baz");
    }

    #[test]
    fn test_header_order_and_colons_in_values() {
        let config = "/*  # everything\n  X-B: 1\n  Link: <http://x.test:8080/a>; rel=preload\n  X-A: 2 # two\n";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        let names: Vec<&str> = rules[0].headers().iter().map(|e| e.name().as_str()).collect();
        assert_eq!(names, vec!["x-b", "link", "x-a"]);
        assert_eq!(
            rules[0].header("link").unwrap().value(),
            "<http://x.test:8080/a>; rel=preload"
        );
        assert_eq!(rules[0].header("x-a").unwrap().value(), "2");
        assert!(rules[0].matches("/anything/at/all"));
    }

    #[test]
    fn test_multiple_rules() {
        let config = "/a\n  X-One: 1\n/b/:id\n  X-Two: 2\n  X-Three: 3\n";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[1].matches("/b/42"));
        assert_eq!(rules[1].headers().len(), 2);
    }

    #[test]
    fn test_basic_auth_pairs_on_one_line() {
        let config = "/secret.json\n  Basic-Auth: foo:bar aaa:bbb\n";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        assert!(rules[0].requires_auth());
        assert_eq!(
            rules[0].credentials(),
            [Credential::new("foo", "bar"), Credential::new("aaa", "bbb")]
        );
        assert!(rules[0].headers().is_empty());
    }

    #[test]
    fn test_auth_only_rule_followed_by_path() {
        let config = "/secret\n  Basic-Auth: u:p\n/public\n  X-Open: yes\n";
        let rules = parse_header_rules(config.as_bytes()).unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_duplicate_basic_auth_line() {
        let config = "/secret\n  Basic-Auth: foo:bar\n  Basic-Auth: aaa:bbb\n";
        let err = parse_header_rules(config.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateBasicAuth { line: 3, .. }));
    }

    #[test]
    fn test_invalid_credential_pair() {
        let config = "/secret\n  Basic-Auth: foobar\n";
        let err = parse_header_rules(config.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidCredential {
                line: 2,
                pair: "foobar".to_string()
            }
        );
    }

    #[test]
    fn test_path_without_headers_is_an_error() {
        let config = "/foo\n/bar\n  X-Test: 1\n";
        let err = parse_header_rules(config.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleError::MissingDirective { line: 2, .. }));
    }

    #[test]
    fn test_dangling_header() {
        let config = "  X-Test: 1\n/foo\n  X-Test: 2\n";
        let err = parse_header_rules(config.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleError::DanglingDirective { line: 1, .. }));
    }

    #[test]
    fn test_unclosed_final_rule() {
        let config = "/foo\n  X-Test: 1\n/bar # no headers\n";
        let err = parse_header_rules(config.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleError::UnclosedRule { line: 3, .. }));
    }

    #[test]
    fn test_malformed_and_invalid_directives() {
        let err = parse_header_rules(b"/foo\n  no colon here\n").unwrap_err();
        assert!(matches!(err, RuleError::MalformedDirective { line: 2, .. }));

        let err = parse_header_rules(b"/foo\n  : value\n").unwrap_err();
        assert!(matches!(err, RuleError::MalformedDirective { .. }));

        let err = parse_header_rules(b"/foo\n  Bad Name: value\n").unwrap_err();
        assert!(matches!(err, RuleError::InvalidHeader { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = parse_header_rules(b"foo\n  X-Test: 1\n").unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { line: 1, .. }));
    }

    #[test]
    fn test_reparse_is_identical() {
        let config = b"/a/*\n  X-One: 1\n  X-One: 2\n  Basic-Auth: u:p\n/b\n  X-Two: 2\n";
        assert_eq!(
            parse_header_rules(config).unwrap(),
            parse_header_rules(config).unwrap()
        );
    }
}
