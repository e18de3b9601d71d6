//! `_redirects` rules: redirects, rewrites and proxy targets.
//!
//! One rule per line:
//!
//! ```text
//! <pattern> [param=:var ...] <destination> [status[!]]
//! ```
//!
//! * the status defaults to `301`; a `!` suffix makes the rule *shadowing*,
//!   meaning it is evaluated before static files and can override them
//! * a destination starting with `http://` or `https://` turns the rule into a
//!   proxy when the status is not a redirection
//! * any other non-redirect status is a rewrite: the destination is served
//!   from the site root
use std::borrow::Cow;

use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{
    context::RequestContext,
    error::{RuleError, RuleResult},
    lines::{fields, split_lines},
    pattern::{Captures, Pattern},
};

const SPLAT_TOKEN: &str = ":splat";

/// Methods a proxy rule answers to. Everything else only answers `GET`.
pub const PROXY_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

static PLACEHOLDER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[^/]+").expect("placeholder token regex is valid"));

/// `param=:var`: the rule only applies when `param` is present on the request,
/// and its value replaces `:var` in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConstraint {
    pub param: String,
    pub placeholder: String,
}

/// What to do with a request matched by a redirect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Answer with a redirection to `location`
    Redirect { location: String, status: StatusCode },
    /// Forward the request to an absolute URL
    Proxy { url: String },
    /// Serve a file from the site root under `status`
    Rewrite { path: String, status: StatusCode },
    /// Query constraints were not met: serve the request path as-is.
    ///
    /// [`RedirectRule::matches`] already skips such rules, so the pipeline
    /// never produces this; it is only returned when [`RedirectRule::plan`]
    /// is called on a path match alone.
    ServeRequestPath { path: String },
}

/// How captured values are written into a destination.
#[derive(Debug, Clone, Copy)]
enum Substitution {
    /// Decoded, for destinations served from the site root
    Verbatim,
    /// Percent-encoded, for destinations that leave as a URL
    UrlEncoded,
}

impl Substitution {
    fn value(self, value: &str) -> Cow<'_, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(value),
            Self::UrlEncoded => urlencoding::encode(value),
        }
    }

    /// Encode each `/`-separated piece and keep the separators.
    fn path(self, value: &str) -> Cow<'_, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(value),
            Self::UrlEncoded => Cow::Owned(
                value
                    .split('/')
                    .map(urlencoding::encode)
                    .collect::<Vec<_>>()
                    .join("/"),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pattern: Pattern,
    destination: String,
    queries: Vec<QueryConstraint>,
    status: StatusCode,
    shadowing: bool,
}

impl RedirectRule {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Destination template as written in the rule file.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn queries(&self) -> &[QueryConstraint] {
        &self.queries
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_shadowing(&self) -> bool {
        self.shadowing
    }

    pub fn is_proxy(&self) -> bool {
        self.destination.starts_with("http://") || self.destination.starts_with("https://")
    }

    pub fn accepts_method(&self, method: &Method) -> bool {
        if self.is_proxy() {
            PROXY_METHODS.contains(method)
        } else {
            method == Method::GET
        }
    }

    /// Whether every query parameter this rule depends on is on the request.
    pub fn queries_satisfied(&self, ctx: &RequestContext) -> bool {
        self.queries
            .iter()
            .all(|q| ctx.query_param(&q.param).is_some())
    }

    /// Match method, path and query constraints against a request.
    pub fn matches(&self, ctx: &RequestContext) -> Option<Captures> {
        if !self.accepts_method(ctx.method()) {
            return None;
        }
        let captures = self.pattern.matches(ctx.path())?;
        self.queries_satisfied(ctx).then_some(captures)
    }

    /// Compute the concrete destination for one request, with captured values
    /// substituted as they appear in the decoded request.
    ///
    /// A trailing `:splat` takes precedence, then query placeholders, then
    /// path placeholders. Tokens that name no capture are left untouched so
    /// ports in absolute URLs survive.
    pub fn resolve_destination(&self, ctx: &RequestContext, captures: &Captures) -> String {
        self.resolve(ctx, captures, Substitution::Verbatim)
    }

    /// Like [`Self::resolve_destination`], but every substituted value is
    /// percent-encoded so the result can be used as a URL or `Location`.
    pub fn resolve_url(&self, ctx: &RequestContext, captures: &Captures) -> String {
        self.resolve(ctx, captures, Substitution::UrlEncoded)
    }

    fn resolve(&self, ctx: &RequestContext, captures: &Captures, subst: Substitution) -> String {
        let template = self.destination.as_str();

        if let Some(prefix) = template.strip_suffix(SPLAT_TOKEN) {
            let splat = captures.splat().unwrap_or_default();
            return format!("{prefix}{}", subst.path(splat));
        }

        if !self.queries.is_empty() {
            return self.queries.iter().fold(template.to_string(), |acc, q| {
                let value = ctx.query_param(&q.param).unwrap_or_default();
                acc.replacen(&format!(":{}", q.placeholder), &subst.value(value), 1)
            });
        }

        if template.contains(':') {
            return PLACEHOLDER_TOKEN
                .replace_all(template, |token: &regex::Captures<'_>| {
                    let token = &token[0];
                    captures
                        .get(&token[1..])
                        .map_or_else(|| token.to_string(), |v| subst.value(v).into_owned())
                })
                .into_owned();
        }

        template.to_string()
    }

    /// Decide what a matched request turns into.
    pub fn plan(&self, ctx: &RequestContext, captures: &Captures) -> Action {
        if !self.queries_satisfied(ctx) {
            return Action::ServeRequestPath {
                path: ctx.path().to_string(),
            };
        }

        if self.status.is_redirection() {
            Action::Redirect {
                location: self.resolve_url(ctx, captures),
                status: self.status,
            }
        } else if self.is_proxy() {
            Action::Proxy {
                url: self.resolve_url(ctx, captures),
            }
        } else {
            Action::Rewrite {
                path: self.resolve_destination(ctx, captures),
                status: self.status,
            }
        }
    }
}

/// Parse the contents of a `_redirects` file.
pub fn parse_redirect_rules(input: &[u8]) -> RuleResult<Vec<RedirectRule>> {
    let mut rules = Vec::new();
    for line in split_lines(input)? {
        let content = line.content();
        if line.is_comment() || content.is_empty() {
            continue;
        }
        rules.push(parse_rule(line.number, line.text, content)?);
    }

    tracing::debug!("Parsed {} redirect rules", rules.len());
    Ok(rules)
}

fn parse_rule(number: usize, text: &str, content: &str) -> RuleResult<RedirectRule> {
    let fields = fields(content);
    if fields.len() < 2 {
        return Err(RuleError::TooFewFields {
            line: number,
            text: text.to_string(),
        });
    }

    let pattern = Pattern::compile(fields[0]).map_err(|source| RuleError::InvalidPattern {
        line: number,
        text: text.to_string(),
        source,
    })?;

    let mut rest = fields[1..].iter();
    let mut queries = Vec::new();
    let destination = loop {
        let Some(field) = rest.next() else {
            return Err(RuleError::MissingDestination {
                line: number,
                text: text.to_string(),
            });
        };
        match field.split_once("=:") {
            Some((param, placeholder)) if !field.contains('/') => queries.push(QueryConstraint {
                param: param.to_string(),
                placeholder: placeholder.to_string(),
            }),
            _ => break field.to_string(),
        }
    };

    let mut status = StatusCode::MOVED_PERMANENTLY;
    let mut shadowing = false;
    if let Some(field) = rest.next() {
        let code = match field.strip_suffix('!') {
            Some(code) => {
                shadowing = true;
                code
            }
            None => field,
        };
        status = code
            .parse::<u16>()
            .ok()
            .filter(|code| (100..=599).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| RuleError::InvalidStatus {
                line: number,
                text: text.to_string(),
            })?;
    }

    if rest.next().is_some() {
        return Err(RuleError::ExcessFields {
            line: number,
            text: text.to_string(),
        });
    }

    Ok(RedirectRule {
        pattern,
        destination,
        queries,
        status,
        shadowing,
    })
}
