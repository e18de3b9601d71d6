//! Ordered rule evaluation.
//!
//! The stage list is fixed at startup: every header rule, then the shadowing
//! redirects, then the static file lookup, then the remaining redirects. Each
//! stage decides on its own whether the request goes on to the next one; the
//! I/O (files, upstreams) is left to the HTTP handler driving the list.
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::core::{
    auth,
    context::RequestContext,
    headers::HeaderRule,
    redirects::{Action, RedirectRule},
};

#[derive(Debug, Clone)]
pub enum Stage {
    Headers(HeaderRule),
    Redirect(RedirectRule),
    StaticFiles,
}

/// What a single stage wants done with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Move on to the next stage
    Continue,
    /// Basic-Auth failed; answer 401 and stop
    Deny,
    /// A redirect rule matched
    Execute(Action),
    /// Try the site root; move on if nothing is there
    ServeStatic,
}

impl Stage {
    pub fn decide(&self, ctx: &RequestContext, headers: &mut RuleHeaders) -> Decision {
        match self {
            Stage::Headers(rule) => {
                if !rule.matches(ctx.path()) {
                    return Decision::Continue;
                }
                headers.merge(rule);
                if rule.requires_auth() && !auth::authorize(rule.credentials(), ctx.authorization())
                {
                    tracing::debug!(
                        "Basic-Auth failed for {} (rule {})",
                        ctx.path(),
                        rule.pattern()
                    );
                    return Decision::Deny;
                }
                Decision::Continue
            }
            Stage::Redirect(rule) => match rule.matches(ctx) {
                Some(captures) => {
                    let action = rule.plan(ctx, &captures);
                    tracing::debug!(
                        "Redirect rule {} -> {} matched {}",
                        rule.pattern(),
                        rule.destination(),
                        ctx.path()
                    );
                    Decision::Execute(action)
                }
                None => Decision::Continue,
            },
            Stage::StaticFiles => Decision::ServeStatic,
        }
    }
}

/// Immutable stage list shared by every request.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(header_rules: Vec<HeaderRule>, redirect_rules: Vec<RedirectRule>) -> Self {
        let (shadowing, fallback): (Vec<_>, Vec<_>) = redirect_rules
            .into_iter()
            .partition(RedirectRule::is_shadowing);

        let stages = header_rules
            .into_iter()
            .map(Stage::Headers)
            .chain(shadowing.into_iter().map(Stage::Redirect))
            .chain(std::iter::once(Stage::StaticFiles))
            .chain(fallback.into_iter().map(Stage::Redirect))
            .collect();

        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn header_rule_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| matches!(stage, Stage::Headers(_)))
            .count()
    }

    pub fn redirect_rule_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| matches!(stage, Stage::Redirect(_)))
            .count()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Headers collected from every matching header rule, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RuleHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl RuleHeaders {
    /// Add a rule's headers; a later rule replaces the value of a name
    /// already collected.
    pub fn merge(&mut self, rule: &HeaderRule) {
        for entry in rule.headers() {
            match self.entries.iter_mut().find(|(name, _)| name == entry.name()) {
                Some((_, value)) => *value = entry.value().clone(),
                None => self
                    .entries
                    .push((entry.name().clone(), entry.value().clone())),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Set every collected header, replacing what is already there.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.entries {
            target.insert(name.clone(), value.clone());
        }
    }

    /// Set only the collected headers the target does not carry yet.
    pub fn apply_missing(&self, target: &mut HeaderMap) {
        for (name, value) in &self.entries {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
    }
}
