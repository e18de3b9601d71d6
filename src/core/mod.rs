pub mod auth;
pub mod context;
pub mod error;
pub mod headers;
pub(crate) mod lines;
pub mod pattern;
pub mod pipeline;
pub mod redirects;

pub use context::RequestContext;
pub use error::{RuleError, RuleResult};
pub use headers::{HeaderRule, parse_header_rules};
pub use pattern::{Captures, Pattern, PatternError};
pub use pipeline::{Decision, Pipeline, RuleHeaders, Stage};
pub use redirects::{Action, RedirectRule, parse_redirect_rules};
