//! jamgate - a static site server driven by `_headers` and `_redirects` rule files.
//!
//! jamgate serves a directory over HTTP the way common JAMstack hosts do. Two
//! optional files at the site root shape every response:
//!
//! * `_headers` attaches extra response headers, and HTTP Basic-Auth gates, to
//!   URL patterns
//! * `_redirects` maps URL patterns to redirects, rewrites or reverse-proxy
//!   targets
//!
//! # Request pipeline
//! Every request walks a fixed list of stages built once at startup:
//!
//! 1. all header rules (each matching rule contributes headers; a failed
//!    Basic-Auth check answers `401`)
//! 2. redirect rules marked with `!` (shadowing), in file order
//! 3. a file at the request path under the site root
//! 4. the remaining redirect rules, in file order
//! 5. `404`
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use jamgate::{
//!     FileSystemAdapter, HttpClientAdapter, HttpHandler, build_router,
//!     config::{ConfigOverrides, load_config, load_pipeline},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg = load_config(Some("jamgate.toml"), &ConfigOverrides::default()).await?;
//! let pipeline = load_pipeline(&cfg).await?;
//! let handler = HttpHandler::new(
//!     Arc::new(pipeline),
//!     Arc::new(HttpClientAdapter::new()?),
//!     Arc::new(FileSystemAdapter::new()),
//!     cfg.root.clone(),
//!     &cfg.auth_realm,
//! )?;
//! let app = build_router(Arc::new(handler));
//! # let _ = app;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! rule parsing, matching and planning inside `core`, which performs no I/O.
//!
//! # Error Handling
//! Rule files fail with [`core::RuleError`], naming the error class and the line. Everything
//! above the core returns `eyre::Result<T>` with context attached through `WrapErr`.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{
        AxumServer, FileSystemAdapter, HttpClientAdapter, HttpHandler, RedirectExecutor,
        build_router,
    },
    core::{Pipeline, RuleError},
    ports::{http_client::HttpClient, http_server::HttpServer},
    utils::GracefulShutdown,
};
