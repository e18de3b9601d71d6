use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    body::Body as AxumBody,
    http::{StatusCode, header},
};
use eyre::{Result, WrapErr};
use hyper::{Request, Response, header::HeaderValue};

use crate::{
    adapters::{FileSystemAdapter, executor::RedirectExecutor},
    config::{DEFAULT_HEADERS_FILE, DEFAULT_REDIRECTS_FILE},
    core::{
        Action, Decision, Pipeline, RequestContext, RuleHeaders,
        auth::{UNAUTHORIZED_BODY, challenge},
    },
    ports::{
        file_system::{FileSystem, FileSystemError},
        http_client::HttpClient,
    },
};

const NOT_FOUND_BODY: &str = "Not Found\n";

/// Where a response came from; decides how rule headers are merged into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Local,
    Upstream,
}

/// HTTP handler that drives every request through the site's rule pipeline
pub struct HttpHandler<F = FileSystemAdapter> {
    pipeline: Arc<Pipeline>,
    file_system: Arc<F>,
    executor: RedirectExecutor<F>,
    root: String,
    /// Rule files are never served as static files
    rule_files: Vec<PathBuf>,
    challenge: HeaderValue,
}

impl<F: FileSystem> HttpHandler<F> {
    pub fn new(
        pipeline: Arc<Pipeline>,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<F>,
        root: impl Into<String>,
        realm: &str,
    ) -> Result<Self> {
        let root = root.into();
        let challenge = HeaderValue::from_str(&challenge(realm))
            .wrap_err_with(|| format!("Invalid auth realm: {realm}"))?;
        let executor = RedirectExecutor::new(http_client, file_system.clone(), root.clone());
        let rule_files = [DEFAULT_HEADERS_FILE, DEFAULT_REDIRECTS_FILE]
            .iter()
            .map(|name| Path::new(&root).join(name))
            .collect();

        Ok(Self {
            pipeline,
            file_system,
            executor,
            root,
            rule_files,
            challenge,
        })
    }

    /// Replace the rule file locations hidden from static lookups, by default
    /// `_headers` and `_redirects` in the site root.
    pub fn with_rule_files(mut self, rule_files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.rule_files = rule_files.into_iter().collect();
        self
    }

    /// Run the request through headers, shadowing redirects, static files and
    /// the remaining redirects; answer 404 when nothing handles it.
    pub async fn handle_request(
        &self,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>> {
        let (parts, body) = req.into_parts();
        let ctx = RequestContext::from_parts(&parts);
        let req = Request::from_parts(parts, body);

        tracing::debug!("Handling {} request to {}", ctx.method(), ctx.path());

        let mut rule_headers = RuleHeaders::default();
        for stage in self.pipeline.stages() {
            match stage.decide(&ctx, &mut rule_headers) {
                Decision::Continue => {}
                Decision::Deny => {
                    tracing::info!("Unauthorized request to {}", ctx.path());
                    let response = self.unauthorized()?;
                    return Ok(finish(response, &rule_headers, Origin::Local));
                }
                Decision::Execute(action) => {
                    let origin = match action {
                        Action::Proxy { .. } => Origin::Upstream,
                        _ => Origin::Local,
                    };
                    let response = self
                        .executor
                        .execute(action, &ctx, req, client_addr)
                        .await?;
                    return Ok(finish(response, &rule_headers, origin));
                }
                Decision::ServeStatic => {
                    if self.static_file_exists(ctx.path()).await? {
                        let response = self
                            .file_system
                            .serve_file(&self.root, ctx.path(), req)
                            .await
                            .wrap_err_with(|| format!("Failed to serve {}", ctx.path()))?;
                        return Ok(finish(response, &rule_headers, Origin::Local));
                    }
                }
            }
        }

        tracing::debug!("No file or rule for {}", ctx.path());
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(AxumBody::from(NOT_FOUND_BODY))
            .wrap_err("Failed to build 404 response")?;
        Ok(finish(response, &rule_headers, Origin::Local))
    }

    /// Traversal attempts and the rule files themselves are treated as a
    /// plain miss.
    async fn static_file_exists(&self, path: &str) -> Result<bool> {
        match self.file_system.file_exists(&self.root, path).await {
            Ok(true) => {
                if self.is_rule_file(path).await {
                    tracing::debug!("Refusing to serve rule file {}", path);
                    return Ok(false);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(FileSystemError::InvalidPath(reason)) => {
                tracing::warn!("Rejected static path {}: {}", path, reason);
                Ok(false)
            }
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to look up {path}")),
        }
    }

    async fn is_rule_file(&self, path: &str) -> bool {
        let requested = Path::new(&self.root).join(path.trim_start_matches('/'));
        let Ok(requested) = tokio::fs::canonicalize(&requested).await else {
            return false;
        };
        for rule_file in &self.rule_files {
            match tokio::fs::canonicalize(rule_file).await {
                Ok(rule_file) if rule_file == requested => return true,
                _ => {}
            }
        }
        false
    }

    fn unauthorized(&self) -> Result<Response<AxumBody>> {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(header::WWW_AUTHENTICATE, self.challenge.clone())
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(AxumBody::from(UNAUTHORIZED_BODY))
            .wrap_err("Failed to build unauthorized response")
    }
}

/// Rule headers win over local headers but never over upstream ones.
fn finish(
    mut response: Response<AxumBody>,
    rule_headers: &RuleHeaders,
    origin: Origin,
) -> Response<AxumBody> {
    match origin {
        Origin::Local => rule_headers.apply(response.headers_mut()),
        Origin::Upstream => rule_headers.apply_missing(response.headers_mut()),
    }
    response
}

impl<F> Clone for HttpHandler<F> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            file_system: self.file_system.clone(),
            executor: self.executor.clone(),
            root: self.root.clone(),
            rule_files: self.rule_files.clone(),
            challenge: self.challenge.clone(),
        }
    }
}
