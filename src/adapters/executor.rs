use std::{net::SocketAddr, sync::Arc};

use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{HeaderMap, Request, Response, StatusCode, Uri, header, header::HeaderValue};

use crate::{
    core::{RequestContext, redirects::Action},
    ports::{file_system::FileSystem, http_client::HttpClient},
};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Carries out the [`Action`] planned by a matched redirect rule.
pub struct RedirectExecutor<F> {
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<F>,
    root: String,
}

impl<F> Clone for RedirectExecutor<F> {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            file_system: self.file_system.clone(),
            root: self.root.clone(),
        }
    }
}

impl<F: FileSystem> RedirectExecutor<F> {
    pub fn new(http_client: Arc<dyn HttpClient>, file_system: Arc<F>, root: impl Into<String>) -> Self {
        Self {
            http_client,
            file_system,
            root: root.into(),
        }
    }

    pub async fn execute(
        &self,
        action: Action,
        ctx: &RequestContext,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>> {
        match action {
            Action::Redirect { location, status } => redirect(&location, status),
            Action::Proxy { url } => Ok(self.proxy(&url, ctx, req, client_addr).await),
            Action::Rewrite { path, status } => self.rewrite(&path, status, req).await,
            Action::ServeRequestPath { path } => self.serve(&path, req).await,
        }
    }

    async fn proxy(
        &self,
        url: &str,
        ctx: &RequestContext,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Response<AxumBody> {
        let target = match (url.contains('?'), ctx.raw_query()) {
            (false, Some(query)) if !query.is_empty() => format!("{url}?{query}"),
            _ => url.to_string(),
        };
        let uri: Uri = match target.parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!("Proxy destination {} is not a valid URI: {}", target, e);
                return internal_error();
            }
        };

        let (mut parts, body) = req.into_parts();
        forwarded_headers(&mut parts.headers, client_addr);
        parts.uri = uri;

        tracing::info!("Proxying {} {} to {}", parts.method, ctx.path(), target);
        match self
            .http_client
            .send_request(Request::from_parts(parts, body))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Proxy request to {} failed: {}", target, e);
                internal_error()
            }
        }
    }

    async fn rewrite(
        &self,
        path: &str,
        status: StatusCode,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>> {
        let mut response = self.serve(path, req).await?;
        if response.status() == StatusCode::OK && status != StatusCode::OK {
            *response.status_mut() = status;
        }
        Ok(response)
    }

    async fn serve(&self, path: &str, req: Request<AxumBody>) -> Result<Response<AxumBody>> {
        tracing::debug!("Serving {} from {}", path, self.root);
        self.file_system
            .serve_file(&self.root, path, req)
            .await
            .wrap_err_with(|| format!("Failed to serve {path}"))
    }
}

fn redirect(location: &str, status: StatusCode) -> Result<Response<AxumBody>> {
    let location =
        HeaderValue::from_str(location).wrap_err("Redirect destination is not a valid header")?;
    Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .body(AxumBody::empty())
        .wrap_err("Failed to build redirect response")
}

fn internal_error() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Drop `Host` and describe the original request in `X-Forwarded-*`.
fn forwarded_headers(headers: &mut HeaderMap, client_addr: Option<SocketAddr>) {
    let original_host = headers.remove(header::HOST);

    if let Some(addr) = client_addr {
        let client_ip = addr.ip().to_string();
        let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {client_ip}"),
            None => client_ip,
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
}
