use std::{convert::TryFrom, path::Path};

use axum::body::Body as AxumBody;
use eyre::WrapErr;
use http_body_util::BodyExt;
use hyper::{Method, Request, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::ports::file_system::{FileSystem, FileSystemError, FileSystemResult};

/// File system adapter using tower-http ServeDir for static file serving
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Re-encode a decoded site path so it survives as a request URI.
fn encode_path(path: &str) -> String {
    let encoded: Vec<_> = path
        .trim_start_matches('/')
        .split('/')
        .map(urlencoding::encode)
        .collect();
    format!("/{}", encoded.join("/"))
}

impl FileSystem for FileSystemAdapter {
    async fn serve_file(
        &self,
        root: &str,
        path: &str,
        req: Request<AxumBody>,
    ) -> FileSystemResult<Response<AxumBody>> {
        let uri = hyper::Uri::try_from(encode_path(path))
            .wrap_err("Failed to parse URI for file serving")
            .map_err(|e| FileSystemError::InvalidPath(e.to_string()))?;

        let (mut parts, body) = req.into_parts();
        parts.uri = uri;
        // Files answer every method the way a GET would; HEAD keeps its empty body.
        if parts.method != Method::HEAD {
            parts.method = Method::GET;
        }
        let new_req = Request::from_parts(parts, body);

        let serve_dir = ServeDir::new(root).append_index_html_on_directories(false);

        let response = serve_dir
            .oneshot(new_req)
            .await
            .wrap_err("ServeDir failed to serve file")
            .map_err(|e| {
                FileSystemError::IoError(std::io::Error::other(format!("ServeDir error: {e}")))
            })?;

        let (parts, tower_body) = response.into_parts();
        let axum_body = AxumBody::new(tower_body.map_err(|e| {
            tracing::error!("Error reading static file body: {}", e);
            axum::Error::new(e)
        }));

        Ok(Response::from_parts(parts, axum_body))
    }

    async fn file_exists(&self, root: &str, path: &str) -> FileSystemResult<bool> {
        if path.ends_with('/') {
            return Ok(false);
        }
        let full_path = Path::new(root).join(path.trim_start_matches('/'));

        // Security check: ensure the resolved path is still within root
        let canonical_root = tokio::fs::canonicalize(root)
            .await
            .map_err(FileSystemError::IoError)?;
        let canonical_path = match tokio::fs::canonicalize(&full_path).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Only a plain miss when the parent still lives inside root
                let parent = match full_path.parent() {
                    Some(parent) => tokio::fs::canonicalize(parent).await.ok(),
                    None => None,
                };
                return match parent {
                    Some(parent) if parent.starts_with(&canonical_root) => Ok(false),
                    Some(_) => Err(FileSystemError::InvalidPath(
                        "Path traversal attempt detected".to_string(),
                    )),
                    None => Ok(false),
                };
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => return Ok(false),
            Err(e) => return Err(FileSystemError::IoError(e)),
        };

        if !canonical_path.starts_with(&canonical_root) {
            return Err(FileSystemError::InvalidPath(
                "Path traversal attempt detected".to_string(),
            ));
        }

        match tokio::fs::metadata(&canonical_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileSystemError::IoError(e)),
        }
    }
}
