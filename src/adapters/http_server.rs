use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, Request},
    middleware,
    response::Response,
    routing::{MethodRouter, any},
};
use eyre::{Result, WrapErr};
use tower_http::trace::TraceLayer;

use crate::{
    adapters::{
        http_handler::HttpHandler,
        middleware::{request_id_middleware, request_timing_middleware},
    },
    ports::{file_system::FileSystem, http_server::HttpServer},
    utils::GracefulShutdown,
};

fn request_route<F: FileSystem>(handler: Arc<HttpHandler<F>>) -> MethodRouter {
    any(move |req: Request| {
        let handler = handler.clone();
        async move {
            let client_addr = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            match handler.handle_request(req, client_addr).await {
                Ok(response) => Ok::<Response<Body>, Infallible>(response),
                Err(e) => {
                    tracing::error!("Request handling error: {:?}", e);
                    let mut response = Response::new(Body::from("Internal Server Error"));
                    *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                    Ok(response)
                }
            }
        }
    })
}

/// Router sending every method and path through the handler
pub fn build_router<F: FileSystem>(handler: Arc<HttpHandler<F>>) -> Router {
    Router::new()
        .route("/", request_route(handler.clone()))
        .route("/{*path}", request_route(handler))
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Plain HTTP listener serving the site router until shutdown
pub struct AxumServer {
    listen_addr: SocketAddr,
    router: Router,
    shutdown: GracefulShutdown,
}

impl AxumServer {
    pub fn new(listen_addr: SocketAddr, router: Router, shutdown: GracefulShutdown) -> Self {
        Self {
            listen_addr,
            router,
            shutdown,
        }
    }
}

impl HttpServer for AxumServer {
    async fn run(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .wrap_err_with(|| format!("Failed to bind to {}", self.listen_addr))?;
        let local_addr = listener
            .local_addr()
            .wrap_err("Failed to get local address")?;

        tracing::info!("jamgate listening on {}", local_addr);

        let shutdown = self.shutdown.clone();
        axum::serve(
            listener,
            self.router
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Draining connections after {:?}", reason);
        })
        .await
        .wrap_err("Server error")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        adapters::{FileSystemAdapter, HttpClientAdapter},
        core::{Pipeline, auth::DEFAULT_REALM},
    };

    fn router(dir: &TempDir) -> Router {
        let handler = HttpHandler::new(
            Arc::new(Pipeline::default()),
            Arc::new(HttpClientAdapter::new().unwrap()),
            Arc::new(FileSystemAdapter::new()),
            dir.path().to_str().unwrap(),
            DEFAULT_REALM,
        )
        .unwrap();
        build_router(Arc::new(handler))
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let shutdown = GracefulShutdown::new();
        let server = AxumServer::new("127.0.0.1:0".parse().unwrap(), router(&dir), shutdown.clone());

        let running = tokio::spawn(async move { server.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger_shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
