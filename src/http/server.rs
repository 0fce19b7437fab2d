//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the admin router in the shared middleware stack
//! - Bind to the listener and serve until the shutdown future resolves

use axum::http::HeaderName;
use axum::Router;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::ListenerConfig;
use crate::store::StoreConnector;

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for the operator API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<C: StoreConnector>(config: &ListenerConfig, state: AdminState<C>) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router<C: StoreConnector>(config: &ListenerConfig, state: AdminState<C>) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        setup_admin_router(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
