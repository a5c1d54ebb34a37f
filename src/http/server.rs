//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the application router in the protection pipeline
//! - Add the per-request access log
//! - Serve with peer addresses available to the guards
//! - Run the rate limit sweeper for the lifetime of the server
//! - Drain in-flight requests on shutdown

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::pipeline::Pipeline;
use crate::security::FixedWindowLimiter;

/// HTTP server for a protected application.
pub struct ShieldServer {
    router: Router,
    limiter: Option<Arc<FixedWindowLimiter>>,
    sweep_interval: Duration,
}

impl ShieldServer {
    pub fn new(pipeline: &Pipeline, app: Router) -> Self {
        let config = pipeline.config();
        let router = Self::build_router(pipeline, app);

        Self {
            router,
            limiter: config
                .rate_limiting
                .enabled
                .then(|| pipeline.limiter().clone()),
            sweep_interval: Duration::from_secs(config.rate_limiting.sweep_interval_secs),
        }
    }

    fn build_router(pipeline: &Pipeline, app: Router) -> Router {
        pipeline.wrap(app).layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until a shutdown event arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(limiter) = self.limiter {
            tokio::spawn(limiter.run_sweeper(self.sweep_interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
