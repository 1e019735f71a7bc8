//! HTTP server bootstrap.

use axum::{Router, http::HeaderValue};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use sitechat_core::Services;
use sitechat_shared::{AppConfig, ServerConfig};

use crate::routes::{AppState, routes};

/// Build the CORS layer. No configured origins means any origin is allowed.
pub(crate) fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| eyre!("invalid CORS origin '{origin}': {e}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Full application: routes plus CORS and request tracing.
pub(crate) fn app(config: &AppConfig, services: Services) -> Result<Router> {
    let state = AppState::new(services, config.server.expose_upstream_errors);

    Ok(routes(state)
        .layer(cors_layer(&config.server)?)
        .layer(TraceLayer::new_for_http()))
}

/// Bind and serve until Ctrl-C.
pub(crate) async fn run(config: &AppConfig, services: Services) -> Result<()> {
    let app = app(config, services)?;

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = TcpListener::bind((host, port))
        .await
        .wrap_err_with(|| format!("failed to bind {host}:{port}"))?;
    let addr = listener.local_addr().wrap_err("listener has no local address")?;

    info!(%addr, "sitechat listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
