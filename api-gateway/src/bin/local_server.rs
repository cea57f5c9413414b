//! Local development server.
//!
//! Serves every function on one port (`PORT`, default 3000) by converting
//! each request into the Lambda request type and dispatching it through
//! [`api_gateway::route`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use api_gateway::{init_tracing, route, AppState};
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use shared::http::ClientAddress;
use shared::Config;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

async fn dispatch(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(peer = %peer, error = %e, "Rejected request body");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(serde_json::json!({ "error": "Request body too large" })),
            )
                .into_response();
        }
    };

    let mut event = lambda_http::Request::from_parts(parts, lambda_http::Body::from(bytes.to_vec()));
    event
        .extensions_mut()
        .insert(ClientAddress(peer.ip().to_string()));

    match route(state, event).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, axum::body::Body::from(body.as_ref().to_vec()))
        }
        Err(e) => {
            error!(error = %e, "Handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let state = Arc::new(
        AppState::from_config(&config)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to initialise chat relay")?,
    );
    state.spawn_rate_limit_sweeper();

    let app = Router::new().fallback(dispatch).with_state(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, "Chat service listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
