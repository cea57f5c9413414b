//! HTTP handlers for the wellness chat functions.
//!
//! Each Lambda binary serves one handler; the local server mounts all of them
//! behind [`route`].

pub mod chat;
pub mod state;
pub mod wellness;

use std::sync::Arc;

use lambda_http::{Body, Error, Request, Response};
use shared::http::error_response;

pub use state::AppState;

/// Dispatch a request to the handler owning its path.
pub async fn route(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path().trim_end_matches('/').to_string();

    match path.as_str() {
        chat::PATH => chat::handler(state, event).await,
        p if wellness::PATHS.contains(&p) => wellness::handler(state.shield, event).await,
        _ => error_response(404, "Not found"),
    }
}

/// Install the JSON tracing subscriber used by every binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}
