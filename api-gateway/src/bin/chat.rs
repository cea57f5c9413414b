//! Chat Lambda - Handles the POST /chat endpoint.
//!
//! Validates the message, rate-limits the caller, stores both conversation
//! turns and returns the companion's reply.

use api_gateway::{chat, init_tracing, AppState};
use lambda_http::{run, service_fn, Error};
use shared::Config;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    state.spawn_rate_limit_sweeper();

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { chat::handler(state, event).await }
    }))
    .await
}
