//! Wellness Lambda - Handles the companion endpoints.
//!
//! Endpoints:
//! - GET /shield
//! - GET /notifications
//! - POST /analyze-mood
//! - POST /summarize

use api_gateway::{init_tracing, wellness};
use lambda_http::{run, service_fn, Error};
use shared::config::shield_mode_from_env;
use shared::wellness::ShieldStatus;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let shield = ShieldStatus {
        enabled: shield_mode_from_env()?,
    };

    run(service_fn(move |event| wellness::handler(shield, event))).await
}
