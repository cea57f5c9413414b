//! Application state shared across requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lambda_http::Error;
use shared::wellness::ShieldStatus;
use shared::{
    secrets, store, ChatRelay, Config, FixedWindowLimiter, OpenAiProvider, RateLimitConfig,
};
use tracing::{debug, info};

pub struct AppState {
    pub relay: ChatRelay,
    pub limiter: Arc<FixedWindowLimiter>,
    pub shield: ShieldStatus,
}

impl AppState {
    pub fn new(relay: ChatRelay, limiter: Arc<FixedWindowLimiter>, shield: ShieldStatus) -> Self {
        Self {
            relay,
            limiter,
            shield,
        }
    }

    /// Build the relay and its collaborators from configuration.
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let store = store::connect(&config.store).await?;

        let api_key = secrets::resolve_api_key(&config.openai_api_key).await?;
        let provider = OpenAiProvider::new(
            config.openai_base_url.clone(),
            api_key,
            config.openai_model.clone(),
            config.openai_timeout,
        )?;

        let limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit_max,
            window: config.rate_limit_window,
        }));

        info!(
            model = %config.openai_model,
            rate_limit_max = config.rate_limit_max,
            rate_limit_window_secs = config.rate_limit_window.as_secs(),
            "Chat relay configured"
        );

        let relay = ChatRelay::new(store, Arc::new(provider), limiter.clone());

        Ok(Self::new(
            relay,
            limiter,
            ShieldStatus {
                enabled: config.shield_mode_enabled,
            },
        ))
    }

    /// Periodically drop rate-limit records whose window has elapsed.
    pub fn spawn_rate_limit_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(&self.limiter);
        let period = limiter.config().window.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.purge_expired(Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = limiter.tracked_keys(), "Purged rate-limit records");
                }
            }
        })
    }
}
