//! Chat relay: validates a message, rate-limits the caller, records the
//! conversation and returns the companion's reply.
//!
//! Only the latest user message is sent to the provider; stored history is
//! not replayed. Crisis detection looks at the inbound message, never at the
//! model's reply.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use crate::completion::{CompletionProvider, CompletionRequest, CompletionSettings, ProviderError};
use crate::crisis;
use crate::models::{ChatRequest, ChatResponse, NewChatTurn, ReplyMetadata};
use crate::rate_limit::RateLimiter;
use crate::store::ConversationStore;

/// Persona and safety instructions sent with every completion, version 1.
pub const SYSTEM_PROMPT_V1: &str = "
You are ConfidAI — an empathetic, confidential mental wellness companion for youth.
Speak in a calm, validating, and non-judgmental tone. Always prioritize user safety.
- Validate feelings first: reflect back what the user said.
- Offer short coping strategies (breathing, grounding, journaling prompts, short guided exercises).
- Avoid any medical/diagnostic claims; do not offer medication or therapy instructions.
- If the user expresses self-harm, suicidal thoughts, or immediate danger, reply with immediate safety instructions, local crisis resources if available, and advise contacting emergency services or trusted people. Do not refuse to escalate.
- Keep answers concise and actionable; if appropriate offer to open a guided exercise or journal prompt.
- Respect privacy — never ask for identifying info unnecessarily.
";

/// Reply used when the provider answers with no content.
pub const FALLBACK_REPLY: &str = "I couldn't process that.";

/// Terminal failures of a chat request. `Display` is the client-facing message.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing user_id or message")]
    InvalidInput,
    #[error("Too many requests")]
    RateLimited,
    #[error("OpenAI API request failed")]
    Upstream(#[source] ProviderError),
    #[error("Internal Server Error")]
    Unexpected(String),
}

impl RelayError {
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::InvalidInput => 400,
            RelayError::RateLimited => 429,
            RelayError::Upstream(_) => 502,
            RelayError::Unexpected(_) => 500,
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MalformedResponse(detail) => RelayError::Unexpected(detail),
            other => RelayError::Upstream(other),
        }
    }
}

/// The chat relay service. Stateless across calls apart from its collaborators.
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn CompletionProvider>,
    limiter: Arc<dyn RateLimiter>,
    settings: CompletionSettings,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            store,
            provider,
            limiter,
            settings: CompletionSettings::default(),
        }
    }

    /// Handle one chat message from `client_address`.
    pub async fn handle(
        &self,
        request: ChatRequest,
        client_address: &str,
    ) -> Result<ChatResponse, RelayError> {
        request.validate().map_err(|_| RelayError::InvalidInput)?;
        let language = request.language().to_string();
        let (Some(user_id), Some(message)) = (request.user_id, request.message) else {
            return Err(RelayError::InvalidInput);
        };

        if !self.limiter.allow(client_address) {
            warn!(client = %client_address, "Rate limit exceeded");
            return Err(RelayError::RateLimited);
        }

        info!(user_id = %user_id, language = %language, "Relaying chat message");

        if let Err(e) = self.store.insert(&NewChatTurn::user(&user_id, &message)).await {
            warn!(user_id = %user_id, error = %e, "Failed to store user turn");
        }

        let completion = self
            .provider
            .complete(CompletionRequest {
                system_prompt: SYSTEM_PROMPT_V1,
                user_message: &message,
                settings: self.settings,
            })
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Completion provider failed");
                RelayError::from(e)
            })?;

        let mut reply = completion
            .text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        if crisis::detect(&message) {
            warn!(user_id = %user_id, "Crisis language detected, replacing reply");
            reply = crisis::crisis_reply(&language);
        }

        if let Err(e) = self
            .store
            .insert(&NewChatTurn::assistant(&user_id, &reply, &language))
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to store assistant turn");
        }

        Ok(ChatResponse {
            reply,
            metadata: ReplyMetadata { language },
        })
    }
}
