//! Shared data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Error;

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(Error::Store(format!("Unknown chat role: {}", other))),
        }
    }
}

/// A chat turn about to be appended to the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatTurn {
    pub user_id: String,
    pub role: Role,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NewChatTurn {
    pub fn user(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::User,
            message: message.into(),
            metadata: None,
        }
    }

    pub fn assistant(user_id: impl Into<String>, message: impl Into<String>, language: &str) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Assistant,
            message: message.into(),
            metadata: Some(serde_json::json!({ "language": language })),
        }
    }
}

/// A persisted chat turn, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_id: String,
    pub role: Role,
    pub message: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Chat request payload.
///
/// Fields are optional so that a missing field is reported as invalid input
/// rather than as a malformed body.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(required, length(min = 1))]
    pub user_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub message: Option<String>,
    pub language: Option<String>,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            message: Some(message.into()),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Requested language, or the default.
    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// Metadata echoed back with every reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMetadata {
    pub language: String,
}

/// Chat response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub metadata: ReplyMetadata,
}
