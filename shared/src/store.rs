//! Conversation store backends.
//!
//! Chat turns are append-only. Every backend writes to the `chat_history`
//! table (or its in-memory stand-in) and reads a user's turns back oldest
//! first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::StoreConfig;
use crate::models::{ChatTurn, NewChatTurn};
use crate::{db, secrets, Error, Result};

/// Table holding every chat turn.
pub const CHAT_HISTORY_TABLE: &str = "chat_history";

/// Append-only storage for chat turns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one turn.
    async fn insert(&self, turn: &NewChatTurn) -> Result<()>;

    /// The latest `limit` turns for a user, oldest first.
    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>>;
}

/// Build the store selected by configuration.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn ConversationStore>> {
    let store: Arc<dyn ConversationStore> = match config {
        StoreConfig::Supabase {
            url,
            service_role_key,
        } => {
            info!("Using Supabase conversation store");
            Arc::new(PostgrestStore::new(
                reqwest::Client::new(),
                url.clone(),
                service_role_key.clone(),
            ))
        }
        StoreConfig::Postgres { database_url } => {
            info!("Using Postgres conversation store");
            Arc::new(PgStore::new(db::create_pool(database_url).await?))
        }
        StoreConfig::PostgresSecret {
            host,
            name,
            secret_arn,
        } => {
            info!("Using Postgres conversation store with managed credentials");
            let client = secrets::secrets_client().await;
            let creds = secrets::get_database_credentials(&client, secret_arn).await?;
            let pool = db::create_pool_with(creds.connect_options(host, name)).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreConfig::Memory => {
            info!("Using in-memory conversation store");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(store)
}

/// Supabase REST (PostgREST) backend.
pub struct PostgrestStore {
    http_client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl PostgrestStore {
    pub fn new(http_client: reqwest::Client, base_url: String, service_role_key: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, CHAT_HISTORY_TABLE)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }
}

/// PostgREST error payload. Only `code` is kept: `message`, `details` and
/// `hint` can quote the offending row.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
}

fn rejected(operation: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let code = serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|e| e.code)
        .unwrap_or_else(|| "none".to_string());
    Error::Store(format!("{} returned {} (code {})", operation, status, code))
}

#[async_trait]
impl ConversationStore for PostgrestStore {
    async fn insert(&self, turn: &NewChatTurn) -> Result<()> {
        let response = self
            .authorized(self.http_client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&[turn])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(rejected("insert", status, &body));
        }

        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let response = self
            .authorized(self.http_client.get(self.table_url()))
            .query(&[
                ("select", "user_id,role,message,metadata,created_at".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(rejected("select", status, &body));
        }

        let mut turns: Vec<ChatTurn> = response.json().await?;
        turns.reverse();
        Ok(turns)
    }
}

/// Direct Postgres backend.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn insert(&self, turn: &NewChatTurn) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_history (user_id, role, message, metadata)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&turn.user_id)
        .bind(turn.role.as_str())
        .bind(&turn.message)
        .bind(&turn.metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(String, String, String, Option<serde_json::Value>, DateTime<Utc>)> =
            sqlx::query_as(
                r#"
                SELECT user_id, role, message, metadata, created_at
                FROM chat_history
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut turns = rows
            .into_iter()
            .map(|(user_id, role, message, metadata, created_at)| -> Result<ChatTurn> {
                Ok(ChatTurn {
                    user_id,
                    role: role.parse()?,
                    message,
                    metadata,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        turns.reverse();
        Ok(turns)
    }
}

/// In-process backend for local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    turns: RwLock<Vec<ChatTurn>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored turn in insertion order.
    pub async fn turns(&self) -> Vec<ChatTurn> {
        self.turns.read().await.clone()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert(&self, turn: &NewChatTurn) -> Result<()> {
        let mut turns = self.turns.write().await;
        turns.push(ChatTurn {
            user_id: turn.user_id.clone(),
            role: turn.role,
            message: turn.message.clone(),
            metadata: turn.metadata.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let turns = self.turns.read().await;
        let mine: Vec<ChatTurn> = turns
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        let skip = mine.len().saturating_sub(limit);
        Ok(mine.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canned_http::CannedServer;
    use crate::models::Role;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store
            .insert(&NewChatTurn::user("u1", "I feel anxious today"))
            .await
            .unwrap();

        let history = store.history("u1", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_id, "u1");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].message, "I feel anxious today");
    }

    #[tokio::test]
    async fn test_memory_store_history_is_per_user_and_limited() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store
                .insert(&NewChatTurn::user("u1", format!("message {}", i)))
                .await
                .unwrap();
        }
        store
            .insert(&NewChatTurn::user("u2", "someone else"))
            .await
            .unwrap();

        let history = store.history("u1", 2).await.unwrap();
        let messages: Vec<&str> = history.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["message 2", "message 3"]);
        assert!(store.history("nobody", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_postgrest_table_url_trims_trailing_slash() {
        let store = PostgrestStore::new(
            reqwest::Client::new(),
            "https://project.supabase.co/".to_string(),
            "key".to_string(),
        );
        assert_eq!(
            store.table_url(),
            "https://project.supabase.co/rest/v1/chat_history"
        );
    }

    fn postgrest(base_url: &str) -> PostgrestStore {
        PostgrestStore::new(
            reqwest::Client::new(),
            base_url.to_string(),
            "service-key".to_string(),
        )
    }

    #[tokio::test]
    async fn test_postgrest_insert_request() {
        let server = CannedServer::start(201, "").await;
        let store = postgrest(&server.base_url);

        store
            .insert(&NewChatTurn::assistant("u1", "Take a slow breath.", "en"))
            .await
            .unwrap();

        let request = server.request().await;
        assert_eq!(request.request_line(), "POST /rest/v1/chat_history HTTP/1.1");
        assert_eq!(request.header("apikey"), Some("service-key"));
        assert_eq!(request.header("authorization"), Some("Bearer service-key"));
        assert_eq!(request.header("prefer"), Some("return=minimal"));
        assert_eq!(
            request.json(),
            serde_json::json!([{
                "user_id": "u1",
                "role": "assistant",
                "message": "Take a slow breath.",
                "metadata": { "language": "en" }
            }])
        );
    }

    #[tokio::test]
    async fn test_postgrest_rejection_omits_row_contents() {
        let server = CannedServer::start(
            400,
            r#"{"code":"23514","details":"Failing row contains (7, u1, user, I want to end my life, null).","hint":null,"message":"new row violates check constraint"}"#,
        )
        .await;
        let store = postgrest(&server.base_url);

        let err = store
            .insert(&NewChatTurn::user("u1", "I want to end my life"))
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(matches!(err, Error::Store(_)));
        assert!(text.contains("400"));
        assert!(text.contains("23514"));
        assert!(!text.contains("end my life"));
        assert!(!text.contains("Failing row"));
    }

    #[tokio::test]
    async fn test_postgrest_history_reverses_to_oldest_first() {
        let server = CannedServer::start(
            200,
            r#"[
                {"user_id":"u1","role":"assistant","message":"second","metadata":{"language":"en"},"created_at":"2024-05-01T10:00:05Z"},
                {"user_id":"u1","role":"user","message":"first","metadata":null,"created_at":"2024-05-01T10:00:00Z"}
            ]"#,
        )
        .await;
        let store = postgrest(&server.base_url);

        let history = store.history("u1", 2).await.unwrap();
        let messages: Vec<&str> = history.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(history[1].role, Role::Assistant);

        let request = server.request().await;
        let line = request.request_line();
        assert!(line.starts_with("GET /rest/v1/chat_history?"));
        assert!(line.contains("user_id=eq.u1"));
        assert!(line.contains("order=created_at.desc"));
        assert!(line.contains("limit=2"));
    }

    #[tokio::test]
    async fn test_postgrest_select_failure_omits_body() {
        let server = CannedServer::start(500, "upstream said: first").await;
        let store = postgrest(&server.base_url);

        let err = store.history("u1", 10).await.unwrap_err();
        assert_eq!(err.to_string(), "Store error: select returned 500 Internal Server Error (code none)");
    }
}
