//! `POST /chat`: relays a user message to the wellness companion.

use std::sync::Arc;

use lambda_http::{Body, Error, Request, Response};
use shared::http::{client_address, error_response, json_response, parse_json_body};
use shared::{ChatRequest, RelayError};
use tracing::{error, info, warn};

use crate::AppState;

pub const PATH: &str = "/chat";

pub async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method().as_str() != "POST" {
        return error_response(405, "Method not allowed");
    }

    let client = client_address(&event);
    info!(client = %client, "Chat request");

    let request: ChatRequest = match parse_json_body(event.body()) {
        Ok(request) => request,
        Err(e) => {
            warn!(client = %client, error = %e, "Unparseable chat request body");
            return error_response(400, RelayError::InvalidInput.to_string());
        }
    };

    match state.relay.handle(request, &client).await {
        Ok(response) => json_response(200, &response),
        Err(e) => {
            if let RelayError::Unexpected(detail) = &e {
                error!(client = %client, detail = %detail, "Unexpected chat failure");
            }
            error_response(e.status_code(), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use shared::crisis;
    use shared::Role;

    fn chat(body: &str) -> Request {
        request("POST", PATH, body)
    }

    #[tokio::test]
    async fn test_successful_chat() {
        let (state, store) = state_with(CannedProvider(Ok(Some("Let's try grounding.".to_string()))));

        let response = handler(
            state,
            chat(r#"{"user_id":"u1","message":"I feel anxious today"}"#),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            body_json(&response),
            serde_json::json!({
                "reply": "Let's try grounding.",
                "metadata": { "language": "en" }
            })
        );

        let turns = store.turns().await;
        let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_crisis_chat_returns_resources() {
        let (state, store) = state_with(CannedProvider(Ok(Some("model text".to_string()))));

        let response = handler(
            state,
            chat(r#"{"user_id":"u1","message":"I want to end my life"}"#),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["reply"], crisis::crisis_reply("en"));
        assert_eq!(store.turns().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_fields_return_400() {
        for body in [
            r#"{"message":"hello"}"#,
            r#"{"user_id":"u1"}"#,
            r#"{"user_id":"","message":"hello"}"#,
            "",
            "not json",
        ] {
            let (state, store) = state_with(CannedProvider(Ok(Some("ok".to_string()))));
            let response = handler(state, chat(body)).await.unwrap();

            assert_eq!(response.status(), 400, "body {:?}", body);
            assert_eq!(
                body_json(&response),
                serde_json::json!({ "error": "Missing user_id or message" })
            );
            assert!(store.turns().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429_without_writes() {
        let (state, store) = state_with(CannedProvider(Ok(Some("ok".to_string()))));
        let body = r#"{"user_id":"u1","message":"hello"}"#;

        for _ in 0..5 {
            let response = handler(state.clone(), chat(body)).await.unwrap();
            assert_eq!(response.status(), 200);
        }
        let response = handler(state, chat(body)).await.unwrap();

        assert_eq!(response.status(), 429);
        assert_eq!(
            body_json(&response),
            serde_json::json!({ "error": "Too many requests" })
        );
        assert_eq!(store.turns().await.len(), 10);
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_502() {
        let (state, store) = state_with(CannedProvider(Err(503)));

        let response = handler(state, chat(r#"{"user_id":"u1","message":"hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
        assert_eq!(
            body_json(&response),
            serde_json::json!({ "error": "OpenAI API request failed" })
        );
        assert_eq!(store.turns().await.len(), 1);
    }

    #[tokio::test]
    async fn test_language_is_echoed() {
        let (state, _) = state_with(CannedProvider(Ok(Some("namaste".to_string()))));

        let response = handler(
            state,
            chat(r#"{"user_id":"u1","message":"hello","language":"hi"}"#),
        )
        .await
        .unwrap();

        assert_eq!(body_json(&response)["metadata"]["language"], "hi");
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let (state, _) = state_with(CannedProvider(Ok(None)));
        let response = handler(state, request("GET", PATH, "")).await.unwrap();
        assert_eq!(response.status(), 405);
    }
}
