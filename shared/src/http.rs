//! HTTP helpers for the function handlers.

use lambda_http::request::RequestContext;
use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Rate-limit key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Peer address recorded by a server that terminates TCP itself.
///
/// Inserted into request extensions by the local server; API Gateway
/// requests carry the address in their request context instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(
        status,
        &ErrorBody {
            error: message.into(),
        },
    )
}

/// Parse request body as JSON.
///
/// An empty body parses as `{}` so that handlers can report missing fields
/// with their own message.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<T, serde_json::Error> {
    let bytes: &[u8] = body.as_ref();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(b"{}");
    }
    serde_json::from_slice(bytes)
}

/// Determine the address used as the rate-limit key for a request.
///
/// Order: the API Gateway source IP, the local server's peer address, then
/// the first `x-forwarded-for` hop (caller-controlled, so last), then
/// [`UNKNOWN_CLIENT`].
pub fn client_address(event: &Request) -> String {
    let source_ip = match event.request_context_ref() {
        Some(RequestContext::ApiGatewayV2(ctx)) => ctx.http.source_ip.clone(),
        Some(RequestContext::ApiGatewayV1(ctx)) => ctx.identity.source_ip.clone(),
        _ => None,
    };
    if let Some(addr) = source_ip.filter(|v| !v.is_empty()) {
        return addr;
    }

    if let Some(ClientAddress(addr)) = event.extensions().get::<ClientAddress>() {
        return addr.clone();
    }

    event
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
}
