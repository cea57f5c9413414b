//! Companion wellness endpoints.
//!
//! Endpoints:
//! - GET /shield - Shield-mode status
//! - GET /notifications - Dashboard reminders
//! - POST /analyze-mood - Classify a self-reported mood
//! - POST /summarize - Preview a journal entry

use lambda_http::{Body, Error, Request, Response};
use shared::http::{error_response, json_response, parse_json_body};
use shared::wellness::{self, MoodRequest, ShieldStatus, SummarizeRequest};
use tracing::info;

pub const PATHS: [&str; 4] = ["/shield", "/notifications", "/analyze-mood", "/summarize"];

pub async fn handler(shield: ShieldStatus, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path().trim_end_matches('/');

    info!("Wellness request: {} {}", method, path);

    match (method, path) {
        ("GET", "/shield") => json_response(200, &shield),

        ("GET", "/notifications") => json_response(200, &wellness::notifications()),

        ("POST", "/analyze-mood") => {
            let request: MoodRequest = match parse_json_body(event.body()) {
                Ok(request) => request,
                Err(_) => return error_response(400, "Invalid request body"),
            };
            json_response(200, &wellness::analyze_mood(request))
        }

        ("POST", "/summarize") => {
            let request: SummarizeRequest = match parse_json_body(event.body()) {
                Ok(request) => request,
                Err(_) => return error_response(400, "Invalid request body"),
            };
            match wellness::summarize(&request) {
                Some(summary) => json_response(200, &summary),
                None => error_response(400, "Content is required"),
            }
        }

        (_, p) if PATHS.contains(&p) => error_response(405, "Method not allowed"),

        _ => error_response(404, "Not found"),
    }
}
