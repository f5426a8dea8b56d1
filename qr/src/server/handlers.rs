//! Route handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use super::AppState;
use super::error::ApiError;
use crate::session::{Credentials, SessionSnapshot};
use crate::submit::{SubmissionPayload, authorized_url};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    #[serde(flatten)]
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    pub status: &'static str,
    pub current_url: String,
    pub authorized_url: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub status: &'static str,
    pub correct: Option<bool>,
    pub reason: Option<String>,
    pub next_url: Option<String>,
    pub authorized_next_url: Option<String>,
    pub raw_response: Value,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(value)) if value.is_object() => Ok(value),
        _ => Err(ApiError::BadRequest("Invalid JSON".to_string())),
    }
}

/// Non-empty string field
fn field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Any JSON answer as text; strings are taken verbatim
fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.session.read().await.snapshot();
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        session,
    })
}

/// Start (or replace) the session
pub async fn solve(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SolveResponse>, ApiError> {
    let body = json_body(body)?;
    let (Some(email), Some(secret), Some(url)) = (field(&body, "email"), field(&body, "secret"), field(&body, "url"))
    else {
        debug!("solve: missing fields");
        return Err(ApiError::BadRequest(
            "Missing required fields: email, secret, url".to_string(),
        ));
    };

    state
        .session
        .write()
        .await
        .start(Credentials::new(email, secret), url, Instant::now());
    let authorized = authorized_url(url, email, secret);
    info!(%email, %url, authorized_url = %authorized, "Quiz session started");

    Ok(Json(SolveResponse {
        status: "session_started",
        current_url: url.to_string(),
        authorized_url: authorized,
        message: "Open authorized_url in browser, solve manually, then POST to /answer",
    }))
}

/// Submit an answer for the current item and follow the returned URL
pub async fn answer(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let body = json_body(body)?;
    let answer = body
        .get("answer")
        .and_then(answer_text)
        .ok_or_else(|| ApiError::BadRequest("Missing 'answer'".to_string()))?;
    let endpoint = field(&body, "submit_url")
        .unwrap_or(state.submitter.submit_url())
        .to_string();

    let (payload, credentials) = {
        let session = state.session.read().await;
        if !session.is_active() {
            return Err(ApiError::BadRequest("No active session. Call /solve first.".to_string()));
        }
        let payload = SubmissionPayload::for_current(&session, answer)?;
        (payload, session.credentials().cloned())
    };

    let outcome = state.submitter.submit_to(&endpoint, &payload).await?;
    let next_url = outcome.result.next_url().map(str::to_string);

    let authorized_next_url = match (&next_url, &credentials) {
        (Some(next), Some(creds)) => {
            state.session.write().await.advance_to(next.clone(), Instant::now());
            let authorized = authorized_url(next, &creds.email, &creds.secret);
            info!(%next, authorized_url = %authorized, "Next question");
            Some(authorized)
        }
        _ => {
            info!(url = %payload.url, "Quiz completed");
            None
        }
    };

    Ok(Json(AnswerResponse {
        status: "submitted",
        correct: outcome.result.correct,
        reason: outcome.result.reason,
        next_url,
        authorized_next_url,
        raw_response: outcome.raw,
    }))
}

/// Hand an operator answer to the waiting manual provider
pub async fn manual_answer(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueuedResponse>, ApiError> {
    let body = json_body(body)?;
    let answer = body
        .get("answer")
        .and_then(answer_text)
        .ok_or_else(|| ApiError::BadRequest("Missing 'answer'".to_string()))?;
    state.slot.post(answer).await;
    Ok(Json(QueuedResponse { status: "queued" }))
}
