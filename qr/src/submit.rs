//! Answer submission to the remote quiz endpoint

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::SessionState;

/// Errors raised while submitting an answer
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Submission failed: endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Submission failed: response is not valid JSON: {0}")]
    Decode(String),

    #[error("No active session")]
    NoSession,
}

/// Body POSTed to the submit endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: String,
}

impl SubmissionPayload {
    /// Build a payload for the session's current item
    ///
    /// The URL always comes from the session at the moment of construction,
    /// never from the caller.
    pub fn for_current(session: &SessionState, answer: impl Into<String>) -> Result<Self, SubmitError> {
        let credentials = session.credentials().ok_or(SubmitError::NoSession)?;
        let url = session.current_url().ok_or(SubmitError::NoSession)?;
        Ok(Self {
            email: credentials.email.clone(),
            secret: credentials.secret.clone(),
            url: url.to_string(),
            answer: answer.into(),
        })
    }
}

/// Parsed endpoint response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SubmissionResult {
    /// Pick the known fields out of any JSON body
    ///
    /// Fields of an unexpected type are ignored rather than failing the
    /// submission; a non-string `reason` is kept as its JSON text.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        let reason = match raw.get("reason") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            correct: raw.get("correct").and_then(serde_json::Value::as_bool),
            reason,
            url: raw.get("url").and_then(serde_json::Value::as_str).map(str::to_string),
        }
    }

    /// Next quiz URL, if the endpoint handed one out
    pub fn next_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Result plus the raw JSON it was parsed from
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub result: SubmissionResult,
    pub raw: serde_json::Value,
}

/// Client for the submit endpoint
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: Client,
    submit_url: String,
}

impl SubmissionClient {
    pub fn new(submit_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            submit_url: submit_url.into(),
        })
    }

    /// The configured default endpoint
    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    /// Submit to the default endpoint
    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionOutcome, SubmitError> {
        self.submit_to(&self.submit_url, payload).await
    }

    /// Submit to an explicit endpoint
    ///
    /// Network failures and non-2xx statuses are errors; the result is never guessed.
    pub async fn submit_to(&self, endpoint: &str, payload: &SubmissionPayload) -> Result<SubmissionOutcome, SubmitError> {
        info!(%endpoint, url = %payload.url, answer = %snippet(&payload.answer, 200), "Submitting answer");

        let response = self.http.post(endpoint).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%endpoint, status = %status.as_u16(), body = %snippet(&body, 300), "Submission rejected");
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| SubmitError::Decode(e.to_string()))?;
        let result = SubmissionResult::from_raw(&raw);
        debug!(?result, "SubmissionClient::submit_to: parsed response");

        Ok(SubmissionOutcome { result, raw })
    }
}

/// Quiz URL with `email` and `secret` appended as query parameters
///
/// For human-browsable links only; submissions never use it.
pub fn authorized_url(url: &str, email: &str, secret: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}email={}&secret={}",
        url,
        sep,
        urlencoding::encode(email),
        urlencoding::encode(secret)
    )
}

/// Truncate text for log lines
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;
    use tokio::time::Instant;

    #[test]
    fn test_authorized_url_without_query() {
        assert_eq!(
            authorized_url("https://host/quiz-1", "a@b.com", "s3"),
            "https://host/quiz-1?email=a%40b.com&secret=s3"
        );
    }

    #[test]
    fn test_authorized_url_with_query() {
        assert_eq!(
            authorized_url("https://host/project2?x=1", "a@b.com", "s e"),
            "https://host/project2?x=1&email=a%40b.com&secret=s%20e"
        );
    }

    #[test]
    fn test_result_without_url_has_no_next() {
        let result: SubmissionResult = serde_json::from_str(r#"{"correct": true}"#).unwrap();
        assert_eq!(result.correct, Some(true));
        assert_eq!(result.next_url(), None);

        let empty: SubmissionResult = serde_json::from_str(r#"{"correct": false, "url": ""}"#).unwrap();
        assert_eq!(empty.next_url(), None);
    }

    #[test]
    fn test_result_with_url() {
        let result: SubmissionResult =
            serde_json::from_str(r#"{"correct": false, "reason": "wrong", "url": "https://host/quiz-2"}"#).unwrap();
        assert_eq!(result.reason.as_deref(), Some("wrong"));
        assert_eq!(result.next_url(), Some("https://host/quiz-2"));
    }

    #[test]
    fn test_from_raw_ignores_mistyped_fields() {
        let raw = serde_json::json!({"correct": "yes", "url": 123, "reason": {"code": 4}});
        let result = SubmissionResult::from_raw(&raw);
        assert_eq!(result.correct, None);
        assert_eq!(result.next_url(), None);
        assert_eq!(result.reason.as_deref(), Some(r#"{"code":4}"#));

        let not_an_object = SubmissionResult::from_raw(&serde_json::json!(["ok"]));
        assert_eq!(not_an_object, SubmissionResult::default());
    }

    #[test]
    fn test_from_raw_reads_well_typed_fields() {
        let raw = serde_json::json!({"correct": false, "reason": "wrong", "url": "https://host/quiz-2", "delay": 3});
        let result = SubmissionResult::from_raw(&raw);
        assert_eq!(result.correct, Some(false));
        assert_eq!(result.reason.as_deref(), Some("wrong"));
        assert_eq!(result.next_url(), Some("https://host/quiz-2"));
    }

    #[tokio::test]
    async fn test_payload_uses_current_url() {
        let mut state = SessionState::new();
        assert!(matches!(
            SubmissionPayload::for_current(&state, "42"),
            Err(SubmitError::NoSession)
        ));

        state.start(Credentials::new("a@b.com", "s3"), "https://host/quiz-1", Instant::now());
        state.advance_to("https://host/quiz-2", Instant::now());

        let payload = SubmissionPayload::for_current(&state, "42").unwrap();
        assert_eq!(payload.url, "https://host/quiz-2");
        assert_eq!(payload.email, "a@b.com");
        assert_eq!(payload.answer, "42");
    }

    #[test]
    fn test_snippet_truncates() {
        assert_eq!(snippet("abcdef", 3), "abc...");
        assert_eq!(snippet("abc", 3), "abc");
    }
}
