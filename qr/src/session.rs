//! Session state: credentials, current quiz item and first-seen timestamps
//!
//! One `SessionState` describes one quiz-solving run. It is shared between the
//! controller, the tools and the HTTP surface through [`SharedSession`]; runs
//! that must not interfere each get their own instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Shared handle to a session
pub type SharedSession = Arc<RwLock<SessionState>>;

/// Participant credentials sent with every submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }
}

/// A quiz item, identified by its URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub url: String,
    pub first_seen_at: Instant,
}

/// Serializable view reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub current_url: Option<String>,
    pub items_seen: usize,
}

/// Mutable state of one run
#[derive(Debug, Default)]
pub struct SessionState {
    credentials: Option<Credentials>,
    current_url: Option<String>,
    first_seen: HashMap<String, Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shared handle
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    /// Start (or restart) a session: set credentials and the first item
    ///
    /// A second start replaces the credentials and current URL of the first;
    /// first-seen timestamps of earlier URLs are kept.
    pub fn start(&mut self, credentials: Credentials, url: impl Into<String>, now: Instant) {
        let url = url.into();
        debug!(%url, email = %credentials.email, "SessionState::start: called");
        self.credentials = Some(credentials);
        self.advance_to(url, now);
    }

    /// Make `url` the current item, recording its first-seen time if new
    ///
    /// Revisiting a URL keeps its original timestamp so the time budget keeps
    /// counting from the first time it was handed out.
    pub fn advance_to(&mut self, url: impl Into<String>, now: Instant) {
        let url = url.into();
        let first_seen = *self.first_seen.entry(url.clone()).or_insert(now);
        debug!(%url, revisit = %(first_seen != now), "SessionState::advance_to: called");
        self.current_url = Some(url);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// The current item with its first-seen timestamp
    pub fn current_item(&self) -> Option<QuizItem> {
        let url = self.current_url.as_ref()?;
        let first_seen_at = *self.first_seen.get(url)?;
        Some(QuizItem {
            url: url.clone(),
            first_seen_at,
        })
    }

    pub fn first_seen(&self, url: &str) -> Option<Instant> {
        self.first_seen.get(url).copied()
    }

    /// Time spent on the current item
    pub fn elapsed_on_current(&self, now: Instant) -> Option<Duration> {
        self.current_item()
            .map(|item| now.saturating_duration_since(item.first_seen_at))
    }

    /// True once credentials and a current URL are both present
    pub fn is_active(&self) -> bool {
        self.credentials.is_some() && self.current_url.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_url: self.current_url.clone(),
            items_seen: self.first_seen.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("student@example.com", "s3cret")
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sets_current_and_timestamp() {
        let mut state = SessionState::new();
        assert!(!state.is_active());

        let now = Instant::now();
        state.start(creds(), "https://host/quiz-1", now);

        assert!(state.is_active());
        assert_eq!(state.current_url(), Some("https://host/quiz-1"));
        assert_eq!(state.first_seen("https://host/quiz-1"), Some(now));
        assert_eq!(state.credentials().unwrap().email, "student@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_records_new_item() {
        let mut state = SessionState::new();
        state.start(creds(), "https://host/quiz-1", Instant::now());

        tokio::time::advance(Duration::from_secs(30)).await;
        let later = Instant::now();
        state.advance_to("https://host/quiz-2", later);

        let item = state.current_item().unwrap();
        assert_eq!(item.url, "https://host/quiz-2");
        assert_eq!(item.first_seen_at, later);
        assert_eq!(state.elapsed_on_current(later), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revisit_keeps_first_seen() {
        let mut state = SessionState::new();
        let t0 = Instant::now();
        state.start(creds(), "https://host/quiz-1", t0);
        state.advance_to("https://host/quiz-2", t0);

        tokio::time::advance(Duration::from_secs(100)).await;
        let t1 = Instant::now();
        state.advance_to("https://host/quiz-1", t1);

        assert_eq!(state.first_seen("https://host/quiz-1"), Some(t0));
        assert_eq!(state.elapsed_on_current(t1), Some(Duration::from_secs(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_overwrites_credentials() {
        let mut state = SessionState::new();
        state.start(creds(), "https://host/quiz-1", Instant::now());
        state.start(Credentials::new("other@example.com", "x"), "https://host/quiz-9", Instant::now());

        assert_eq!(state.credentials().unwrap().email, "other@example.com");
        assert_eq!(state.current_url(), Some("https://host/quiz-9"));
        assert_eq!(state.snapshot().items_seen, 2);
    }
}
