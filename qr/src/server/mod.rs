//! HTTP surface for manual-assist mode
//!
//! `/solve` starts the session, `/answer` submits directly, and
//! `/manual-answer` feeds the manual provider's side channel.

mod error;
mod handlers;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::provider::AnswerSlot;
use crate::session::SharedSession;
use crate::submit::SubmissionClient;

pub use error::ApiError;
pub use handlers::{AnswerResponse, HealthResponse, SolveResponse};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub slot: AnswerSlot,
    pub submitter: SubmissionClient,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(session: SharedSession, slot: AnswerSlot, submitter: SubmissionClient) -> Self {
        Self {
            session,
            slot,
            submitter,
            started_at: Instant::now(),
        }
    }
}

/// Routes with permissive CORS
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/solve", post(handlers::solve))
        .route("/answer", post(handlers::answer))
        .route("/manual-answer", post(handlers::manual_answer))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until the task is dropped
pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "HTTP server listening");
    axum::serve(listener, router(state)).await
}

/// Bind `addr` and serve
pub async fn serve(addr: &str, state: AppState) -> eyre::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| eyre::eyre!("Failed to bind {}: {}", addr, e))?;
    serve_on(listener, state).await?;
    Ok(())
}
