//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

/// Stand-in for the remote submit endpoint
///
/// Records every payload and answers with a fixed JSON body.
#[derive(Clone)]
pub struct SubmitStub {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl SubmitStub {
    pub async fn start(reply: Value) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let recorder = received.clone();
        let app = Router::new().route(
            "/submit",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    recorder.lock().unwrap().push(body);
                    Json(reply)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/submit", addr),
            received,
        }
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}
