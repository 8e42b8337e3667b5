//! Test support
//!
//! [`ScriptedTransport`] stands in for the authority: a handler closure decides
//! the response for each request and every request is recorded for later
//! assertions.

use crate::error::{Error, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// In-memory [`HttpTransport`] driven by a closure
pub struct ScriptedTransport {
    handler: Handler,
    log: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Replay `responses` in order, one per request; runs dry with a network error
    pub fn sequence<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = HttpResponse>,
    {
        let queue = Mutex::new(responses.into_iter().collect::<VecDeque<_>>());
        Self::new(move |request| {
            queue.lock().pop_front().ok_or_else(|| {
                Error::Network(format!("no scripted response for {}", request.path))
            })
        })
    }

    /// Delay every response, letting concurrent callers overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of requests sent to `path`
    pub fn count_path(&self, path: &str) -> usize {
        self.log.lock().iter().filter(|r| r.path == path).count()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.log.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.log.lock().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(&request)
    }
}

/// Shorthand for a JSON response
pub fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse::new(status, body)
}

/// A profile body as the authority serves it
pub fn profile_body(username: &str, coins: i64, is_staff: bool) -> String {
    serde_json::json!({
        "user": {
            "id": 7,
            "username": username,
            "email": format!("{}@example.com", username),
            "is_staff": is_staff,
        },
        "coins": coins,
        "total_wagered": 0,
        "total_won": 0,
        "total_lost": 0,
        "games_played": 0,
        "is_bankrupt": coins <= 0,
        "created_at": "2024-01-01T00:00:00Z",
    })
    .to_string()
}
