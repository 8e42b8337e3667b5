//! Authenticated API client with single-flight credential refresh
//!
//! Every authenticated call carries the current access token. When the
//! authority answers 401 the client refreshes once and retries once. Callers
//! that hit the same expiry concurrently queue on `refresh_gate` and pick up
//! the outcome of whoever got there first, so an expired generation is
//! refreshed at most once. A refresh that never completed is shared the same
//! way: callers whose request went out before the attempt started get its
//! error instead of trying again.

use super::credentials::{CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore};
use super::http::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub(crate) const REFRESH_PATH: &str = "/auth/refresh/";

/// Whether a request carries the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Fails with `SessionExpired` when no credential is held
    Required,
    /// Token attached when present; anonymous otherwise
    Optional,
    /// Never attached (login, register, refresh)
    None,
}

/// Endpoint call before credentials are attached
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<String>,
    auth: Auth,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            auth: Auth::Required,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: None,
            auth: Auth::Required,
        }
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn to_http(&self, bearer: Option<String>) -> HttpRequest {
        HttpRequest {
            method: self.method,
            path: self.path.clone(),
            body: self.body.clone(),
            bearer,
        }
    }
}

/// Notified when a failed refresh discarded the credentials
pub trait SessionListener: Send + Sync {
    fn on_session_expired(&self);
}

/// Request counters
#[derive(Debug, Default)]
pub struct TransportStats {
    pub requests_sent: AtomicU64,
    pub refreshes: AtomicU64,
    pub sessions_expired: AtomicU64,
}

impl TransportStats {
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub fn sessions_expired(&self) -> u64 {
        self.sessions_expired.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct SessionSlot {
    pair: Option<CredentialPair>,
    /// Bumped every time `pair` is replaced or cleared
    generation: u64,
    /// Refresh calls started so far
    refresh_attempts: u64,
    failed_refresh: Option<FailedRefresh>,
}

/// A refresh call that did not complete, kept for callers queued behind it
#[derive(Debug)]
struct FailedRefresh {
    attempt: u64,
    generation: u64,
    error: Error,
}

/// What a caller knew when its request was sent
#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
    refresh_attempts: u64,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshReply {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Transport client shared by every component
pub struct ApiClient {
    http: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    session: RwLock<SessionSlot>,
    refresh_gate: Mutex<()>,
    listeners: RwLock<Vec<Weak<dyn SessionListener>>>,
    stats: TransportStats,
}

impl ApiClient {
    /// Create a client, restoring any persisted credential pair
    pub fn new(http: Arc<dyn HttpTransport>, store: Arc<dyn CredentialStore>) -> Self {
        let pair = match store.load() {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Ignoring unreadable stored credentials: {}", e);
                None
            }
        };

        Self {
            http,
            store,
            session: RwLock::new(SessionSlot {
                pair,
                ..SessionSlot::default()
            }),
            refresh_gate: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            stats: TransportStats::default(),
        }
    }

    /// Production client: `reqwest` backend plus the configured credential store
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(config)?);
        let store: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::new(path)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Ok(Self::new(http, store))
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().pair.is_some()
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Generation of the credential pair currently held
    pub fn credential_generation(&self) -> u64 {
        self.session.read().generation
    }

    /// Register for session-expiry notifications
    pub fn subscribe(&self, listener: Weak<dyn SessionListener>) {
        let mut listeners = self.listeners.write();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(listener);
    }

    /// Install a freshly issued pair and persist it
    pub fn install_credentials(&self, pair: CredentialPair) -> Result<()> {
        let generation = {
            let mut slot = self.session.write();
            slot.pair = Some(pair.clone());
            slot.generation += 1;
            slot.generation
        };
        debug!(generation, "Installed credential pair");
        self.store.save(&pair)
    }

    /// Forget the current pair locally and in storage
    pub fn clear_credentials(&self) -> Result<()> {
        {
            let mut slot = self.session.write();
            slot.pair = None;
            slot.generation += 1;
        }
        self.store.clear()
    }

    /// Send a request and decode the JSON reply
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Serialization(format!("Failed to deserialize response: {}", e))
        })
    }

    /// Send a request and return the raw successful body
    pub async fn send(&self, request: ApiRequest) -> Result<String> {
        let held = self.current_access();

        let (access, ticket) = match (request.auth, held) {
            (Auth::None, _) | (Auth::Optional, None) => {
                let response = self.dispatch(request.to_http(None)).await?;
                return into_body(response);
            }
            (Auth::Required, None) => {
                debug!(path = %request.path, "No credentials held, failing fast");
                return Err(Error::SessionExpired);
            }
            (_, Some(held)) => held,
        };

        let response = self.dispatch(request.to_http(Some(access))).await?;
        if !response.is_unauthorized() {
            return into_body(response);
        }

        debug!(path = %request.path, generation = ticket.generation, "Access token rejected");
        let access = self.refresh_after(ticket).await?;

        // One retry; a second 401 is an ordinary failure
        let retry = self.dispatch(request.to_http(Some(access))).await?;
        into_body(retry)
    }

    fn current_access(&self) -> Option<(String, Ticket)> {
        let slot = self.session.read();
        slot.pair.as_ref().map(|pair| {
            let ticket = Ticket {
                generation: slot.generation,
                refresh_attempts: slot.refresh_attempts,
            };
            (pair.access.clone(), ticket)
        })
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.stats.requests_sent.fetch_add(1, Ordering::Relaxed);
        let method = request.method;
        let path = request.path.clone();

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(%method, %path, "Request failed to complete: {}", e);
            e
        })?;

        debug!(%method, %path, status = response.status, "Response received");
        Ok(response)
    }

    /// Obtain a valid access token after the token in `ticket` was rejected
    async fn refresh_after(&self, ticket: Ticket) -> Result<String> {
        let expired_generation = ticket.generation;
        let _gate = self.refresh_gate.lock().await;

        let (refresh_token, attempt) = {
            let mut slot = self.session.write();
            let refresh_token = match &slot.pair {
                None => return Err(Error::SessionExpired),
                // Someone else already replaced the pair
                Some(pair) if slot.generation != expired_generation => {
                    return Ok(pair.access.clone());
                }
                Some(pair) => pair.refresh.clone(),
            };

            // An attempt started after our request went out already failed
            if let Some(failed) = &slot.failed_refresh {
                if failed.generation == expired_generation
                    && failed.attempt > ticket.refresh_attempts
                {
                    debug!(attempt = failed.attempt, "Sharing failed refresh outcome");
                    return Err(replay(&failed.error));
                }
            }

            slot.refresh_attempts += 1;
            (refresh_token, slot.refresh_attempts)
        };

        match self.refresh_once(expired_generation, refresh_token).await {
            Err(e) if !e.requires_login() => {
                warn!(attempt, "Refresh did not complete: {}", e);
                let error = replay(&e);
                self.session.write().failed_refresh = Some(FailedRefresh {
                    attempt,
                    generation: expired_generation,
                    error,
                });
                Err(e)
            }
            outcome => outcome,
        }
    }

    async fn refresh_once(&self, expired_generation: u64, refresh_token: String) -> Result<String> {
        self.stats.refreshes.fetch_add(1, Ordering::Relaxed);
        info!(generation = expired_generation, "Refreshing access token");

        let body = serde_json::to_string(&RefreshBody {
            refresh: &refresh_token,
        })?;
        let response = self
            .dispatch(HttpRequest {
                method: Method::Post,
                path: REFRESH_PATH.to_string(),
                body: Some(body),
                bearer: None,
            })
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Refresh rejected, discarding credentials");
            self.expire_session(expired_generation);
            return Err(Error::SessionExpired);
        }

        let reply: RefreshReply = serde_json::from_str(&response.body)?;
        let pair = CredentialPair {
            access: reply.access,
            refresh: reply.refresh.unwrap_or(refresh_token),
        };

        {
            let mut slot = self.session.write();
            if slot.generation != expired_generation {
                // Logged out or re-authenticated while the refresh was in flight
                return slot
                    .pair
                    .as_ref()
                    .map(|p| p.access.clone())
                    .ok_or(Error::SessionExpired);
            }
            slot.pair = Some(pair.clone());
            slot.generation += 1;
            slot.failed_refresh = None;
        }

        if let Err(e) = self.store.save(&pair) {
            warn!("Failed to persist refreshed credentials: {}", e);
        }

        Ok(pair.access)
    }

    fn expire_session(&self, expired_generation: u64) {
        {
            let mut slot = self.session.write();
            if slot.generation != expired_generation {
                return;
            }
            slot.pair = None;
            slot.generation += 1;
        }

        self.stats.sessions_expired.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored credentials: {}", e);
        }

        let listeners: Vec<Arc<dyn SessionListener>> = self
            .listeners
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for listener in listeners {
            listener.on_session_expired();
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("authenticated", &self.is_authenticated())
            .field("generation", &self.credential_generation())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Copy of a refresh failure for another waiting caller
fn replay(error: &Error) -> Error {
    match error {
        Error::Network(message) => Error::Network(message.clone()),
        Error::Serialization(message) => Error::Serialization(message.clone()),
        Error::SessionExpired => Error::SessionExpired,
        other => Error::Network(other.to_string()),
    }
}

fn into_body(response: HttpResponse) -> Result<String> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(Error::Api {
            status: response.status,
            message: error_message(&response.body),
        })
    }
}

/// Pull the human-readable message out of an error body
pub(crate) fn error_message(body: &str) -> String {
    const FALLBACK: &str = "Request failed";

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return FALLBACK.to_string(),
    };
    let Some(object) = value.as_object() else {
        return FALLBACK.to_string();
    };

    for key in ["error", "detail"] {
        if let Some(message) = object.get(key).and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }

    // Field validation errors: {"username": ["already taken"]}
    let field_message = |value: &serde_json::Value| -> Option<String> {
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                items.first().and_then(|v| v.as_str()).map(str::to_string)
            }
            _ => None,
        }
    };

    object
        .get("non_field_errors")
        .and_then(field_message)
        .or_else(|| object.values().find_map(field_message))
        .unwrap_or_else(|| FALLBACK.to_string())
}
