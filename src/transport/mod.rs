//! Transport layer
//!
//! This module provides the authenticated path to the authority:
//! - `http`: wire-level request/response types and the pluggable backend
//! - `credentials`: durable storage for the access/refresh pair
//! - `client`: [`ApiClient`], which attaches credentials and refreshes them

pub mod client;
pub mod credentials;
pub mod http;

pub use client::{ApiClient, ApiRequest, Auth, SessionListener, TransportStats};
pub use credentials::{CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
