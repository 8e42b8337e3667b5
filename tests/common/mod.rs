#![allow(dead_code)]

use std::sync::Arc;

use wagerline::testing::{json_response, profile_body, ScriptedTransport};
use wagerline::transport::{HttpRequest, HttpResponse, MemoryCredentialStore};
use wagerline::{AccountState, ApiClient, CasinoApi, CredentialPair, Result};

pub const ACCESS: &str = "access-1";
pub const REFRESH: &str = "refresh-1";

/// Account wired to a scripted authority, holding a credential pair
pub fn signed_in<F>(handler: F) -> (Arc<ScriptedTransport>, Arc<AccountState>)
where
    F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
{
    with_transport(
        ScriptedTransport::new(handler),
        Some(CredentialPair::new(ACCESS, REFRESH)),
    )
}

pub fn with_transport(
    transport: ScriptedTransport,
    pair: Option<CredentialPair>,
) -> (Arc<ScriptedTransport>, Arc<AccountState>) {
    let transport = Arc::new(transport);
    let store = match pair {
        Some(pair) => MemoryCredentialStore::with_pair(pair),
        None => MemoryCredentialStore::new(),
    };
    let client = Arc::new(ApiClient::new(transport.clone(), Arc::new(store)));
    (transport, AccountState::new(CasinoApi::new(client)))
}

/// Profile reply for `/profile/`, anything else falls through to `game`
pub fn with_profile<F>(
    coins: i64,
    is_staff: bool,
    game: F,
) -> impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static
where
    F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
{
    move |request| {
        if request.path == "/profile/" {
            Ok(json_response(200, &profile_body("alice", coins, is_staff)))
        } else {
            game(request)
        }
    }
}

/// The `action` field of a request body
pub fn action_of(request: &HttpRequest) -> String {
    request
        .json()
        .and_then(|body| body["action"].as_str().map(str::to_string))
        .unwrap_or_default()
}
