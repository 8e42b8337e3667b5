//! Typed endpoints of the casino authority
//!
//! One method per endpoint. Credential handling (attach, refresh, persist)
//! happens in [`ApiClient`]; this layer only shapes bodies and replies.

use crate::error::Result;
use crate::gaming::blackjack::BlackjackRequest;
use crate::gaming::dice::{DiceBet, DiceResult};
use crate::gaming::minesweeper::MinesweeperRequest;
use crate::gaming::poker::PokerRequest;
use crate::gaming::roulette::{RouletteBet, RouletteResult};
use crate::gaming::BetValue;
use crate::models::{CoinRequest, EducationContent, GameHistoryEntry, Registration, UserProfile};
use crate::transport::{ApiClient, ApiRequest, Auth, CredentialPair};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    password_confirm: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CoinRequestBody<'a> {
    amount: i64,
    reason: &'a str,
}

#[derive(Serialize)]
struct WagerBody<'a> {
    bet_type: &'a str,
    bet_value: BetValue,
    bet: i64,
}

/// Typed wrapper over the shared [`ApiClient`]
#[derive(Debug, Clone)]
pub struct CasinoApi {
    client: Arc<ApiClient>,
}

impl CasinoApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.is_authenticated()
    }

    // Auth

    /// Create an account; the returned tokens become the current pair
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Registration> {
        let request = ApiRequest::post("/auth/register/")
            .auth(Auth::None)
            .json(&RegisterBody {
                username,
                email,
                password,
                password_confirm: password,
            })?;

        let registration: Registration = self.client.send_json(request).await?;
        self.client.install_credentials(registration.tokens.clone())?;
        info!(username = %registration.user.username, "Registered new account");
        Ok(registration)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post("/auth/login/")
            .auth(Auth::None)
            .json(&LoginBody { username, password })?;

        let pair: CredentialPair = self.client.send_json(request).await?;
        self.client.install_credentials(pair)?;
        info!(%username, "Logged in");
        Ok(())
    }

    /// Local only; the authority has no logout endpoint
    pub fn logout(&self) -> Result<()> {
        self.client.clear_credentials()
    }

    // Account

    pub async fn profile(&self) -> Result<UserProfile> {
        self.client.send_json(ApiRequest::get("/profile/")).await
    }

    pub async fn history(&self) -> Result<Vec<GameHistoryEntry>> {
        self.client.send_json(ApiRequest::get("/history/")).await
    }

    pub async fn education(&self) -> Result<EducationContent> {
        self.client
            .send_json(ApiRequest::get("/education/").auth(Auth::Optional))
            .await
    }

    // Coins

    pub async fn request_coins(&self, amount: i64, reason: &str) -> Result<CoinRequest> {
        let request = ApiRequest::post("/coins/request/").json(&CoinRequestBody { amount, reason })?;
        self.client.send_json(request).await
    }

    pub async fn my_coin_requests(&self) -> Result<Vec<CoinRequest>> {
        self.client.send_json(ApiRequest::get("/coins/my-requests/")).await
    }

    // Admin

    pub async fn pending_coin_requests(&self) -> Result<Vec<CoinRequest>> {
        self.client
            .send_json(ApiRequest::get("/admin/pending-requests/"))
            .await
    }

    pub async fn approve_coin_request(&self, id: u64) -> Result<CoinRequest> {
        self.client
            .send_json(ApiRequest::post(format!("/admin/approve/{}/", id)))
            .await
    }

    pub async fn deny_coin_request(&self, id: u64) -> Result<CoinRequest> {
        self.client
            .send_json(ApiRequest::post(format!("/admin/deny/{}/", id)))
            .await
    }

    // Games. Stateful games return the raw body so the round can relay it verbatim.

    pub async fn blackjack(&self, body: &BlackjackRequest<'_>) -> Result<String> {
        self.client
            .send(ApiRequest::post("/games/blackjack/").json(body)?)
            .await
    }

    pub async fn poker(&self, body: &PokerRequest<'_>) -> Result<String> {
        self.client
            .send(ApiRequest::post("/games/poker/").json(body)?)
            .await
    }

    pub async fn minesweeper(&self, body: &MinesweeperRequest<'_>) -> Result<String> {
        self.client
            .send(ApiRequest::post("/games/minesweeper/").json(body)?)
            .await
    }

    pub async fn roulette(&self, bet: &RouletteBet, amount: i64) -> Result<RouletteResult> {
        let (bet_type, bet_value) = bet.wire();
        let request = ApiRequest::post("/games/roulette/").json(&WagerBody {
            bet_type,
            bet_value,
            bet: amount,
        })?;
        self.client.send_json(request).await
    }

    pub async fn dice(&self, bet: &DiceBet, amount: i64) -> Result<DiceResult> {
        let (bet_type, bet_value) = bet.wire();
        let request = ApiRequest::post("/games/dice/").json(&WagerBody {
            bet_type,
            bet_value,
            bet: amount,
        })?;
        self.client.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{json_response, profile_body, ScriptedTransport};
    use crate::transport::MemoryCredentialStore;

    fn api_with(transport: Arc<ScriptedTransport>) -> CasinoApi {
        CasinoApi::new(Arc::new(ApiClient::new(
            transport,
            Arc::new(MemoryCredentialStore::new()),
        )))
    }

    #[tokio::test]
    async fn test_register_sends_confirmation_and_installs_tokens() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            let body = format!(
                r#"{{"tokens":{{"access":"a1","refresh":"r1"}},"user":{{"id":7,"username":"alice","email":"alice@example.com"}},"profile":{}}}"#,
                profile_body("alice", 1000, false)
            );
            Ok(json_response(201, &body))
        }));
        let api = api_with(transport.clone());

        let registration = api.register("alice", "alice@example.com", "hunter22").await.unwrap();
        assert_eq!(registration.profile.coins, 1000);
        assert!(api.is_authenticated());

        let sent = transport.last_request().unwrap();
        let body = sent.json().unwrap();
        assert_eq!(body["password_confirm"], "hunter22");
        assert_eq!(sent.bearer, None);
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_detail() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Ok(json_response(
                401,
                r#"{"detail":"No active account found with the given credentials"}"#,
            ))
        }));
        let api = api_with(transport.clone());

        let err = api.login("alice", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "No active account found with the given credentials");
        assert!(!api.is_authenticated());
        // Unauthenticated endpoints never trigger a refresh
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_admin_paths_embed_request_id() {
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(json_response(403, "{}"))));
        let api = api_with(transport.clone());
        api.client()
            .install_credentials(CredentialPair::new("a", "r"))
            .unwrap();

        let err = api.approve_coin_request(42).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 403, .. }));
        assert_eq!(transport.last_request().unwrap().path, "/admin/approve/42/");
    }
}
