//! Wagerline - client for a server-authoritative coin casino
//!
//! The authority decides every outcome; this crate carries a player's session
//! to it and keeps the local picture consistent:
//! - transport: authenticated HTTP with single-flight token refresh
//! - api: one typed method per authority endpoint
//! - account: the cached profile and its coin balance
//! - gaming: round protocols for blackjack, video poker, minesweeper,
//!   roulette and dice
//! - coins: the coin request and approval workflow

pub mod account;
pub mod api;
pub mod coins;
pub mod config;
pub mod error;
pub mod gaming;
pub mod models;
pub mod testing;
pub mod transport;

pub use account::{AccountPhase, AccountState, BetPresets, SessionEpoch};
pub use api::CasinoApi;
pub use coins::CoinRequestDesk;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorCategory, Result};
pub use gaming::{
    BlackjackTable, DiceBet, DiceTable, MinesweeperField, RouletteBet, RouletteWheel, Settlement,
    VideoPokerMachine,
};
pub use models::{Card, CoinRequest, CoinRequestStatus, UserProfile};
pub use transport::{ApiClient, CredentialPair, CredentialStore, HttpTransport};

use std::sync::Arc;

/// Wire up transport, API and account state from a configuration
pub fn connect(config: &ClientConfig) -> Result<Arc<AccountState>> {
    let client = Arc::new(ApiClient::from_config(config)?);
    Ok(AccountState::new(CasinoApi::new(client)))
}
