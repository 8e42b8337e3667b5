//! Application state and initialization

use std::sync::Arc;
use tracing::{debug, info};

use wagerline::{AccountPhase, AccountState, ClientConfig, CoinRequestDesk, Result};

/// Main Wagerline application
pub struct WagerlineApp {
    pub account: Arc<AccountState>,
    pub coins: CoinRequestDesk,
}

impl WagerlineApp {
    /// Connect to the authority and restore any saved session
    pub async fn new(config: ClientConfig) -> Result<Self> {
        debug!(base_url = %config.base_url, "Connecting");
        let account = wagerline::connect(&config)?;

        match account.bootstrap().await? {
            AccountPhase::Ready => {
                if let Some(profile) = account.profile() {
                    info!(username = %profile.user.username, "Session restored");
                }
            }
            phase => debug!(?phase, "No active session"),
        }

        let coins = CoinRequestDesk::new(account.clone());
        Ok(Self { account, coins })
    }

    pub fn is_signed_in(&self) -> bool {
        self.account.phase() == AccountPhase::Ready
    }
}
