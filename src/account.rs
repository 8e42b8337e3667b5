//! Account and bankroll state
//!
//! [`AccountState`] is the single writer of the cached profile. Game
//! protocols push authority-issued balances through
//! [`AccountState::apply_coin_update`]; nothing here derives a balance from
//! deltas.

use crate::api::CasinoApi;
use crate::error::{Error, Result};
use crate::models::{EducationContent, GameHistoryEntry, UserProfile};
use crate::transport::SessionListener;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Fixed bet shortcuts, offered only when affordable
pub const BET_PRESETS: [i64; 4] = [10, 50, 100, 500];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountPhase {
    Uninitialized,
    Loading,
    Ready,
    Anonymous,
    /// Logged out explicitly
    Destroyed,
}

/// Bet shortcuts derived from the live balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetPresets {
    pub fixed: Vec<i64>,
    pub half: i64,
    pub max: i64,
}

impl BetPresets {
    pub fn for_balance(coins: i64) -> Self {
        let coins = coins.max(0);
        Self {
            fixed: BET_PRESETS.iter().copied().filter(|p| *p <= coins).collect(),
            half: coins / 2,
            max: coins,
        }
    }
}

/// Counter bumped whenever the signed-in identity changes or goes away.
/// Round state and cached coin requests are only valid for the epoch they
/// were obtained in.
#[derive(Debug, Clone, Default)]
pub struct SessionEpoch(Arc<AtomicU64>);

impl SessionEpoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug)]
struct Inner {
    phase: AccountPhase,
    profile: Option<UserProfile>,
    profile_loaded_at: Option<DateTime<Utc>>,
}

/// Shared current-user container
#[derive(Debug)]
pub struct AccountState {
    api: CasinoApi,
    inner: RwLock<Inner>,
    epoch: SessionEpoch,
}

impl AccountState {
    /// Create the container and subscribe it to session expiry
    pub fn new(api: CasinoApi) -> Arc<Self> {
        let state = Arc::new(Self {
            api,
            inner: RwLock::new(Inner {
                phase: AccountPhase::Uninitialized,
                profile: None,
                profile_loaded_at: None,
            }),
            epoch: SessionEpoch::default(),
        });

        let listener: Weak<dyn SessionListener> = Arc::downgrade(&state) as Weak<dyn SessionListener>;
        state.api.client().subscribe(listener);
        state
    }

    pub fn api(&self) -> &CasinoApi {
        &self.api
    }

    pub fn phase(&self) -> AccountPhase {
        self.inner.read().phase
    }

    pub fn session_epoch(&self) -> &SessionEpoch {
        &self.epoch
    }

    /// When the cached profile was last fetched from the authority
    pub fn profile_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().profile_loaded_at
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.read().profile.clone()
    }

    pub fn coins(&self) -> Option<i64> {
        self.inner.read().profile.as_ref().map(|p| p.coins)
    }

    pub fn is_bankrupt(&self) -> bool {
        self.inner
            .read()
            .profile
            .as_ref()
            .map(|p| p.is_bankrupt)
            .unwrap_or(false)
    }

    pub fn is_staff(&self) -> bool {
        self.inner
            .read()
            .profile
            .as_ref()
            .map(|p| p.user.is_staff)
            .unwrap_or(false)
    }

    /// Restore a persisted session.
    ///
    /// Only an expired session signs out; any other failure keeps the stored
    /// credentials and is returned so the next start can try again.
    pub async fn bootstrap(&self) -> Result<AccountPhase> {
        if !self.api.is_authenticated() {
            self.set_phase(AccountPhase::Anonymous);
            return Ok(AccountPhase::Anonymous);
        }

        self.set_phase(AccountPhase::Loading);
        match self.api.profile().await {
            Ok(profile) => {
                debug!(username = %profile.user.username, "Session restored");
                self.install_profile(profile);
                Ok(AccountPhase::Ready)
            }
            Err(e) if e.requires_login() => {
                warn!("Stored session is no longer valid, signing out");
                self.api.logout()?;
                self.clear(AccountPhase::Anonymous);
                Ok(AccountPhase::Anonymous)
            }
            Err(e) => {
                warn!("Could not restore session, keeping credentials: {}", e);
                self.set_phase(AccountPhase::Uninitialized);
                Err(e)
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        self.set_phase(AccountPhase::Loading);
        let outcome = async {
            self.api.login(username, password).await?;
            self.api.profile().await
        }
        .await;

        match outcome {
            Ok(profile) => {
                self.epoch.advance();
                self.install_profile(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                self.set_phase(self.resting_phase());
                Err(e)
            }
        }
    }

    /// Create an account and adopt the profile returned with it
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserProfile> {
        self.set_phase(AccountPhase::Loading);
        match self.api.register(username, email, password).await {
            Ok(registration) => {
                self.epoch.advance();
                self.install_profile(registration.profile.clone());
                Ok(registration.profile)
            }
            Err(e) => {
                self.set_phase(self.resting_phase());
                Err(e)
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.clear(AccountPhase::Destroyed);
        info!("Logged out");
        self.api.logout()
    }

    /// Re-fetch the whole profile from the authority
    pub async fn refresh(&self) -> Result<UserProfile> {
        let profile = self.api.profile().await?;
        self.install_profile(profile.clone());
        Ok(profile)
    }

    /// Replace the coin balance with an authority-issued value
    pub fn apply_coin_update(&self, coins: i64) {
        let mut inner = self.inner.write();
        match inner.profile.as_mut() {
            Some(profile) => {
                debug!(from = profile.coins, to = coins, "Coin balance updated");
                profile.set_coins(coins);
            }
            None => warn!(coins, "Coin update ignored, no profile loaded"),
        }
    }

    /// Refuse a wager the current balance cannot cover
    pub fn check_wager(&self, bet: i64) -> Result<()> {
        if bet < 1 {
            return Err(Error::Validation("Bet must be at least 1 coin".to_string()));
        }

        let coins = self
            .coins()
            .ok_or_else(|| Error::Validation("No account loaded".to_string()))?;
        if bet > coins {
            return Err(Error::Validation(format!(
                "Bet of {} exceeds your balance of {}",
                bet, coins
            )));
        }

        Ok(())
    }

    pub fn bet_presets(&self) -> BetPresets {
        BetPresets::for_balance(self.coins().unwrap_or(0))
    }

    pub async fn history(&self) -> Result<Vec<GameHistoryEntry>> {
        self.api.history().await
    }

    pub async fn education(&self) -> Result<EducationContent> {
        self.api.education().await
    }

    fn install_profile(&self, mut profile: UserProfile) {
        // Keep the invariant even if the authority's flag lags
        let coins = profile.coins;
        profile.set_coins(coins);

        let mut inner = self.inner.write();
        inner.profile = Some(profile);
        inner.profile_loaded_at = Some(Utc::now());
        inner.phase = AccountPhase::Ready;
    }

    fn clear(&self, phase: AccountPhase) {
        {
            let mut inner = self.inner.write();
            inner.profile = None;
            inner.profile_loaded_at = None;
            inner.phase = phase;
        }
        let epoch = self.epoch.advance();
        debug!(epoch, ?phase, "Session state cleared");
    }

    fn set_phase(&self, phase: AccountPhase) {
        self.inner.write().phase = phase;
    }

    fn resting_phase(&self) -> AccountPhase {
        if self.inner.read().profile.is_some() {
            AccountPhase::Ready
        } else {
            AccountPhase::Anonymous
        }
    }
}

impl SessionListener for AccountState {
    fn on_session_expired(&self) {
        warn!("Session expired, signing out");
        self.clear(AccountPhase::Anonymous);
    }
}
