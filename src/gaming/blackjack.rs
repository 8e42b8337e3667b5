//! Blackjack round protocol
//!
//! `deal` opens a round; `hit`, `stand` and `double` continue it with the
//! round's original bet until the authority reports a terminal status.

use super::{RoundRelay, RoundState, Settlement};
use crate::account::AccountState;
use crate::error::{Error, Result};
use crate::models::Card;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlackjackAction {
    Deal,
    Hit,
    Stand,
    Double,
}

#[derive(Debug, Serialize)]
pub struct BlackjackRequest<'a> {
    pub action: BlackjackAction,
    pub bet: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<&'a RawValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BlackjackStatus {
    Playing,
    Win(Settlement),
    Lose(Settlement),
    Bust(Settlement),
    Blackjack(Settlement),
    Push(Settlement),
}

impl BlackjackStatus {
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            BlackjackStatus::Playing => None,
            BlackjackStatus::Win(s)
            | BlackjackStatus::Lose(s)
            | BlackjackStatus::Bust(s)
            | BlackjackStatus::Blackjack(s)
            | BlackjackStatus::Push(s) => Some(s),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.settlement().is_some()
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlackjackStatus::Playing => "playing",
            BlackjackStatus::Win(_) => "win",
            BlackjackStatus::Lose(_) => "lose",
            BlackjackStatus::Bust(_) => "bust",
            BlackjackStatus::Blackjack(_) => "blackjack",
            BlackjackStatus::Push(_) => "push",
        }
    }
}

/// What the table shows after an action
#[derive(Debug, Clone, Deserialize)]
pub struct BlackjackHand {
    #[serde(flatten)]
    pub status: BlackjackStatus,
    #[serde(default)]
    pub player_hand: Vec<Card>,
    /// Visible dealer cards; the hole card stays hidden until the round ends
    #[serde(default)]
    pub dealer_hand: Vec<Card>,
    #[serde(default)]
    pub player_value: u32,
    pub dealer_value: Option<u32>,
    pub dealer_visible: Option<u32>,
    #[serde(default)]
    pub message: String,
}

/// Typed reading of a `playing` reply. The deck and the full dealer hand are
/// counted, never inspected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlackjackRound {
    #[serde(default)]
    pub deck: Vec<IgnoredAny>,
    #[serde(default)]
    pub player_hand: Vec<Card>,
    #[serde(default)]
    pub full_dealer_hand: Vec<IgnoredAny>,
}

impl BlackjackRound {
    pub fn cards_remaining(&self) -> usize {
        self.deck.len()
    }
}

/// One seat at the blackjack table
#[derive(Debug)]
pub struct BlackjackTable {
    account: Arc<AccountState>,
    relay: RoundRelay<BlackjackRound>,
}

impl BlackjackTable {
    pub fn new(account: Arc<AccountState>) -> Self {
        let relay = RoundRelay::new("blackjack", account.session_epoch().clone());
        Self { account, relay }
    }

    pub fn in_round(&self) -> bool {
        self.relay.is_active()
    }

    pub fn round(&self) -> Option<&RoundState<BlackjackRound>> {
        self.relay.current().map(|r| &r.state)
    }

    /// Bet of the round in progress
    pub fn round_bet(&self) -> Option<i64> {
        self.relay.current().map(|r| r.bet)
    }

    /// Doubling needs exactly two cards and enough coins to match the bet
    pub fn can_double(&self) -> bool {
        match self.relay.current() {
            Some(round) => {
                round.state.view().player_hand.len() == 2
                    && self.account.coins().unwrap_or(0) >= round.bet
            }
            None => false,
        }
    }

    pub async fn deal(&mut self, bet: i64) -> Result<BlackjackHand> {
        self.relay.ensure_idle()?;
        self.account.check_wager(bet)?;

        let request = BlackjackRequest {
            action: BlackjackAction::Deal,
            bet,
            game_state: None,
        };
        let result = self.account.api().blackjack(&request).await;
        let body = self.relay.observe(result)?;
        self.record(&body, bet)
    }

    pub async fn hit(&mut self) -> Result<BlackjackHand> {
        self.continue_round(BlackjackAction::Hit).await
    }

    pub async fn stand(&mut self) -> Result<BlackjackHand> {
        self.continue_round(BlackjackAction::Stand).await
    }

    pub async fn double(&mut self) -> Result<BlackjackHand> {
        self.relay.active()?;
        if !self.can_double() {
            return Err(Error::Rejected(
                "Double down needs two cards and coins to match the bet".to_string(),
            ));
        }
        self.continue_round(BlackjackAction::Double).await
    }

    async fn continue_round(&mut self, action: BlackjackAction) -> Result<BlackjackHand> {
        let (bet, result) = {
            let round = self.relay.active()?;
            debug!(round = %round.id, ?action, "Blackjack action");
            let request = BlackjackRequest {
                action,
                bet: round.bet,
                game_state: Some(round.state.raw()),
            };
            (round.bet, self.account.api().blackjack(&request).await)
        };

        let body = self.relay.observe(result)?;
        self.record(&body, bet)
    }

    fn record(&mut self, body: &str, bet: i64) -> Result<BlackjackHand> {
        let hand: BlackjackHand = serde_json::from_str(body)?;
        self.relay
            .record(body, hand.status.settlement(), bet, &self.account)?;
        Ok(hand)
    }
}
