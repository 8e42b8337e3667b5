//! Video poker round protocol: one deal, one draw

use super::{RoundRelay, RoundState, Settlement};
use crate::account::AccountState;
use crate::error::{Error, Result};
use crate::models::Card;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Cards in a dealt hand
pub const HAND_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PokerAction {
    Deal,
    Draw,
}

#[derive(Debug, Serialize)]
pub struct PokerRequest<'a> {
    pub action: PokerAction,
    pub bet: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_indices: Option<&'a [usize]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<&'a RawValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PokerStatus {
    Playing,
    Win(Settlement),
    Lose(Settlement),
}

impl PokerStatus {
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            PokerStatus::Playing => None,
            PokerStatus::Win(s) | PokerStatus::Lose(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokerHand {
    #[serde(flatten)]
    pub status: PokerStatus,
    #[serde(default)]
    pub hand: Vec<Card>,
    /// Evaluated hand name, only after the draw
    pub hand_type: Option<String>,
    pub multiplier: Option<f64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PokerRound {
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub deck: Vec<IgnoredAny>,
}

/// Single-player video poker machine
#[derive(Debug)]
pub struct VideoPokerMachine {
    account: Arc<AccountState>,
    relay: RoundRelay<PokerRound>,
}

impl VideoPokerMachine {
    pub fn new(account: Arc<AccountState>) -> Self {
        let relay = RoundRelay::new("poker", account.session_epoch().clone());
        Self { account, relay }
    }

    pub fn in_round(&self) -> bool {
        self.relay.is_active()
    }

    pub fn round(&self) -> Option<&RoundState<PokerRound>> {
        self.relay.current().map(|r| &r.state)
    }

    pub async fn deal(&mut self, bet: i64) -> Result<PokerHand> {
        self.relay.ensure_idle()?;
        self.account.check_wager(bet)?;

        let request = PokerRequest {
            action: PokerAction::Deal,
            bet,
            hold_indices: None,
            game_state: None,
        };
        let result = self.account.api().poker(&request).await;
        let body = self.relay.observe(result)?;
        self.record(&body, bet)
    }

    /// Keep the cards at `hold_indices` and replace the rest
    pub async fn draw(&mut self, hold_indices: &[usize]) -> Result<PokerHand> {
        let (bet, result) = {
            let round = self.relay.active()?;
            validate_holds(hold_indices, round.state.view().hand.len())?;
            debug!(round = %round.id, holds = ?hold_indices, "Poker draw");

            let request = PokerRequest {
                action: PokerAction::Draw,
                bet: round.bet,
                hold_indices: Some(hold_indices),
                game_state: Some(round.state.raw()),
            };
            (round.bet, self.account.api().poker(&request).await)
        };

        let body = self.relay.observe(result)?;
        let hand = self.record(&body, bet)?;
        if hand.status.settlement().is_none() {
            // The draw always ends the round; do not relay a second draw
            self.relay.finish();
            return Err(Error::Serialization(
                "Draw did not settle the round".to_string(),
            ));
        }
        Ok(hand)
    }

    fn record(&mut self, body: &str, bet: i64) -> Result<PokerHand> {
        let hand: PokerHand = serde_json::from_str(body)?;
        self.relay
            .record(body, hand.status.settlement(), bet, &self.account)?;
        Ok(hand)
    }
}

pub(crate) fn validate_holds(hold_indices: &[usize], hand_len: usize) -> Result<()> {
    let hand_len = if hand_len == 0 { HAND_SIZE } else { hand_len };
    let mut seen = HashSet::new();
    for &index in hold_indices {
        if index >= hand_len {
            return Err(Error::Validation(format!(
                "Hold position {} is outside the hand",
                index
            )));
        }
        if !seen.insert(index) {
            return Err(Error::Validation(format!(
                "Hold position {} listed twice",
                index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_validation() {
        assert!(validate_holds(&[], 5).is_ok());
        assert!(validate_holds(&[0, 2, 4], 5).is_ok());
        assert!(matches!(validate_holds(&[5], 5), Err(Error::Validation(_))));
        assert!(matches!(validate_holds(&[1, 1], 5), Err(Error::Validation(_))));
    }

    #[test]
    fn test_draw_result_parses() {
        let body = r#"{
            "status": "win", "hand": [{"suit":"hearts","rank":"J"}],
            "hand_type": "Jacks or Better", "multiplier": 1, "payout": 100,
            "message": "Jacks or Better!", "coins": 1000, "is_bankrupt": false
        }"#;
        let hand: PokerHand = serde_json::from_str(body).unwrap();
        assert_eq!(hand.hand_type.as_deref(), Some("Jacks or Better"));
        assert_eq!(hand.multiplier, Some(1.0));
        assert_eq!(hand.status.settlement().unwrap().coins, 1000);
    }

    #[test]
    fn test_request_shape() {
        let holds = [0usize, 3];
        let request = PokerRequest {
            action: PokerAction::Draw,
            bet: 25,
            hold_indices: Some(&holds),
            game_state: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"action":"draw","bet":25,"hold_indices":[0,3]}"#
        );
    }
}
