//! Game round protocols
//!
//! ## Stateful games
//! Blackjack, video poker and minesweeper keep their round on the client as
//! the verbatim body of the last `playing` reply. Each action sends that body
//! back untouched as `game_state`; a terminal status drops it.
//!
//! ## Single-shot games
//! Roulette and dice settle in one request and carry no round state.
//!
//! Every terminal reply carries a [`Settlement`]; its coin balance is applied
//! to the [`AccountState`] before the outcome is handed back.

pub mod blackjack;
pub mod dice;
pub mod minesweeper;
pub mod poker;
pub mod preview;
pub mod roulette;

pub use blackjack::{BlackjackHand, BlackjackRound, BlackjackStatus, BlackjackTable};
pub use dice::{DiceBet, DiceResult, DiceTable};
pub use minesweeper::{MinesweeperBoard, MinesweeperField, MinesweeperRound, MinesweeperStatus};
pub use poker::{PokerHand, PokerRound, PokerStatus, VideoPokerMachine};
pub use preview::{AdvisoryMultiplier, AdvisoryPayout};
pub use roulette::{Pocket, RouletteBet, RouletteResult, RouletteWheel};

use crate::account::{AccountState, SessionEpoch};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Authority-confirmed result of a finished round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Total credited back, stake included; zero on a loss
    #[serde(default, deserialize_with = "crate::models::amount")]
    pub payout: i64,
    /// Balance after the round
    pub coins: i64,
    pub is_bankrupt: bool,
}

impl Settlement {
    /// Push the new balance into the account
    pub fn apply(&self, account: &AccountState) {
        account.apply_coin_update(self.coins);
        if self.is_bankrupt != (self.coins <= 0) {
            warn!(
                coins = self.coins,
                is_bankrupt = self.is_bankrupt,
                "Authority bankruptcy flag disagrees with balance"
            );
        }
    }
}

/// `bet_value` of a single-shot wager: a number or a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BetValue {
    Number(u8),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn as_str(self) -> &'static str {
        match self {
            Parity::Odd => "odd",
            Parity::Even => "even",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            other => Err(Error::Validation(format!(
                "Expected odd or even, got '{}'",
                other
            ))),
        }
    }
}

/// `bet_value` as echoed back in a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EchoedBetValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for EchoedBetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoedBetValue::Number(n) => write!(f, "{}", n),
            EchoedBetValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Server-issued state of an unfinished round
///
/// `raw` is exactly what the authority sent; `view` is a typed reading of the
/// fields the client displays. Only `raw` is ever sent back.
pub struct RoundState<V> {
    raw: Box<RawValue>,
    view: V,
}

impl<V: DeserializeOwned> RoundState<V> {
    pub fn from_body(body: &str) -> Result<Self> {
        let raw = RawValue::from_string(body.to_owned())?;
        let view = serde_json::from_str(raw.get())?;
        Ok(Self { raw, view })
    }
}

impl<V> RoundState<V> {
    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    pub fn view(&self) -> &V {
        &self.view
    }
}

impl<V: fmt::Debug> fmt::Debug for RoundState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundState")
            .field("bytes", &self.raw.get().len())
            .field("view", &self.view)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct ActiveRound<V> {
    pub id: Uuid,
    pub bet: i64,
    pub state: RoundState<V>,
    /// Session the round was opened in
    epoch: u64,
}

/// Holds at most one unfinished round for a game.
///
/// A round opened before the last logout, login or session expiry is treated
/// as absent and is never relayed under the new session.
#[derive(Debug)]
pub(crate) struct RoundRelay<V> {
    game: &'static str,
    session: SessionEpoch,
    round: Option<ActiveRound<V>>,
}

impl<V> RoundRelay<V> {
    pub fn new(game: &'static str, session: SessionEpoch) -> Self {
        Self {
            game,
            session,
            round: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    pub fn current(&self) -> Option<&ActiveRound<V>> {
        let epoch = self.session.current();
        self.round.as_ref().filter(|round| round.epoch == epoch)
    }

    pub fn ensure_idle(&self) -> Result<()> {
        match self.current() {
            Some(_) => Err(Error::Rejected(format!(
                "A {} round is already in progress",
                self.game
            ))),
            None => Ok(()),
        }
    }

    pub fn active(&self) -> Result<&ActiveRound<V>> {
        self.current()
            .ok_or_else(|| Error::Rejected(format!("No {} round in progress", self.game)))
    }

    pub fn begin(&mut self, bet: i64, state: RoundState<V>) -> Uuid {
        if let Some(stale) = self.round.take() {
            debug!(game = self.game, round = %stale.id, "Discarding round from an earlier session");
        }
        let id = Uuid::new_v4();
        let epoch = self.session.current();
        debug!(game = self.game, round = %id, bet, epoch, "Round opened");
        self.round = Some(ActiveRound {
            id,
            bet,
            state,
            epoch,
        });
        id
    }

    /// Replace the state of the current round, keeping its id and bet
    pub fn advance(&mut self, state: RoundState<V>) {
        let epoch = self.session.current();
        if let Some(round) = self.round.as_mut().filter(|round| round.epoch == epoch) {
            round.state = state;
        }
    }

    pub fn finish(&mut self) -> Option<ActiveRound<V>> {
        let epoch = self.session.current();
        let round = self.round.take().filter(|round| round.epoch == epoch);
        if let Some(round) = &round {
            debug!(game = self.game, round = %round.id, "Round closed");
        }
        round
    }

    /// A failed action keeps the round, except when the session is gone
    pub fn on_error(&mut self, error: &Error) {
        if matches!(error, Error::SessionExpired) {
            if let Some(round) = self.round.take() {
                warn!(game = self.game, round = %round.id, "Session expired, round state dropped");
            }
        }
    }

    pub fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.on_error(e);
        }
        result
    }
}

impl<V: DeserializeOwned> RoundRelay<V> {
    /// Store a `playing` reply as the round state, or settle and close the round
    pub fn record(
        &mut self,
        body: &str,
        settlement: Option<&Settlement>,
        bet: i64,
        account: &AccountState,
    ) -> Result<()> {
        match settlement {
            Some(settlement) => {
                settlement.apply(account);
                self.finish();
            }
            None => {
                let state = RoundState::from_body(body)?;
                if self.is_active() {
                    self.advance(state);
                } else {
                    self.begin(bet, state);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct View {
        step: u32,
    }

    #[test]
    fn test_round_state_keeps_unknown_fields_verbatim() {
        let body = r#"{"step":1,"secret":{"mine_positions":[1,2]},"z":0.10}"#;
        let state: RoundState<View> = RoundState::from_body(body).unwrap();
        assert_eq!(state.view().step, 1);
        assert_eq!(state.raw().get(), body);
    }

    #[test]
    fn test_relay_lifecycle() {
        let mut relay: RoundRelay<View> = RoundRelay::new("test", SessionEpoch::default());
        assert!(relay.ensure_idle().is_ok());
        assert!(matches!(relay.active(), Err(Error::Rejected(_))));

        let id = relay.begin(100, RoundState::from_body(r#"{"step":1}"#).unwrap());
        assert!(matches!(relay.ensure_idle(), Err(Error::Rejected(_))));

        relay.advance(RoundState::from_body(r#"{"step":2}"#).unwrap());
        let round = relay.active().unwrap();
        assert_eq!(round.id, id);
        assert_eq!(round.bet, 100);
        assert_eq!(round.state.view().step, 2);

        assert!(relay.finish().is_some());
        assert!(!relay.is_active());
    }

    #[test]
    fn test_relay_drops_round_only_on_session_expiry() {
        let mut relay: RoundRelay<View> = RoundRelay::new("test", SessionEpoch::default());
        relay.begin(10, RoundState::from_body(r#"{"step":1}"#).unwrap());

        relay.on_error(&Error::Network("timeout".into()));
        assert!(relay.is_active());

        relay.on_error(&Error::SessionExpired);
        assert!(!relay.is_active());
    }

    #[test]
    fn test_relay_forgets_round_from_earlier_session() {
        let session = SessionEpoch::default();
        let mut relay: RoundRelay<View> = RoundRelay::new("test", session.clone());
        relay.begin(10, RoundState::from_body(r#"{"step":1}"#).unwrap());
        assert!(relay.is_active());

        session.advance();
        assert!(!relay.is_active());
        assert!(relay.ensure_idle().is_ok());
        assert!(matches!(relay.active(), Err(Error::Rejected(_))));

        // Advancing a forgotten round is a no-op and finishing returns nothing
        relay.advance(RoundState::from_body(r#"{"step":2}"#).unwrap());
        assert!(relay.current().is_none());
        assert!(relay.finish().is_none());

        relay.begin(20, RoundState::from_body(r#"{"step":1}"#).unwrap());
        assert_eq!(relay.active().unwrap().bet, 20);
    }

    #[test]
    fn test_settlement_accepts_decimal_payout() {
        let s: Settlement =
            serde_json::from_str(r#"{"payout":150.0,"coins":1050,"is_bankrupt":false}"#).unwrap();
        assert_eq!(s.payout, 150);

        let s: Settlement = serde_json::from_str(r#"{"coins":0,"is_bankrupt":true}"#).unwrap();
        assert_eq!(s.payout, 0);
    }

    #[test]
    fn test_bet_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&BetValue::Number(17)).unwrap(), "17");
        assert_eq!(serde_json::to_string(&BetValue::Text("red")).unwrap(), "\"red\"");
    }
}
