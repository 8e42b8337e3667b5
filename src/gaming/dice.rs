//! Dice: single-shot wagers on the total of two dice

use super::preview::{self, AdvisoryMultiplier};
use super::{BetValue, EchoedBetValue, Parity, Settlement};
use crate::account::AccountState;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiceBet {
    /// Total strictly above the line, 6 to 10
    Over(u8),
    /// Total strictly below the line, 5 to 9
    Under(u8),
    Seven,
    OddEven(Parity),
    /// Exact total, 2 to 12
    Exact(u8),
}

impl DiceBet {
    pub fn parse(bet_type: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let number = || -> Result<u8> {
            value
                .parse()
                .map_err(|_| Error::Validation(format!("'{}' is not a valid number", value)))
        };

        let bet = match bet_type.to_ascii_lowercase().as_str() {
            "over" => DiceBet::Over(number()?),
            "under" => DiceBet::Under(number()?),
            "seven" => DiceBet::Seven,
            "odd_even" => DiceBet::OddEven(Parity::parse(value)?),
            "exact" => DiceBet::Exact(number()?),
            other => {
                return Err(Error::Validation(format!(
                    "Unknown dice bet type '{}'",
                    other
                )))
            }
        };
        bet.validate()?;
        Ok(bet)
    }

    pub fn validate(&self) -> Result<()> {
        let (name, value, range) = match *self {
            DiceBet::Over(v) => ("Over", v, 6..=10),
            DiceBet::Under(v) => ("Under", v, 5..=9),
            DiceBet::Exact(v) => ("Exact", v, 2..=12),
            DiceBet::Seven | DiceBet::OddEven(_) => return Ok(()),
        };

        if range.contains(&value) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "{} line must be between {} and {}, got {}",
                name,
                range.start(),
                range.end(),
                value
            )))
        }
    }

    pub fn wire(&self) -> (&'static str, BetValue) {
        match *self {
            DiceBet::Over(v) => ("over", BetValue::Number(v)),
            DiceBet::Under(v) => ("under", BetValue::Number(v)),
            DiceBet::Seven => ("seven", BetValue::Text("seven")),
            DiceBet::OddEven(parity) => ("odd_even", BetValue::Text(parity.as_str())),
            DiceBet::Exact(v) => ("exact", BetValue::Number(v)),
        }
    }

    /// Published multiplier where one is fixed
    pub fn advisory_multiplier(&self) -> Option<AdvisoryMultiplier> {
        match *self {
            DiceBet::Exact(total) => preview::dice_exact_multiplier(total),
            DiceBet::Seven => Some(preview::dice_seven_multiplier()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiceResult {
    pub die1: u8,
    pub die2: u8,
    pub total: u8,
    pub won: bool,
    pub bet_type: String,
    pub bet_value: EchoedBetValue,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub settlement: Settlement,
}

/// Dice table; every roll settles immediately
#[derive(Debug, Clone)]
pub struct DiceTable {
    account: Arc<AccountState>,
}

impl DiceTable {
    pub fn new(account: Arc<AccountState>) -> Self {
        Self { account }
    }

    pub async fn roll(&self, bet: &DiceBet, amount: i64) -> Result<DiceResult> {
        bet.validate()?;
        self.account.check_wager(amount)?;

        let result = self.account.api().dice(bet, amount).await?;
        result.settlement.apply(&self.account);
        info!(
            die1 = result.die1,
            die2 = result.die2,
            won = result.won,
            coins = result.settlement.coins,
            "Dice roll settled"
        );
        Ok(result)
    }
}
