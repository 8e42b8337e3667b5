//! Roulette: single-shot wagers on one spin

use super::{BetValue, EchoedBetValue, Parity, Settlement};
use crate::account::AccountState;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PocketColor {
    Red,
    Black,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    Low,
    High,
}

/// A wager on the outcome of one spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouletteBet {
    /// Red or black only
    Color(PocketColor),
    OddEven(Parity),
    HighLow(Half),
    /// 1, 2 or 3
    Dozen(u8),
    /// 0 to 36
    Number(u8),
}

impl RouletteBet {
    /// Build a bet from its wire name and value, e.g. `("dozen", "2")`
    pub fn parse(bet_type: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let bet = match bet_type.to_ascii_lowercase().as_str() {
            "color" => match value.to_ascii_lowercase().as_str() {
                "red" => RouletteBet::Color(PocketColor::Red),
                "black" => RouletteBet::Color(PocketColor::Black),
                other => {
                    return Err(Error::Validation(format!(
                        "Color must be red or black, got '{}'",
                        other
                    )))
                }
            },
            "odd_even" => RouletteBet::OddEven(Parity::parse(value)?),
            "high_low" => match value.to_ascii_lowercase().as_str() {
                "low" => RouletteBet::HighLow(Half::Low),
                "high" => RouletteBet::HighLow(Half::High),
                other => {
                    return Err(Error::Validation(format!(
                        "Expected low or high, got '{}'",
                        other
                    )))
                }
            },
            "dozen" => RouletteBet::Dozen(parse_number(value)?),
            "number" => RouletteBet::Number(parse_number(value)?),
            other => {
                return Err(Error::Validation(format!(
                    "Unknown roulette bet type '{}'",
                    other
                )))
            }
        };
        bet.validate()?;
        Ok(bet)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            RouletteBet::Color(PocketColor::Green) => Err(Error::Validation(
                "Green cannot be bet as a color".to_string(),
            )),
            RouletteBet::Dozen(d) if !(1..=3).contains(&d) => Err(Error::Validation(format!(
                "Dozen must be 1, 2 or 3, got {}",
                d
            ))),
            RouletteBet::Number(n) if n > 36 => Err(Error::Validation(format!(
                "Number must be between 0 and 36, got {}",
                n
            ))),
            _ => Ok(()),
        }
    }

    /// `bet_type` and `bet_value` as sent to the authority
    pub fn wire(&self) -> (&'static str, BetValue) {
        match *self {
            RouletteBet::Color(color) => (
                "color",
                BetValue::Text(match color {
                    PocketColor::Red => "red",
                    PocketColor::Black => "black",
                    PocketColor::Green => "green",
                }),
            ),
            RouletteBet::OddEven(parity) => ("odd_even", BetValue::Text(parity.as_str())),
            RouletteBet::HighLow(Half::Low) => ("high_low", BetValue::Text("low")),
            RouletteBet::HighLow(Half::High) => ("high_low", BetValue::Text("high")),
            RouletteBet::Dozen(d) => ("dozen", BetValue::Number(d)),
            RouletteBet::Number(n) => ("number", BetValue::Number(n)),
        }
    }
}

fn parse_number(value: &str) -> Result<u8> {
    value
        .parse()
        .map_err(|_| Error::Validation(format!("'{}' is not a valid number", value)))
}

/// Winning pocket; American wheels add a `"00"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pocket {
    Number(u8),
    Label(String),
}

impl fmt::Display for Pocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pocket::Number(n) => write!(f, "{}", n),
            Pocket::Label(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouletteResult {
    pub result: Pocket,
    pub color: PocketColor,
    pub won: bool,
    pub bet_type: String,
    pub bet_value: EchoedBetValue,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub settlement: Settlement,
}

/// Roulette table; every spin settles immediately
#[derive(Debug, Clone)]
pub struct RouletteWheel {
    account: Arc<AccountState>,
}

impl RouletteWheel {
    pub fn new(account: Arc<AccountState>) -> Self {
        Self { account }
    }

    pub async fn spin(&self, bet: &RouletteBet, amount: i64) -> Result<RouletteResult> {
        bet.validate()?;
        self.account.check_wager(amount)?;

        let result = self.account.api().roulette(bet, amount).await?;
        result.settlement.apply(&self.account);
        info!(
            pocket = %result.result,
            won = result.won,
            coins = result.settlement.coins,
            "Roulette spin settled"
        );
        Ok(result)
    }
}
