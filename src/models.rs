//! Wire types shared across the client

use crate::transport::CredentialPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}

/// Account profile with the coin balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: UserRef,
    pub coins: i64,
    #[serde(default, deserialize_with = "amount")]
    pub total_wagered: i64,
    #[serde(default, deserialize_with = "amount")]
    pub total_won: i64,
    #[serde(default, deserialize_with = "amount")]
    pub total_lost: i64,
    #[serde(default)]
    pub games_played: u64,
    #[serde(default)]
    pub is_bankrupt: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Replace the balance and keep the bankruptcy flag consistent with it
    pub(crate) fn set_coins(&mut self, coins: i64) {
        self.coins = coins;
        self.is_bankrupt = coins <= 0;
    }
}

/// Reply to a successful registration
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub tokens: CredentialPair,
    pub user: UserRef,
    pub profile: UserProfile,
}

/// One finished round from the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameHistoryEntry {
    pub id: u64,
    pub game_type: String,
    #[serde(deserialize_with = "amount")]
    pub bet_amount: i64,
    pub won: bool,
    #[serde(deserialize_with = "amount")]
    pub payout: i64,
    #[serde(default)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl fmt::Display for CoinRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinRequestStatus::Pending => write!(f, "pending"),
            CoinRequestStatus::Approved => write!(f, "approved"),
            CoinRequestStatus::Denied => write!(f, "denied"),
        }
    }
}

/// Staff member who processed a coin request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: u64,
    pub username: String,
}

/// A request for more coins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRequest {
    pub id: u64,
    pub user: UserRef,
    pub amount: i64,
    #[serde(default)]
    pub reason: String,
    pub status: CoinRequestStatus,
    #[serde(default)]
    pub reviewed_by: Option<Reviewer>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl CoinRequest {
    pub fn is_pending(&self) -> bool {
        self.status == CoinRequestStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseEdge {
    pub base_house_edge: String,
    pub our_house_edge: String,
    pub expected_loss_per_100_bets: String,
}

/// Static house-edge explainer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationContent {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<EducationSection>,
    #[serde(default)]
    pub math_breakdown: BTreeMap<String, HouseEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub fn symbol(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: String,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit.symbol())
    }
}

/// Render a hand as `A♠ 10♥`
pub fn format_hand(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Coin amounts arrive as integers, but decimal fields serialize as floats
pub(crate) fn amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Int(v) => Ok(v),
        Amount::Float(v) => Ok(v.round() as i64),
        Amount::Text(s) => s
            .parse::<f64>()
            .map(|v| v.round() as i64)
            .map_err(serde::de::Error::custom),
    }
}
