//! Advisory payout previews
//!
//! Numbers shown before a round settles. They are computed locally from the
//! published tables and are never applied to the account; only a
//! [`Settlement`](super::Settlement) from the authority moves coins.

use std::fmt;

/// Locally estimated coin amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AdvisoryPayout(i64);

impl AdvisoryPayout {
    pub fn coins(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AdvisoryPayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{} coins", self.0)
    }
}

/// Locally known payout multiplier
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AdvisoryMultiplier(f64);

impl AdvisoryMultiplier {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Estimated profit on `bet` at this multiplier
    pub fn profit_on(self, bet: i64) -> AdvisoryPayout {
        AdvisoryPayout((bet as f64 * self.0).round() as i64)
    }
}

impl fmt::Display for AdvisoryMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Published video poker pay table, best hand first
pub const POKER_PAY_TABLE: [(&str, u32); 9] = [
    ("Royal Flush", 250),
    ("Straight Flush", 50),
    ("Four of a Kind", 25),
    ("Full House", 9),
    ("Flush", 6),
    ("Straight", 4),
    ("Three of a Kind", 3),
    ("Two Pair", 2),
    ("Jacks+", 1),
];

/// Profit if the board were cashed out now
pub fn minesweeper_potential_win(bet: i64, multiplier: f64) -> AdvisoryPayout {
    AdvisoryPayout((bet as f64 * multiplier - bet as f64).round() as i64)
}

/// Total credited by a cashout at `multiplier`
pub fn minesweeper_cashout_value(bet: i64, multiplier: f64) -> AdvisoryPayout {
    AdvisoryPayout((bet as f64 * multiplier).round() as i64)
}

/// Multiplier for an exact-total dice bet
pub fn dice_exact_multiplier(total: u8) -> Option<AdvisoryMultiplier> {
    let multiplier = match total {
        2 | 12 => 35.0,
        3 | 11 => 17.0,
        4 | 10 => 11.0,
        5 | 9 => 8.0,
        6 | 8 => 6.0,
        7 => 5.0,
        _ => return None,
    };
    Some(AdvisoryMultiplier(multiplier))
}

/// Multiplier for a lucky-seven dice bet
pub fn dice_seven_multiplier() -> AdvisoryMultiplier {
    AdvisoryMultiplier(4.0)
}

/// Multiplier for a straight-up roulette number
pub fn roulette_number_multiplier() -> AdvisoryMultiplier {
    AdvisoryMultiplier(35.0)
}

/// Pay table entry for a hand name as the authority spells it
pub fn poker_pay_multiplier(hand_type: &str) -> Option<AdvisoryMultiplier> {
    let wanted = hand_type.trim().to_ascii_lowercase();
    POKER_PAY_TABLE
        .iter()
        .find(|(name, _)| {
            let name = name.to_ascii_lowercase();
            name == wanted || (name == "jacks+" && wanted.starts_with("jacks or better"))
        })
        .map(|(_, multiplier)| AdvisoryMultiplier(f64::from(*multiplier)))
}
