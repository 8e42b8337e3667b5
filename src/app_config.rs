//! Command-line interface definition and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wagerline::{DiceBet, RouletteBet};

/// Command-line interface definition for Wagerline
#[derive(Parser)]
#[command(name = "wagerline")]
#[command(about = "Play the coin casino from your terminal", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Authority base URL (overrides config file and WAGERLINE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where to keep the login tokens
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands for the Wagerline CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in
    Login {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored tokens
    Logout,

    /// Show balance and lifetime statistics
    Profile,

    /// List past rounds
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show the house-edge explainer
    Learn,

    /// Spin the roulette wheel
    Roulette {
        /// color, odd_even, high_low, dozen or number
        bet_type: String,
        /// red/black, odd/even, low/high, 1-3 or 0-36
        bet_value: String,
        #[arg(long, default_value = "10")]
        bet: i64,
    },

    /// Roll two dice
    Dice {
        /// over, under, seven, odd_even or exact
        bet_type: String,
        #[arg(default_value = "")]
        bet_value: String,
        #[arg(long, default_value = "10")]
        bet: i64,
    },

    /// Play a hand of blackjack
    Blackjack {
        #[arg(long, default_value = "10")]
        bet: i64,
    },

    /// Play one hand of video poker
    Poker {
        #[arg(long, default_value = "10")]
        bet: i64,
    },

    /// Play a minesweeper board
    Mines {
        #[arg(long, default_value = "10")]
        bet: i64,
        #[arg(long, default_value = "5")]
        grid: u8,
        #[arg(long, default_value = "5")]
        mines: u8,
    },

    /// Coin requests
    #[command(subcommand)]
    Coins(CoinCommands),

    /// Staff tools
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand)]
pub enum CoinCommands {
    /// Ask staff for more coins
    Request {
        #[arg(long, default_value = "1000")]
        amount: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Show your requests
    List,
    /// Request the bankruptcy top-up
    Recover,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List requests waiting for review
    Pending,
    /// Approve a request
    Approve { id: u64 },
    /// Deny a request
    Deny { id: u64 },
}

impl Commands {
    /// Whether the command needs a signed-in profile
    pub fn requires_login(&self) -> bool {
        !matches!(
            self,
            Commands::Register { .. } | Commands::Login { .. } | Commands::Logout | Commands::Learn
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Profile => "profile",
            Commands::History { .. } => "history",
            Commands::Learn => "learn",
            Commands::Roulette { .. } => "roulette",
            Commands::Dice { .. } => "dice",
            Commands::Blackjack { .. } => "blackjack",
            Commands::Poker { .. } => "poker",
            Commands::Mines { .. } => "mines",
            Commands::Coins(_) => "coins",
            Commands::Admin(_) => "admin",
        }
    }
}

/// Parse a roulette bet from the command line
pub fn parse_roulette_bet(bet_type: &str, bet_value: &str) -> Result<RouletteBet, String> {
    let bet_type = normalize_bet_type(bet_type);
    RouletteBet::parse(&bet_type, bet_value).map_err(|e| {
        format!(
            "{}. Use 'wagerline roulette --help' to see available bets.",
            e.user_message()
        )
    })
}

/// Parse a dice bet from the command line
pub fn parse_dice_bet(bet_type: &str, bet_value: &str) -> Result<DiceBet, String> {
    let bet_type = normalize_bet_type(bet_type);
    DiceBet::parse(&bet_type, bet_value).map_err(|e| {
        format!(
            "{}. Use 'wagerline dice --help' to see available bets.",
            e.user_message()
        )
    })
}

/// Accept `odd-even`, `oddeven` and `ODD_EVEN` alike
fn normalize_bet_type(bet_type: &str) -> String {
    match bet_type.to_lowercase().replace('-', "_").as_str() {
        "oddeven" | "parity" => "odd_even".to_string(),
        "highlow" => "high_low".to_string(),
        "colour" => "color".to_string(),
        "lucky7" | "lucky_7" | "7" => "seven".to_string(),
        other => other.to_string(),
    }
}

/// Parse `0,2,4` into hold positions
pub fn parse_hold_indices(input: &str) -> Result<Vec<usize>, String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| format!("Invalid card position: '{}'", part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagerline::gaming::roulette::PocketColor;

    #[test]
    fn test_roulette_bet_parsing() {
        assert!(matches!(
            parse_roulette_bet("color", "red"),
            Ok(RouletteBet::Color(PocketColor::Red))
        ));
        assert!(matches!(
            parse_roulette_bet("Odd-Even", "odd"),
            Ok(RouletteBet::OddEven(_))
        ));
        assert!(matches!(parse_roulette_bet("number", "36"), Ok(RouletteBet::Number(36))));
        assert!(parse_roulette_bet("number", "37").is_err());
        assert!(parse_roulette_bet("corner", "1").is_err());
    }

    #[test]
    fn test_dice_bet_parsing() {
        assert!(matches!(parse_dice_bet("lucky7", ""), Ok(DiceBet::Seven)));
        assert!(matches!(parse_dice_bet("over", "8"), Ok(DiceBet::Over(8))));
        assert!(parse_dice_bet("under", "10").is_err());
    }

    #[test]
    fn test_hold_index_parsing() {
        assert_eq!(parse_hold_indices("0,2 4").unwrap(), vec![0, 2, 4]);
        assert!(parse_hold_indices("").unwrap().is_empty());
        assert!(parse_hold_indices("a").is_err());
    }

    #[test]
    fn test_command_classification() {
        assert!(!Commands::Logout.requires_login());
        assert!(!Commands::Learn.requires_login());
        assert!(Commands::Profile.requires_login());
        assert_eq!(Commands::Coins(CoinCommands::List).name(), "coins");
    }
}
