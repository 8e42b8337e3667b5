//! Minesweeper round protocol
//!
//! `create` charges the bet and opens a board. Each safe `reveal` raises the
//! multiplier; a mine ends the round. `cashout` settles at the current
//! multiplier. Mine positions are only readable once the round is over.

use super::preview::{self, AdvisoryPayout};
use super::{RoundRelay, RoundState, Settlement};
use crate::account::AccountState;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MIN_GRID_SIZE: u8 = 3;
pub const MAX_GRID_SIZE: u8 = 7;
pub const MAX_MINES: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinesweeperAction {
    Create,
    Reveal,
    Cashout,
}

#[derive(Debug, Serialize)]
pub struct MinesweeperRequest<'a> {
    pub action: MinesweeperAction,
    pub bet: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_mines: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<&'a RawValue>,
}

/// Board disclosure on a finished round
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MinesweeperReveal {
    #[serde(default)]
    pub mine_positions: Vec<usize>,
    pub hit_mine: Option<usize>,
    #[serde(default, deserialize_with = "crate::models::amount")]
    pub payout: i64,
    pub coins: i64,
    pub is_bankrupt: bool,
}

impl MinesweeperReveal {
    pub fn settlement(&self) -> Settlement {
        Settlement {
            payout: self.payout,
            coins: self.coins,
            is_bankrupt: self.is_bankrupt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MinesweeperStatus {
    Playing,
    Win(MinesweeperReveal),
    Lose(MinesweeperReveal),
    Cashout(MinesweeperReveal),
}

impl MinesweeperStatus {
    pub fn reveal(&self) -> Option<&MinesweeperReveal> {
        match self {
            MinesweeperStatus::Playing => None,
            MinesweeperStatus::Win(r) | MinesweeperStatus::Lose(r) | MinesweeperStatus::Cashout(r) => {
                Some(r)
            }
        }
    }

    pub fn settlement(&self) -> Option<Settlement> {
        self.reveal().map(MinesweeperReveal::settlement)
    }
}

/// Board as returned after each action
#[derive(Debug, Clone, Deserialize)]
pub struct MinesweeperBoard {
    #[serde(flatten)]
    pub status: MinesweeperStatus,
    pub grid_size: u8,
    pub num_mines: u8,
    pub total_tiles: usize,
    #[serde(default)]
    pub revealed: Vec<usize>,
    pub multiplier: f64,
    #[serde(default)]
    pub message: String,
}

/// Typed reading of a `playing` board; mine positions deliberately absent
#[derive(Debug, Clone, Deserialize)]
pub struct MinesweeperRound {
    pub grid_size: u8,
    pub num_mines: u8,
    pub total_tiles: usize,
    #[serde(default)]
    pub revealed: Vec<usize>,
    pub multiplier: f64,
}

impl MinesweeperRound {
    pub fn safe_tiles_left(&self) -> usize {
        self.total_tiles
            .saturating_sub(usize::from(self.num_mines))
            .saturating_sub(self.revealed.len())
    }
}

/// Check board dimensions before a round is opened
pub fn validate_board(grid_size: u8, num_mines: u8) -> Result<()> {
    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
        return Err(Error::Validation(format!(
            "Grid size must be between {} and {}",
            MIN_GRID_SIZE, MAX_GRID_SIZE
        )));
    }

    let tiles = u16::from(grid_size) * u16::from(grid_size);
    let max_mines = (tiles - 1).min(u16::from(MAX_MINES));
    if num_mines < 1 || u16::from(num_mines) > max_mines {
        return Err(Error::Validation(format!(
            "Mines must be between 1 and {} on a {}x{} grid",
            max_mines, grid_size, grid_size
        )));
    }

    Ok(())
}

/// A single minesweeper board
#[derive(Debug)]
pub struct MinesweeperField {
    account: Arc<AccountState>,
    relay: RoundRelay<MinesweeperRound>,
}

impl MinesweeperField {
    pub fn new(account: Arc<AccountState>) -> Self {
        let relay = RoundRelay::new("minesweeper", account.session_epoch().clone());
        Self { account, relay }
    }

    pub fn in_round(&self) -> bool {
        self.relay.is_active()
    }

    pub fn round(&self) -> Option<&RoundState<MinesweeperRound>> {
        self.relay.current().map(|r| &r.state)
    }

    /// Advisory profit if the board were cashed out now
    pub fn potential_win(&self) -> Option<AdvisoryPayout> {
        self.relay
            .current()
            .map(|r| preview::minesweeper_potential_win(r.bet, r.state.view().multiplier))
    }

    /// Advisory total a cashout would credit
    pub fn cashout_value(&self) -> Option<AdvisoryPayout> {
        self.relay
            .current()
            .map(|r| preview::minesweeper_cashout_value(r.bet, r.state.view().multiplier))
    }

    pub async fn create(&mut self, bet: i64, grid_size: u8, num_mines: u8) -> Result<MinesweeperBoard> {
        self.relay.ensure_idle()?;
        validate_board(grid_size, num_mines)?;
        self.account.check_wager(bet)?;

        let request = MinesweeperRequest {
            action: MinesweeperAction::Create,
            bet,
            grid_size: Some(grid_size),
            num_mines: Some(num_mines),
            tile_index: None,
            game_state: None,
        };
        let result = self.account.api().minesweeper(&request).await;
        let body = self.relay.observe(result)?;
        self.record(&body, bet)
    }

    pub async fn reveal(&mut self, tile_index: usize) -> Result<MinesweeperBoard> {
        let (bet, previous, result) = {
            let round = self.relay.active()?;
            let view = round.state.view();
            if tile_index >= view.total_tiles {
                return Err(Error::Validation(format!(
                    "Tile {} is outside the {}x{} grid",
                    tile_index, view.grid_size, view.grid_size
                )));
            }
            if view.revealed.contains(&tile_index) {
                return Err(Error::Rejected(format!("Tile {} is already revealed", tile_index)));
            }

            debug!(round = %round.id, tile_index, "Minesweeper reveal");
            let request = MinesweeperRequest {
                action: MinesweeperAction::Reveal,
                bet: round.bet,
                grid_size: None,
                num_mines: None,
                tile_index: Some(tile_index),
                game_state: Some(round.state.raw()),
            };
            let result = self.account.api().minesweeper(&request).await;
            (round.bet, view.multiplier, result)
        };

        let body = self.relay.observe(result)?;
        let board = self.record(&body, bet)?;
        if board.status == MinesweeperStatus::Playing && board.multiplier < previous {
            warn!(
                previous,
                current = board.multiplier,
                "Multiplier went down on a safe reveal"
            );
        }
        Ok(board)
    }

    pub async fn cashout(&mut self) -> Result<MinesweeperBoard> {
        let (bet, result) = {
            let round = self.relay.active()?;
            debug!(round = %round.id, "Minesweeper cashout");
            let request = MinesweeperRequest {
                action: MinesweeperAction::Cashout,
                bet: round.bet,
                grid_size: None,
                num_mines: None,
                tile_index: None,
                game_state: Some(round.state.raw()),
            };
            (round.bet, self.account.api().minesweeper(&request).await)
        };

        let body = self.relay.observe(result)?;
        self.record(&body, bet)
    }

    fn record(&mut self, body: &str, bet: i64) -> Result<MinesweeperBoard> {
        let board: MinesweeperBoard = serde_json::from_str(body)?;
        let settlement = board.status.settlement();
        self.relay
            .record(body, settlement.as_ref(), bet, &self.account)?;
        Ok(board)
    }
}
