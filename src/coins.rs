//! Coin request workflow
//!
//! A player asks for coins; staff approve or deny. Each request moves
//! `pending -> approved | denied` once. At most one request per player may be
//! pending, and the desk refuses a second one before it reaches the wire when
//! its last view of the player's requests already holds a pending one.

use crate::account::AccountState;
use crate::error::{Error, Result};
use crate::models::{CoinRequest, CoinRequestStatus};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub const MIN_REQUEST_AMOUNT: i64 = 100;
pub const MAX_REQUEST_AMOUNT: i64 = 10_000;
pub const DEFAULT_REQUEST_AMOUNT: i64 = 1_000;
pub const REQUEST_PRESETS: [i64; 3] = [500, 1_000, 2_000];
pub const MAX_REASON_CHARS: usize = 200;

/// Canned request offered to a bankrupt player
pub const RECOVERY_AMOUNT: i64 = 1_000;
pub const RECOVERY_REASON: &str = "I lost all my coins and want to try again.";

pub fn validate_request(amount: i64, reason: &str) -> Result<()> {
    if !(MIN_REQUEST_AMOUNT..=MAX_REQUEST_AMOUNT).contains(&amount) {
        return Err(Error::Validation(format!(
            "Amount must be between {} and {} coins",
            MIN_REQUEST_AMOUNT, MAX_REQUEST_AMOUNT
        )));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(Error::Validation(format!(
            "Reason must be at most {} characters",
            MAX_REASON_CHARS
        )));
    }
    Ok(())
}

/// Requests fetched under one session epoch
#[derive(Debug, Default)]
struct OwnRequests {
    epoch: u64,
    requests: Option<Vec<CoinRequest>>,
    reported: HashSet<u64>,
}

#[derive(Debug, Default)]
struct ReviewQueue {
    epoch: u64,
    requests: Vec<CoinRequest>,
}

/// Client side of the coin request workflow.
///
/// Cached lists belong to the session they were fetched in; after a logout,
/// login or session expiry they read as empty until fetched again.
#[derive(Debug)]
pub struct CoinRequestDesk {
    account: Arc<AccountState>,
    own: Mutex<OwnRequests>,
    review_queue: Mutex<ReviewQueue>,
}

impl CoinRequestDesk {
    pub fn new(account: Arc<AccountState>) -> Self {
        let epoch = account.session_epoch().current();
        Self {
            account,
            own: Mutex::new(OwnRequests {
                epoch,
                ..OwnRequests::default()
            }),
            review_queue: Mutex::new(ReviewQueue {
                epoch,
                ..ReviewQueue::default()
            }),
        }
    }

    fn own(&self) -> MutexGuard<'_, OwnRequests> {
        let epoch = self.account.session_epoch().current();
        let mut own = self.own.lock();
        if own.epoch != epoch {
            debug!(from = own.epoch, to = epoch, "Session changed, dropping cached coin requests");
            *own = OwnRequests {
                epoch,
                ..OwnRequests::default()
            };
        }
        own
    }

    fn queue(&self) -> MutexGuard<'_, ReviewQueue> {
        let epoch = self.account.session_epoch().current();
        let mut queue = self.review_queue.lock();
        if queue.epoch != epoch {
            *queue = ReviewQueue {
                epoch,
                ..ReviewQueue::default()
            };
        }
        queue
    }

    /// Last fetched list of the player's own requests
    pub fn my_requests(&self) -> Option<Vec<CoinRequest>> {
        self.own().requests.clone()
    }

    pub fn has_pending(&self) -> bool {
        self.own()
            .requests
            .as_ref()
            .map(|requests| requests.iter().any(CoinRequest::is_pending))
            .unwrap_or(false)
    }

    pub async fn submit(&self, amount: i64, reason: &str) -> Result<CoinRequest> {
        validate_request(amount, reason)?;
        if self.has_pending() {
            return Err(Error::Rejected(
                "You already have a pending coin request".to_string(),
            ));
        }

        let request = self.account.api().request_coins(amount, reason).await?;
        info!(id = request.id, amount, "Coin request submitted");

        self.own()
            .requests
            .get_or_insert_with(Vec::new)
            .insert(0, request.clone());
        Ok(request)
    }

    /// Ask for the canned bankruptcy top-up
    pub async fn request_recovery(&self) -> Result<CoinRequest> {
        self.submit(RECOVERY_AMOUNT, RECOVERY_REASON).await
    }

    /// Re-fetch own requests; returns approvals the loaded profile does not
    /// reflect yet. Those are requests seen pending by an earlier sync, or
    /// reviewed after the profile was last loaded. Each is reported once.
    /// Callers refresh the account when the result is non-empty.
    pub async fn sync(&self) -> Result<Vec<CoinRequest>> {
        let epoch = self.account.session_epoch().current();
        let latest = self.account.api().my_coin_requests().await?;
        let loaded_at = self.account.profile_loaded_at();

        let mut own = self.own();
        if own.epoch != epoch {
            debug!("Session changed during sync, listing discarded");
            return Ok(Vec::new());
        }
        let previously_pending: HashSet<u64> = own
            .requests
            .as_ref()
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.is_pending())
                    .map(|r| r.id)
                    .collect()
            })
            .unwrap_or_default();

        let approved: Vec<CoinRequest> = latest
            .iter()
            .filter(|r| r.status == CoinRequestStatus::Approved && !own.reported.contains(&r.id))
            .filter(|r| {
                let reviewed_since_load = matches!(
                    (r.reviewed_at, loaded_at),
                    (Some(reviewed), Some(loaded)) if reviewed > loaded
                );
                previously_pending.contains(&r.id) || reviewed_since_load
            })
            .cloned()
            .collect();

        debug!(
            total = latest.len(),
            newly_approved = approved.len(),
            "Coin requests synced"
        );
        own.reported.extend(approved.iter().map(|r| r.id));
        own.requests = Some(latest);
        Ok(approved)
    }

    // Staff

    /// Last fetched review queue
    pub fn review_queue(&self) -> Vec<CoinRequest> {
        self.queue().requests.clone()
    }

    pub async fn load_pending(&self) -> Result<Vec<CoinRequest>> {
        self.require_staff()?;
        let pending = self.account.api().pending_coin_requests().await?;
        self.queue().requests = pending.clone();
        Ok(pending)
    }

    pub async fn approve(&self, id: u64) -> Result<CoinRequest> {
        self.require_staff()?;
        let processed = self.account.api().approve_coin_request(id).await?;
        info!(id, amount = processed.amount, "Coin request approved");
        self.drop_from_queue(id);
        Ok(processed)
    }

    pub async fn deny(&self, id: u64) -> Result<CoinRequest> {
        self.require_staff()?;
        let processed = self.account.api().deny_coin_request(id).await?;
        info!(id, "Coin request denied");
        self.drop_from_queue(id);
        Ok(processed)
    }

    fn require_staff(&self) -> Result<()> {
        if self.account.is_staff() {
            Ok(())
        } else {
            Err(Error::Rejected("Staff access required".to_string()))
        }
    }

    fn drop_from_queue(&self, id: u64) {
        self.queue().requests.retain(|r| r.id != id);
    }
}
