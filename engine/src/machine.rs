//! # Milestone state machine
//!
//! The single authority over milestone status. Every transition runs as one
//! SQLite transaction covering the guard checks, the versioned status write
//! and the wallet effect, so a crash or a lost race can never leave a status
//! change without its balance change (or the reverse) visible.
//!
//! | From | Action | Caller | To | Wallet effect |
//! |------|--------|--------|----|---------------|
//! | `Pending` | fund | client | `Funded` | debit client `amount` |
//! | `Funded` | submit | freelancer | `Submitted` | — |
//! | `Submitted` | request_revision | client | `Funded` | — |
//! | `Submitted` | release | client | `Released` | credit freelancer `net`, platform `fee` |
//! | `Funded`/`Submitted` | refund (contract cancellation) | client | `Refunded` | credit client `amount` |
//!
//! Anything else is [`EngineError::InvalidTransition`] — including re-applying
//! an already-applied action, which is what makes a retried request a
//! harmless error instead of a double payment.

use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use tracing::info;

use crate::db;
use crate::errors::{EngineError, Result};
use crate::ledger;
use crate::money::{self, Settlement};
use crate::registry;
use crate::types::{Contract, Milestone, MilestoneStatus, Party};

/// Actions a caller can take against one milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Fund,
    Submit,
    RequestRevision,
    Release,
    /// Applied per-milestone by whole-contract cancellation only.
    Refund,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fund => "fund",
            Self::Submit => "submit",
            Self::RequestRevision => "request_revision",
            Self::Release => "release",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table. The only place in the crate that decides which
/// status follows which.
pub fn next_status(from: MilestoneStatus, action: Action) -> Result<MilestoneStatus> {
    use MilestoneStatus::*;
    match (from, action) {
        (Pending, Action::Fund) => Ok(Funded),
        (Funded, Action::Submit) => Ok(Submitted),
        (Submitted, Action::RequestRevision) => Ok(Funded),
        (Submitted, Action::Release) => Ok(Released),
        (Funded | Submitted, Action::Refund) => Ok(Refunded),
        _ => Err(EngineError::InvalidTransition { from, action }),
    }
}

/// Which side of the contract may perform an action.
pub fn acting_party(action: Action) -> Party {
    match action {
        Action::Submit => Party::Freelancer,
        Action::Fund | Action::RequestRevision | Action::Release | Action::Refund => Party::Client,
    }
}

pub(crate) fn authorize(contract: &Contract, caller: &str, action: Action) -> Result<()> {
    let expected = match acting_party(action) {
        Party::Client => contract.client.as_str(),
        Party::Freelancer => contract.freelancer.as_str(),
        Party::Platform => return Err(EngineError::NotAuthorized),
    };
    if caller != expected {
        return Err(EngineError::NotAuthorized);
    }
    Ok(())
}

pub(crate) fn ensure_open(contract: &Contract) -> Result<()> {
    if contract.status.is_closed() {
        return Err(EngineError::ContractClosed {
            status: contract.status,
        });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Transition executors
// ─────────────────────────────────────────────────────────

/// Move `amount` from the client's wallet into escrow: `Pending → Funded`.
pub async fn fund_milestone(
    pool: &SqlitePool,
    contract_id: i64,
    milestone_id: i64,
    caller: &str,
) -> Result<Milestone> {
    let mut tx = pool.begin().await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    authorize(&contract, caller, Action::Fund)?;

    let milestone = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    let next = next_status(milestone.status, Action::Fund)?;
    ensure_open(&contract)?;
    db::compare_and_set_status(&mut tx, &milestone, next).await?;
    ledger::debit(&mut tx, &contract.client, Party::Client, milestone.amount).await?;
    registry::refresh_contract_status(&mut tx, contract_id).await?;

    let updated = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    tx.commit().await?;

    info!(
        "milestone {milestone_id} of contract {contract_id} funded with {}",
        updated.amount
    );
    Ok(updated)
}

/// Record a delivery: `Funded → Submitted`.
pub async fn submit_work(
    pool: &SqlitePool,
    contract_id: i64,
    milestone_id: i64,
    caller: &str,
    note: &str,
    delivery_ref: &str,
) -> Result<Milestone> {
    let mut tx = pool.begin().await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    authorize(&contract, caller, Action::Submit)?;

    let milestone = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    let next = next_status(milestone.status, Action::Submit)?;
    ensure_open(&contract)?;
    db::compare_and_set_status(&mut tx, &milestone, next).await?;
    db::insert_submission(&mut tx, milestone_id, note, delivery_ref).await?;
    registry::refresh_contract_status(&mut tx, contract_id).await?;

    let updated = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    tx.commit().await?;

    info!("milestone {milestone_id} of contract {contract_id} submitted");
    Ok(updated)
}

/// Send the work back for another iteration: `Submitted → Funded`.
///
/// The feedback is appended to the milestone's permanent revision trail;
/// the previous submission stays in history but is no longer current.
pub async fn request_revision(
    pool: &SqlitePool,
    contract_id: i64,
    milestone_id: i64,
    caller: &str,
    feedback: &str,
) -> Result<Milestone> {
    let mut tx = pool.begin().await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    authorize(&contract, caller, Action::RequestRevision)?;

    let milestone = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    let next = next_status(milestone.status, Action::RequestRevision)?;
    ensure_open(&contract)?;
    db::compare_and_set_status(&mut tx, &milestone, next).await?;
    db::insert_revision(&mut tx, milestone_id, feedback).await?;
    registry::refresh_contract_status(&mut tx, contract_id).await?;

    let updated = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    tx.commit().await?;

    info!("milestone {milestone_id} of contract {contract_id} sent back for revision");
    Ok(updated)
}

/// A released milestone together with its fee split.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    pub milestone: Milestone,
    pub settlement: Settlement,
}

/// Settle the escrow hold: `Submitted → Released`.
///
/// The hold splits into `net` for the freelancer and `fee` for the platform;
/// both credits land in the same transaction as the status write.
pub async fn release_escrow(
    pool: &SqlitePool,
    contract_id: i64,
    milestone_id: i64,
    caller: &str,
    fee_bps: u32,
) -> Result<ReleaseOutcome> {
    let mut tx = pool.begin().await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    authorize(&contract, caller, Action::Release)?;

    let milestone = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    let next = next_status(milestone.status, Action::Release)?;
    ensure_open(&contract)?;
    db::compare_and_set_status(&mut tx, &milestone, next).await?;

    let settlement = money::settle(milestone.amount, fee_bps);
    if settlement.net > 0 {
        ledger::credit(
            &mut tx,
            &contract.freelancer,
            Party::Freelancer,
            settlement.net,
        )
        .await?;
    }
    if settlement.fee > 0 {
        ledger::credit(
            &mut tx,
            ledger::PLATFORM_OWNER,
            Party::Platform,
            settlement.fee,
        )
        .await?;
    }
    db::record_settlement(&mut tx, milestone_id, settlement.net, settlement.fee).await?;
    registry::refresh_contract_status(&mut tx, contract_id).await?;

    let updated = db::load_milestone(&mut tx, contract_id, milestone_id).await?;
    tx.commit().await?;

    info!(
        "milestone {milestone_id} of contract {contract_id} released: net {} fee {}",
        settlement.net, settlement.fee
    );
    Ok(ReleaseOutcome {
        milestone: updated,
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MilestoneStatus::*;

    const ALL_STATUSES: [MilestoneStatus; 5] = [Pending, Funded, Submitted, Released, Refunded];
    const ALL_ACTIONS: [Action; 5] = [
        Action::Fund,
        Action::Submit,
        Action::RequestRevision,
        Action::Release,
        Action::Refund,
    ];

    #[test]
    fn transition_table_is_exactly_the_allowed_set() {
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let expected = match (from, action) {
                    (Pending, Action::Fund) => Some(Funded),
                    (Funded, Action::Submit) => Some(Submitted),
                    (Submitted, Action::RequestRevision) => Some(Funded),
                    (Submitted, Action::Release) => Some(Released),
                    (Funded, Action::Refund) | (Submitted, Action::Refund) => Some(Refunded),
                    _ => None,
                };
                match (next_status(from, action), expected) {
                    (Ok(got), Some(want)) => assert_eq!(got, want),
                    (Err(EngineError::InvalidTransition { from: f, action: a }), None) => {
                        assert_eq!(f, from);
                        assert_eq!(a, action);
                    }
                    (got, want) => {
                        panic!("{from:?} + {action:?}: got {got:?}, expected {want:?}")
                    }
                }
            }
        }
    }

    #[test]
    fn terminal_statuses_permit_nothing() {
        for from in [Released, Refunded] {
            for action in ALL_ACTIONS {
                assert!(next_status(from, action).is_err());
            }
        }
    }

    #[test]
    fn only_the_freelancer_submits() {
        for action in ALL_ACTIONS {
            let party = acting_party(action);
            if action == Action::Submit {
                assert_eq!(party, Party::Freelancer);
            } else {
                assert_eq!(party, Party::Client);
            }
        }
    }
}
