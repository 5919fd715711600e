//! Whole-contract cancellation with partial refunds.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::errors::Result;
use crate::ledger;
use crate::machine::{self, Action};
use crate::types::{Contract, ContractStatus, Milestone, Party};

/// Result of a cancellation: the closed contract and every milestone whose
/// escrow hold was returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub contract: Contract,
    pub refunded: Vec<Milestone>,
    pub refund_total: i64,
}

/// Cancel a contract and settle all outstanding milestones, atomically.
///
/// Every `Funded`/`Submitted` milestone moves to `Refunded` and its full
/// amount is credited back to the client — no fee is charged on a refund.
/// `Pending` milestones become void with no wallet effect; terminal ones are
/// untouched. One transaction covers all of it: a failure on any milestone
/// rolls back the entire cancellation.
pub async fn cancel_contract(
    pool: &SqlitePool,
    contract_id: i64,
    caller: &str,
) -> Result<CancellationOutcome> {
    let mut tx = pool.begin().await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    machine::authorize(&contract, caller, Action::Refund)?;
    machine::ensure_open(&contract)?;

    let milestones = db::milestones_for_contract(&mut tx, contract_id).await?;
    let mut refunded_ids = Vec::new();
    let mut refund_total: i64 = 0;

    for milestone in &milestones {
        if !milestone.status.holds_funds() {
            continue;
        }
        let next = machine::next_status(milestone.status, Action::Refund)?;
        db::compare_and_set_status(&mut tx, milestone, next).await?;
        db::record_refund(&mut tx, milestone.id, milestone.amount).await?;
        ledger::credit(&mut tx, &contract.client, Party::Client, milestone.amount).await?;
        refunded_ids.push(milestone.id);
        refund_total += milestone.amount;
    }

    sqlx::query("UPDATE contracts SET status = ?1 WHERE id = ?2")
        .bind(ContractStatus::Cancelled)
        .bind(contract_id)
        .execute(&mut *tx)
        .await?;

    let contract = db::load_contract(&mut tx, contract_id).await?;
    let mut refunded = Vec::with_capacity(refunded_ids.len());
    for id in refunded_ids {
        refunded.push(db::load_milestone(&mut tx, contract_id, id).await?);
    }
    tx.commit().await?;

    info!(
        "contract {contract_id} cancelled: {} milestones refunded, {refund_total} returned to client",
        refunded.len()
    );
    Ok(CancellationOutcome {
        contract,
        refunded,
        refund_total,
    })
}
