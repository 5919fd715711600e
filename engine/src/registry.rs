//! Contract registry — creation, reads, and the derived contract status.
//!
//! A contract exclusively owns its milestones: they are created with it,
//! scoped to it in every query, and never reassigned. The contract-level
//! status is a pure function of the milestone statuses, recomputed inside
//! the same transaction as every milestone transition; `Cancelled` is set
//! explicitly by [`crate::cancel`] and is sticky.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::db;
use crate::errors::{EngineError, Result};
use crate::types::{
    Contract, ContractDetail, ContractStatus, Milestone, MilestoneDetail, MilestoneSpec,
    MilestoneStatus,
};

/// Derive the contract status from its milestone statuses.
///
/// `Completed` iff every milestone is released (and there is at least one);
/// `Active` iff any milestone has ever been funded; `Pending` otherwise.
/// Cancellation is not derived — it is written once and never recomputed.
pub fn derive_status(milestones: &[MilestoneStatus]) -> ContractStatus {
    use MilestoneStatus::*;
    if !milestones.is_empty() && milestones.iter().all(|s| *s == Released) {
        ContractStatus::Completed
    } else if milestones
        .iter()
        .any(|s| matches!(s, Funded | Submitted | Released))
    {
        ContractStatus::Active
    } else {
        ContractStatus::Pending
    }
}

pub(crate) async fn refresh_contract_status(
    conn: &mut SqliteConnection,
    contract_id: i64,
) -> Result<ContractStatus> {
    let statuses: Vec<MilestoneStatus> =
        sqlx::query_scalar("SELECT status FROM milestones WHERE contract_id = ?1")
            .bind(contract_id)
            .fetch_all(&mut *conn)
            .await?;

    let next = derive_status(&statuses);
    sqlx::query("UPDATE contracts SET status = ?1 WHERE id = ?2 AND status != ?3")
        .bind(next)
        .bind(contract_id)
        .bind(ContractStatus::Cancelled)
        .execute(&mut *conn)
        .await?;
    Ok(next)
}

/// Create a contract and its milestones, all `Pending`.
///
/// The milestone amounts may allocate less than the full budget, but never
/// more. Nothing is persisted when validation fails.
pub async fn create_contract(
    pool: &SqlitePool,
    title: &str,
    client: &str,
    freelancer: &str,
    total_budget: i64,
    milestones: &[MilestoneSpec],
) -> Result<ContractDetail> {
    if total_budget <= 0 {
        return Err(EngineError::InvalidAmount(total_budget));
    }
    let mut allocated: i128 = 0;
    for spec in milestones {
        if spec.amount <= 0 {
            return Err(EngineError::InvalidAmount(spec.amount));
        }
        allocated += i128::from(spec.amount);
    }
    if allocated > i128::from(total_budget) {
        return Err(EngineError::BudgetExceeded {
            allocated: i64::try_from(allocated).unwrap_or(i64::MAX),
            budget: total_budget,
        });
    }

    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let contract_id = sqlx::query(
        r#"
        INSERT INTO contracts (title, client, freelancer, total_budget, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(title)
    .bind(client)
    .bind(freelancer)
    .bind(total_budget)
    .bind(ContractStatus::Pending)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for spec in milestones {
        sqlx::query(
            r#"
            INSERT INTO milestones (contract_id, description, amount, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(contract_id)
        .bind(&spec.description)
        .bind(spec.amount)
        .bind(MilestoneStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    let contract = db::load_contract(&mut tx, contract_id).await?;
    let detail = assemble_detail(&mut tx, contract).await?;
    tx.commit().await?;

    info!(
        "contract {contract_id} created with {} milestones, budget {total_budget}",
        milestones.len()
    );
    Ok(detail)
}

/// Single contract with nested milestones, submissions, and revision trail.
pub async fn get_contract(pool: &SqlitePool, contract_id: i64) -> Result<ContractDetail> {
    let mut conn = pool.acquire().await?;
    let contract = db::load_contract(&mut conn, contract_id).await?;
    assemble_detail(&mut conn, contract).await
}

/// Contracts filtered by client and/or freelancer id, with nested milestones.
pub async fn list_contracts(
    pool: &SqlitePool,
    client: Option<&str>,
    freelancer: Option<&str>,
) -> Result<Vec<ContractDetail>> {
    let mut conn = pool.acquire().await?;

    const COLUMNS: &str = "id, title, client, freelancer, total_budget, status, created_at";
    let contracts: Vec<Contract> = match (client, freelancer) {
        (Some(c), Some(f)) => {
            sqlx::query_as(&format!(
                "SELECT {COLUMNS} FROM contracts WHERE client = ?1 AND freelancer = ?2 ORDER BY id ASC"
            ))
            .bind(c)
            .bind(f)
            .fetch_all(&mut *conn)
            .await?
        }
        (Some(c), None) => {
            sqlx::query_as(&format!(
                "SELECT {COLUMNS} FROM contracts WHERE client = ?1 ORDER BY id ASC"
            ))
            .bind(c)
            .fetch_all(&mut *conn)
            .await?
        }
        (None, Some(f)) => {
            sqlx::query_as(&format!(
                "SELECT {COLUMNS} FROM contracts WHERE freelancer = ?1 ORDER BY id ASC"
            ))
            .bind(f)
            .fetch_all(&mut *conn)
            .await?
        }
        (None, None) => {
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM contracts ORDER BY id ASC"))
                .fetch_all(&mut *conn)
                .await?
        }
    };

    let mut details = Vec::with_capacity(contracts.len());
    for contract in contracts {
        details.push(assemble_detail(&mut conn, contract).await?);
    }
    Ok(details)
}

pub(crate) async fn assemble_detail(
    conn: &mut SqliteConnection,
    contract: Contract,
) -> Result<ContractDetail> {
    let milestones = db::milestones_for_contract(&mut *conn, contract.id).await?;
    let mut nested = Vec::with_capacity(milestones.len());
    for milestone in milestones {
        nested.push(milestone_detail(&mut *conn, milestone).await?);
    }
    Ok(ContractDetail {
        contract,
        milestones: nested,
    })
}

async fn milestone_detail(
    conn: &mut SqliteConnection,
    milestone: Milestone,
) -> Result<MilestoneDetail> {
    // The latest submission row is only *current* while the milestone sits
    // in Submitted; after a revision request it is history, not state.
    let submission = if milestone.status == MilestoneStatus::Submitted {
        db::latest_submission(&mut *conn, milestone.id).await?
    } else {
        None
    };
    let revisions = db::revisions_for_milestone(&mut *conn, milestone.id).await?;
    Ok(MilestoneDetail {
        milestone,
        submission,
        revisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MilestoneStatus::*;

    #[test]
    fn empty_contract_is_pending() {
        assert_eq!(derive_status(&[]), ContractStatus::Pending);
    }

    #[test]
    fn unfunded_milestones_keep_the_contract_pending() {
        assert_eq!(derive_status(&[Pending, Pending]), ContractStatus::Pending);
    }

    #[test]
    fn any_funded_milestone_makes_it_active() {
        assert_eq!(derive_status(&[Pending, Funded]), ContractStatus::Active);
        assert_eq!(derive_status(&[Submitted]), ContractStatus::Active);
        assert_eq!(derive_status(&[Released, Pending]), ContractStatus::Active);
    }

    #[test]
    fn completed_requires_every_milestone_released() {
        assert_eq!(
            derive_status(&[Released, Released]),
            ContractStatus::Completed
        );
        assert_eq!(
            derive_status(&[Released, Submitted]),
            ContractStatus::Active
        );
    }

    #[test]
    fn refunded_milestones_do_not_complete_a_contract() {
        assert_eq!(
            derive_status(&[Released, Refunded]),
            ContractStatus::Active
        );
        assert_eq!(derive_status(&[Refunded]), ContractStatus::Pending);
    }
}
