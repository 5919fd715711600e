//! Database layer — pool setup, migrations, and row-level queries.
//!
//! Business rules never live here: the state machine decides *whether* a
//! write may happen, this module only performs it. The one piece of
//! concurrency mechanism that does live here is
//! [`compare_and_set_status`], the versioned status write every transition
//! goes through.

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::{EngineError, Result};
use crate::types::{Contract, Milestone, MilestoneStatus, RevisionRequest, Submission};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Contract and milestone reads
// ─────────────────────────────────────────────────────────

pub(crate) async fn load_contract(conn: &mut SqliteConnection, id: i64) -> Result<Contract> {
    sqlx::query_as::<_, Contract>(
        r#"
        SELECT id, title, client, freelancer, total_budget, status, created_at
        FROM   contracts
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EngineError::NotFound("contract"))
}

/// Load a milestone, scoped to its owning contract — a milestone id from a
/// different contract is indistinguishable from a missing one.
pub(crate) async fn load_milestone(
    conn: &mut SqliteConnection,
    contract_id: i64,
    milestone_id: i64,
) -> Result<Milestone> {
    sqlx::query_as::<_, Milestone>(
        r#"
        SELECT id, contract_id, description, amount, status, version,
               released_net, released_fee, refunded_amount, created_at
        FROM   milestones
        WHERE  id = ?1 AND contract_id = ?2
        "#,
    )
    .bind(milestone_id)
    .bind(contract_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EngineError::NotFound("milestone"))
}

pub(crate) async fn milestones_for_contract(
    conn: &mut SqliteConnection,
    contract_id: i64,
) -> Result<Vec<Milestone>> {
    let rows = sqlx::query_as::<_, Milestone>(
        r#"
        SELECT id, contract_id, description, amount, status, version,
               released_net, released_fee, refunded_amount, created_at
        FROM   milestones
        WHERE  contract_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(contract_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Status writes
// ─────────────────────────────────────────────────────────

/// Write a milestone's new status, guarded by the version counter read with
/// the snapshot. A concurrent transition on the same milestone will have
/// bumped the counter, the update matches zero rows, and the caller's whole
/// transaction rolls back with [`EngineError::ConcurrencyConflict`].
pub(crate) async fn compare_and_set_status(
    conn: &mut SqliteConnection,
    milestone: &Milestone,
    next: MilestoneStatus,
) -> Result<()> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE milestones
        SET    status = ?1, version = version + 1
        WHERE  id = ?2 AND version = ?3
        "#,
    )
    .bind(next)
    .bind(milestone.id)
    .bind(milestone.version)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(EngineError::ConcurrencyConflict);
    }
    Ok(())
}

pub(crate) async fn record_settlement(
    conn: &mut SqliteConnection,
    milestone_id: i64,
    net: i64,
    fee: i64,
) -> Result<()> {
    sqlx::query("UPDATE milestones SET released_net = ?1, released_fee = ?2 WHERE id = ?3")
        .bind(net)
        .bind(fee)
        .bind(milestone_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn record_refund(
    conn: &mut SqliteConnection,
    milestone_id: i64,
    amount: i64,
) -> Result<()> {
    sqlx::query("UPDATE milestones SET refunded_amount = ?1 WHERE id = ?2")
        .bind(amount)
        .bind(milestone_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Submission / revision history (append-only)
// ─────────────────────────────────────────────────────────

pub(crate) async fn insert_submission(
    conn: &mut SqliteConnection,
    milestone_id: i64,
    note: &str,
    delivery_ref: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO submissions (milestone_id, note, delivery_ref, submitted_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(milestone_id)
    .bind(note)
    .bind(delivery_ref)
    .bind(Utc::now().timestamp())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_revision(
    conn: &mut SqliteConnection,
    milestone_id: i64,
    feedback: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO revision_requests (milestone_id, feedback, requested_at)
        VALUES (?1, ?2, ?3)
        "#,
    )
    .bind(milestone_id)
    .bind(feedback)
    .bind(Utc::now().timestamp())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn latest_submission(
    conn: &mut SqliteConnection,
    milestone_id: i64,
) -> Result<Option<Submission>> {
    let row = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, milestone_id, note, delivery_ref, submitted_at
        FROM   submissions
        WHERE  milestone_id = ?1
        ORDER  BY id DESC
        LIMIT  1
        "#,
    )
    .bind(milestone_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn revisions_for_milestone(
    conn: &mut SqliteConnection,
    milestone_id: i64,
) -> Result<Vec<RevisionRequest>> {
    let rows = sqlx::query_as::<_, RevisionRequest>(
        r#"
        SELECT id, milestone_id, feedback, requested_at
        FROM   revision_requests
        WHERE  milestone_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(milestone_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
