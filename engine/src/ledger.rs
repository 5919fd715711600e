//! Wallet ledger — the sole mutator of account balances.
//!
//! Accounts are keyed by `(owner, party)` and created lazily on first
//! credit. `credit`/`debit`/`transfer` are crate-private on purpose: every
//! balance change outside this module happens through a milestone
//! transition, inside that transition's transaction. The public surface is
//! the [`deposit`] top-up (standing in for the out-of-scope payment
//! processor) and the [`balance`] / [`account`] reads.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::errors::{EngineError, Result};
use crate::types::{Party, WalletAccount};

/// Owner id of the single platform fee account.
pub const PLATFORM_OWNER: &str = "platform";

pub(crate) async fn account_balance(
    conn: &mut SqliteConnection,
    owner: &str,
    party: Party,
) -> Result<i64> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT balance FROM wallet_accounts WHERE owner = ?1 AND party = ?2")
            .bind(owner)
            .bind(party)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(|(balance,)| balance).unwrap_or(0))
}

/// Atomically increase a balance, creating the account if needed.
pub(crate) async fn credit(
    conn: &mut SqliteConnection,
    owner: &str,
    party: Party,
    amount: i64,
) -> Result<()> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    sqlx::query(
        r#"
        INSERT INTO wallet_accounts (owner, party, balance)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (owner, party) DO UPDATE SET balance = balance + excluded.balance
        "#,
    )
    .bind(owner)
    .bind(party)
    .bind(amount)
    .execute(&mut *conn)
    .await?;
    debug!("credited {amount} to {party} wallet of {owner}");
    Ok(())
}

/// Atomically decrease a balance. Fails with `InsufficientFunds` rather
/// than overdraw; the schema's `CHECK (balance >= 0)` is the backstop.
pub(crate) async fn debit(
    conn: &mut SqliteConnection,
    owner: &str,
    party: Party,
    amount: i64,
) -> Result<()> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    let balance = account_balance(&mut *conn, owner, party).await?;
    if balance < amount {
        return Err(EngineError::InsufficientFunds {
            balance,
            required: amount,
        });
    }
    sqlx::query(
        "UPDATE wallet_accounts SET balance = balance - ?1 WHERE owner = ?2 AND party = ?3",
    )
    .bind(amount)
    .bind(owner)
    .bind(party)
    .execute(&mut *conn)
    .await?;
    debug!("debited {amount} from {party} wallet of {owner}");
    Ok(())
}

/// Composed debit + credit. Must run inside the caller's transaction so
/// either both legs land or neither does.
pub(crate) async fn transfer(
    conn: &mut SqliteConnection,
    from: (&str, Party),
    to: (&str, Party),
    amount: i64,
) -> Result<()> {
    debit(&mut *conn, from.0, from.1, amount).await?;
    credit(&mut *conn, to.0, to.1, amount).await
}

// ─────────────────────────────────────────────────────────
// Public surface
// ─────────────────────────────────────────────────────────

/// Current balance of an account; zero if it has never been credited.
pub async fn balance(pool: &SqlitePool, owner: &str, party: Party) -> Result<i64> {
    let mut conn = pool.acquire().await?;
    account_balance(&mut conn, owner, party).await
}

/// External top-up of a wallet, e.g. a confirmed payment-processor charge.
pub async fn deposit(
    pool: &SqlitePool,
    owner: &str,
    party: Party,
    amount: i64,
) -> Result<WalletAccount> {
    let mut tx = pool.begin().await?;
    credit(&mut tx, owner, party, amount).await?;
    let account = load_account(&mut tx, owner, party).await?;
    tx.commit().await?;
    info!("deposit of {amount} to {party} wallet of {owner}");
    Ok(account)
}

pub(crate) async fn load_account(
    conn: &mut SqliteConnection,
    owner: &str,
    party: Party,
) -> Result<WalletAccount> {
    sqlx::query_as::<_, WalletAccount>(
        "SELECT id, owner, party, balance FROM wallet_accounts WHERE owner = ?1 AND party = ?2",
    )
    .bind(owner)
    .bind(party)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EngineError::NotFound("wallet account"))
}
