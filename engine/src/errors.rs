//! Engine-wide error types.
//!
//! Every variant except `Database`/`Migrate` is a terminal, user-visible
//! outcome: a business-rule violation or a race the caller must re-evaluate.
//! Only [`EngineError::ConcurrencyConflict`] is worth retrying, and only
//! after re-reading current state.

use thiserror::Error;

use crate::machine::Action;
use crate::types::{ContractStatus, MilestoneStatus};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient funds: balance {balance} is less than required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("{action} is not a valid action for a {from} milestone")]
    InvalidTransition {
        from: MilestoneStatus,
        action: Action,
    },

    #[error("caller is not authorized to perform this action")]
    NotAuthorized,

    #[error("contract is {status} and accepts no further actions")]
    ContractClosed { status: ContractStatus },

    #[error("milestone amounts total {allocated}, exceeding the contract budget {budget}")]
    BudgetExceeded { allocated: i64, budget: i64 },

    #[error("concurrent update detected; re-read state and retry")]
    ConcurrencyConflict,

    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
