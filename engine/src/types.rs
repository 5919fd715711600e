//! # Types
//!
//! Shared data structures used across all modules of the escrow engine.
//!
//! ## Design decisions
//!
//! ### Amounts are integer minor units
//!
//! All money is carried as `i64` minor currency units (cents). Integer
//! arithmetic is what makes the conservation and fee identities exact; any
//! display-currency formatting or conversion belongs to the UI collaborator,
//! not the engine.
//!
//! ### Status as a Finite-State Machine
//!
//! [`MilestoneStatus`] enforces a strict per-milestone lifecycle:
//!
//! ```text
//! PENDING ──fund──► FUNDED ──submit──► SUBMITTED ──release──► RELEASED
//!                      ▲                   │
//!                      └─request_revision──┘
//!
//! FUNDED / SUBMITTED ──cancel──► REFUNDED
//! ```
//!
//! `RELEASED` and `REFUNDED` are terminal. The transition table itself lives
//! in [`crate::machine`]; these enums are the closed vocabulary it ranges
//! over, stored as TEXT in SQLite and serialised as snake_case in JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a single milestone's escrow hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Created with the contract; no funds held yet.
    Pending,
    /// The client's wallet has been debited; the amount is held in escrow.
    Funded,
    /// The freelancer has delivered; awaiting client review.
    Submitted,
    /// Settled to the freelancer (net) and the platform (fee). Terminal.
    Released,
    /// Returned in full to the client on cancellation. Terminal.
    Refunded,
}

impl MilestoneStatus {
    /// Return a short identifier string suitable for storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Funded => "funded",
            Self::Submitted => "submitted",
            Self::Released => "released",
            Self::Refunded => "refunded",
        }
    }

    /// Terminal statuses permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// While `true`, exactly `amount` is held out of the client's wallet.
    pub fn holds_funds(&self) -> bool {
        matches!(self, Self::Funded | Self::Submitted)
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract-level status, derived from milestone statuses after every
/// transition. `Cancelled` is sticky: once set it is never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ContractStatus {
    /// No milestone funded yet.
    Pending,
    /// At least one milestone has been funded and not all are released.
    Active,
    /// Every milestone is released. Terminal.
    Completed,
    /// Cancelled by the client; outstanding holds refunded. Terminal.
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a wallet account plays in the marketplace.
///
/// A wallet account is identified by `(owner, party)` — the same user id can
/// hold a client wallet and a freelancer wallet independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Party {
    Client,
    Freelancer,
    Platform,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Freelancer => "freelancer",
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// Persisted records
// ─────────────────────────────────────────────────────────

/// A contract row: one client, one freelancer, a budget, and an ordered
/// sequence of milestones it exclusively owns.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contract {
    pub id: i64,
    pub title: String,
    /// User id of the paying party.
    pub client: String,
    /// User id of the receiving party.
    pub freelancer: String,
    /// Upper bound on the sum of milestone amounts, in minor units.
    pub total_budget: i64,
    pub status: ContractStatus,
    pub created_at: i64,
}

/// A milestone row. Never deleted — terminal statuses plus the settlement
/// columns are the permanent record of where its funds went.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: i64,
    pub contract_id: i64,
    pub description: String,
    /// Escrow amount in minor units; always positive.
    pub amount: i64,
    pub status: MilestoneStatus,
    /// Optimistic-concurrency counter, incremented on every status write.
    pub version: i64,
    /// Freelancer payout recorded at release.
    pub released_net: Option<i64>,
    /// Platform fee recorded at release.
    pub released_fee: Option<i64>,
    /// Full amount returned to the client on cancellation.
    pub refunded_amount: Option<i64>,
    pub created_at: i64,
}

/// One delivery by the freelancer. Rows are append-only; the *current*
/// submission is the latest row and is only meaningful while the milestone
/// is `Submitted` — a revision request moves the milestone back to `Funded`,
/// which is what retires it without erasing history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Submission {
    pub id: i64,
    pub milestone_id: i64,
    pub note: String,
    /// Pointer to the delivered work (URL or similar).
    pub delivery_ref: String,
    pub submitted_at: i64,
}

/// Client feedback asking for another iteration. Append-only audit trail.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevisionRequest {
    pub id: i64,
    pub milestone_id: i64,
    pub feedback: String,
    pub requested_at: i64,
}

/// A wallet account row, mutated exclusively by [`crate::ledger`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WalletAccount {
    pub id: i64,
    pub owner: String,
    pub party: Party,
    pub balance: i64,
}

// ─────────────────────────────────────────────────────────
// Inputs and read models
// ─────────────────────────────────────────────────────────

/// Milestone description given at contract creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub description: String,
    /// Escrow amount in minor units; must be positive.
    pub amount: i64,
}

/// A milestone with its active submission and revision history attached.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneDetail {
    #[serde(flatten)]
    pub milestone: Milestone,
    /// Present only while the milestone is `Submitted`.
    pub submission: Option<Submission>,
    pub revisions: Vec<RevisionRequest>,
}

/// A contract with its full milestone collection, as returned by the
/// registry's read operations.
#[derive(Debug, Clone, Serialize)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Contract,
    pub milestones: Vec<MilestoneDetail>,
}
