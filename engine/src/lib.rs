//! # Escrow Milestone Payment Engine
//!
//! Core of a marketplace's contract payment flow: money moves from a paying
//! client through per-milestone escrow holds to a freelancer, with a
//! platform fee taken on release. The engine owns the wallet ledger, the
//! per-milestone state machine, and the contract registry; UI, transport,
//! and notification delivery are external collaborators consuming the
//! operations below.
//!
//! | Phase | Operation(s) |
//! |--------------|---------------------------------------------|
//! | Setup | [`registry::create_contract`], [`ledger::deposit`] |
//! | Escrow | [`machine::fund_milestone`] |
//! | Delivery | [`machine::submit_work`], [`machine::request_revision`] |
//! | Settlement | [`machine::release_escrow`] |
//! | Cancellation | [`cancel::cancel_contract`] |
//! | Queries | [`registry::get_contract`], [`registry::list_contracts`], [`ledger::balance`] |
//!
//! ## Architecture
//!
//! Balance mutation is fully owned by [`ledger`]; status mutation is fully
//! owned by [`machine`] (with [`cancel`] going through the same transition
//! table). Every transition runs inside a single SQLite transaction covering
//! the guard checks, the compared-and-incremented version write, and the
//! wallet effect — the commit is the atomicity boundary, and a version
//! mismatch surfaces as [`EngineError::ConcurrencyConflict`] rather than a
//! silently applied stale write. Balances are the authoritative record, not
//! a view recomputed from contract history.

pub mod cancel;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod machine;
pub mod money;
pub mod registry;
pub mod types;

#[cfg(test)]
mod invariants;

pub use cancel::CancellationOutcome;
pub use errors::{EngineError, Result};
pub use machine::{Action, ReleaseOutcome};
pub use money::Settlement;
pub use types::{
    Contract, ContractDetail, ContractStatus, Milestone, MilestoneDetail, MilestoneSpec,
    MilestoneStatus, Party, RevisionRequest, Submission, WalletAccount,
};
