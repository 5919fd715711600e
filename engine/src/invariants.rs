#![allow(dead_code)]

//! Cross-cutting invariant assertions used by the scenario tests.

use sqlx::SqlitePool;

use crate::types::{Milestone, MilestoneStatus};

/// INV-1: fund conservation per milestone. Exactly one of the following
/// holds at any time:
/// - not yet funded: no settlement columns set;
/// - holding: debited from the client, present in no wallet, no columns set;
/// - released: `net + fee == amount` exactly;
/// - refunded: the full amount went back to the client.
pub fn assert_milestone_conservation(milestone: &Milestone) {
    match milestone.status {
        MilestoneStatus::Pending | MilestoneStatus::Funded | MilestoneStatus::Submitted => {
            assert!(
                milestone.released_net.is_none()
                    && milestone.released_fee.is_none()
                    && milestone.refunded_amount.is_none(),
                "INV-1 violated: milestone {} is {} but carries settlement columns",
                milestone.id,
                milestone.status
            );
        }
        MilestoneStatus::Released => {
            let net = milestone.released_net.expect("released milestone lacks net");
            let fee = milestone.released_fee.expect("released milestone lacks fee");
            assert_eq!(
                net + fee,
                milestone.amount,
                "INV-1 violated: milestone {} released {} + {} != {}",
                milestone.id,
                net,
                fee,
                milestone.amount
            );
            assert!(milestone.refunded_amount.is_none());
        }
        MilestoneStatus::Refunded => {
            assert_eq!(
                milestone.refunded_amount,
                Some(milestone.amount),
                "INV-1 violated: milestone {} refund does not match its amount",
                milestone.id
            );
            assert!(milestone.released_net.is_none() && milestone.released_fee.is_none());
        }
    }
}

/// INV-2: the version counter only moves forward, one step per transition.
pub fn assert_version_advanced(before: &Milestone, after: &Milestone) {
    assert_eq!(
        after.version,
        before.version + 1,
        "INV-2 violated: milestone {} version went {} -> {}",
        before.id,
        before.version,
        after.version
    );
}

/// Sum of every wallet balance. Deposits put money into the system; escrow
/// holds take it out of all wallets until release or refund puts it back,
/// so `deposits - held == total_in_wallets` at every step.
pub async fn total_in_wallets(pool: &SqlitePool) -> i64 {
    let sum: Option<i64> = sqlx::query_scalar("SELECT SUM(balance) FROM wallet_accounts")
        .fetch_one(pool)
        .await
        .expect("wallet sum query failed");
    sum.unwrap_or(0)
}

/// No balance may ever be negative (the schema CHECK is the backstop; this
/// catches it at the assertion layer with a readable message).
pub async fn assert_no_negative_balances(pool: &SqlitePool) {
    let negatives: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM wallet_accounts WHERE balance < 0")
            .fetch_one(pool)
            .await
            .expect("negative balance query failed");
    assert_eq!(negatives, 0, "a wallet balance went negative");
}
