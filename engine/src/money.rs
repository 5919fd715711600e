//! Fee settlement arithmetic.
//!
//! The fee rate is expressed in basis points (1000 = 10%) and applied only
//! when a milestone is released. `net + fee == amount` holds exactly for
//! every input: the fee is the ceiling of `amount * rate`, so any rounding
//! remainder lands in the fee and the net is whatever is left. No rounding
//! leakage in either direction.

use serde::Serialize;

/// Divisor for basis-point fee rates.
pub const FEE_RATE_DENOMINATOR: i64 = 10_000;

/// The split of a released amount into freelancer payout and platform fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Credited to the freelancer.
    pub net: i64,
    /// Credited to the platform.
    pub fee: i64,
}

/// Split `amount` minor units at `fee_bps` basis points.
///
/// `amount` must be non-negative and `fee_bps` at most 10_000; both are
/// validated by the callers (milestone amounts are positive by schema,
/// the fee rate at configuration load).
pub fn settle(amount: i64, fee_bps: u32) -> Settlement {
    debug_assert!(amount >= 0);
    debug_assert!(i64::from(fee_bps) <= FEE_RATE_DENOMINATOR);

    // Widen to i128 so amount * fee_bps cannot overflow.
    let gross = i128::from(amount) * i128::from(fee_bps);
    let denominator = i128::from(FEE_RATE_DENOMINATOR);
    let fee = ((gross + denominator - 1) / denominator) as i64;

    Settlement {
        net: amount - fee,
        fee,
    }
}
