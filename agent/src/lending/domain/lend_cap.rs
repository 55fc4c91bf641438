//! Caps on how much of a lending balance may be offered

use super::policy::{ActiveLimit, CoinPolicy};
use rust_decimal::Decimal;
use tracing::debug;

/// Amount of `lending_balance` that may be offered right now.
///
/// `total_balance` is the lending balance plus everything already lent and
/// `lowest_offer_rate` the best competing offer on the book. When the market
/// is at or below `max_to_lend_rate` only the part of the balance above the
/// held-back reserve is lent.
pub fn amount_to_lend(
    policy: &CoinPolicy,
    min_order_size: Decimal,
    total_balance: Decimal,
    lending_balance: Decimal,
    lowest_offer_rate: Decimal,
    total_lent: Decimal,
) -> Decimal {
    let lending_balance = match policy.max_active {
        ActiveLimit::Disabled => return Decimal::ZERO,
        ActiveLimit::Unlimited => lending_balance,
        ActiveLimit::Cap(cap) => {
            let capacity = cap - total_lent;
            if capacity <= Decimal::ZERO {
                debug!(%cap, %total_lent, "Max active amount reached");
                return Decimal::ZERO;
            }
            lending_balance.min(capacity)
        }
    };

    let low_rate = lowest_offer_rate;
    let restricted = low_rate > Decimal::ZERO
        && (policy.max_to_lend_rate.is_zero() || policy.max_to_lend_rate >= low_rate);

    let reserve = if !restricted {
        None
    } else if !policy.max_to_lend.is_zero() {
        Some(total_balance - policy.max_to_lend)
    } else if !policy.max_percent_to_lend.is_zero() {
        Some(total_balance - policy.max_percent_to_lend * total_balance)
    } else {
        None
    };

    let mut amount = match reserve {
        None => lending_balance,
        Some(reserve) if lending_balance > reserve => lending_balance - reserve,
        Some(_) => Decimal::ZERO,
    };

    if lending_balance - amount < min_order_size {
        amount = lending_balance;
    }
    if amount < lending_balance {
        debug!(
            %low_rate,
            max_to_lend_rate = %policy.max_to_lend_rate,
            %amount,
            %lending_balance,
            "Lending restricted by max-to-lend"
        );
    }
    amount
}
