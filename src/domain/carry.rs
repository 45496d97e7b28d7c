//! Carry-forward rules for driver budgets and vehicle fuel.

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub carried_forward: Decimal,
    pub remaining_amount: Decimal,
}

/// A new allocation silently absorbs whatever the previous allocation left
/// unspent. Overspent (negative) remainders are not carried.
pub fn allocate_budget(prior_remaining: Option<Decimal>, amount: Decimal) -> BudgetAllocation {
    let carried_forward = prior_remaining
        .filter(|remaining| *remaining > Decimal::ZERO)
        .unwrap_or_default();
    BudgetAllocation {
        carried_forward,
        remaining_amount: amount + carried_forward,
    }
}

/// Fuel on board after a fill: the filled quantity plus whatever remained.
pub fn refuel(prior_remaining: Option<Decimal>, filled_quantity: Decimal) -> Decimal {
    filled_quantity
        + prior_remaining
            .filter(|remaining| *remaining > Decimal::ZERO)
            .unwrap_or_default()
}

/// Operator-facing note shown before a new allocation is made.
pub fn carry_forward_notice(remaining: Decimal) -> Option<String> {
    (remaining > Decimal::ZERO).then(|| {
        format!("{remaining} remaining from the previous allocation will be added to the next allocation automatically")
    })
}
