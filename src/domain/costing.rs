//! Trip cost aggregation.
//!
//! Pure arithmetic over a trip's routes and the vehicle's latest fuel
//! snapshot. Every draft edit re-runs these functions, so derived figures are
//! never stale relative to the fields they are computed from.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{Expense, RouteBreakdown, VehicleFuelSnapshot};

const FUEL_SCALE: u32 = 2;

/// A derived figure fell outside the range `Decimal` or `i64` can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is too large to compute")]
pub struct Overflow(pub &'static str);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripTotals {
    pub trip_route_cost: Decimal,
    pub trip_expenses: Decimal,
    pub trip_fuel_quantity: Decimal,
    pub trip_diesel_cost: Decimal,
    pub remaining_amount: Decimal,
}

/// `total = amount * quantity`.
pub fn recompute_expense(expense: &mut Expense) -> Result<(), Overflow> {
    expense.total = expense
        .amount
        .checked_mul(expense.quantity)
        .ok_or(Overflow("expense total"))?;
    Ok(())
}

/// Recomputes `route_amount = weight * rate` and `total_expense` as the sum of
/// every expense total. A missing rate prices the route at zero.
pub fn recompute_route(route: &mut RouteBreakdown) -> Result<(), Overflow> {
    for expense in &mut route.expenses {
        recompute_expense(expense)?;
    }
    route.route_amount = route
        .weight
        .checked_mul(route.rate.unwrap_or_default())
        .ok_or(Overflow("route amount"))?;
    route.total_expense = checked_sum(
        route.expenses.iter().map(|expense| expense.total),
        "route expenses",
    )?;
    Ok(())
}

/// Fuel consumed over the odometer range at the vehicle's average.
///
/// Zero when the range is empty or inverted, or when no usable average is
/// known.
pub fn fuel_quantity(
    start_km: i64,
    end_km: i64,
    fuel: Option<&VehicleFuelSnapshot>,
) -> Result<Decimal, Overflow> {
    let Some(fuel) = fuel else {
        return Ok(Decimal::ZERO);
    };
    if end_km <= start_km || fuel.average <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let distance = end_km
        .checked_sub(start_km)
        .ok_or(Overflow("trip distance"))?;
    let quantity = Decimal::from(distance)
        .checked_div(fuel.average)
        .ok_or(Overflow("fuel quantity"))?;
    Ok(round_fuel(quantity))
}

pub fn compute_totals(
    start_km: i64,
    end_km: i64,
    routes: &[RouteBreakdown],
    fuel: Option<&VehicleFuelSnapshot>,
) -> Result<TripTotals, Overflow> {
    let trip_route_cost = checked_sum(routes.iter().map(|route| route.route_amount), "trip route cost")?;
    let trip_expenses = checked_sum(routes.iter().map(|route| route.total_expense), "trip expenses")?;
    let trip_fuel_quantity = fuel_quantity(start_km, end_km, fuel)?;
    let trip_diesel_cost = match fuel {
        Some(fuel) if !trip_fuel_quantity.is_zero() => round_fuel(
            trip_fuel_quantity
                .checked_mul(fuel.rate)
                .ok_or(Overflow("diesel cost"))?,
        ),
        _ => Decimal::ZERO,
    };
    let remaining_amount = trip_route_cost
        .checked_sub(trip_expenses)
        .and_then(|amount| amount.checked_sub(trip_diesel_cost))
        .ok_or(Overflow("remaining amount"))?;

    Ok(TripTotals {
        trip_route_cost,
        trip_expenses,
        trip_fuel_quantity,
        trip_diesel_cost,
        remaining_amount,
    })
}

fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    figure: &'static str,
) -> Result<Decimal, Overflow> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or(Overflow(figure))
}

fn round_fuel(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FUEL_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
