use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    draft::TripDraft,
    models::{Expense, RouteBreakdown},
};

/// Why a submission attempt was stopped before anything was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionBlock {
    #[error("{message}")]
    Fields { message: String },
    #[error("trip needs {required} units of fuel but only {available} are available")]
    Fuel { required: Decimal, available: Decimal },
    #[error("no budget has been allocated to this driver")]
    NoBudget,
    #[error("driver budget is exhausted")]
    BudgetExhausted,
    #[error("trip expenses of {required} exceed the remaining driver budget of {available}")]
    Budget { required: Decimal, available: Decimal },
}

impl SubmissionBlock {
    pub fn fields(message: impl Into<String>) -> Self {
        SubmissionBlock::Fields {
            message: message.into(),
        }
    }
}

/// Checks a recomputed draft in order: trip fields, route fields, expense
/// fields, fuel sufficiency, budget sufficiency. The first failure wins.
pub fn validate_submission(draft: &TripDraft) -> Result<(), SubmissionBlock> {
    validate_trip_fields(draft)?;
    for (idx, route) in draft.routes.iter().enumerate() {
        validate_route(idx + 1, route)?;
    }
    for (idx, route) in draft.routes.iter().enumerate() {
        for (line, expense) in route.expenses.iter().enumerate() {
            validate_expense(idx + 1, line + 1, expense)?;
        }
    }
    check_fuel(draft)?;
    check_budget(draft)
}

/// Rejects drafts whose dates span more than `max_days` calendar days, so a
/// trip never fans out an unbounded number of attendance records.
pub fn validate_date_span(draft: &TripDraft, max_days: u32) -> Result<(), SubmissionBlock> {
    let Some((first, last)) = draft.date_bounds() else {
        return Ok(());
    };
    let days = (last - first).num_days() + 1;
    if days > i64::from(max_days) {
        return Err(SubmissionBlock::fields(format!(
            "trip dates span {days} days; at most {max_days} are allowed"
        )));
    }
    Ok(())
}

fn validate_trip_fields(draft: &TripDraft) -> Result<(), SubmissionBlock> {
    if draft.driver_id.is_none() {
        return Err(SubmissionBlock::fields("select a driver"));
    }
    if draft.vehicle_id.is_none() {
        return Err(SubmissionBlock::fields("select a vehicle"));
    }
    if draft.start_km < 0 || draft.end_km < 0 {
        return Err(SubmissionBlock::fields("odometer readings cannot be negative"));
    }
    if draft.end_km <= draft.start_km {
        return Err(SubmissionBlock::fields(
            "end km must be greater than start km",
        ));
    }
    if draft.routes.is_empty() {
        return Err(SubmissionBlock::fields("add at least one route"));
    }
    Ok(())
}

fn validate_route(number: usize, route: &RouteBreakdown) -> Result<(), SubmissionBlock> {
    let missing = if route.customer_id.is_none() {
        Some("customer")
    } else if route.app_user_id.is_none() {
        Some("app user")
    } else if route.bank_id.is_none() {
        Some("bank")
    } else if route.payment_type.is_none() {
        Some("payment type")
    } else if route.start_location.trim().is_empty() {
        Some("start location")
    } else if route.end_location.trim().is_empty() {
        Some("end location")
    } else if is_blank(route.product_name.as_deref()) {
        Some("product")
    } else if route.weight <= Decimal::ZERO {
        Some("weight")
    } else if route.rate.is_none() {
        Some("rate")
    } else {
        None
    };

    match missing {
        Some(field) => Err(SubmissionBlock::fields(format!(
            "route {number}: {field} is required"
        ))),
        None => Ok(()),
    }
}

fn validate_expense(route: usize, line: usize, expense: &Expense) -> Result<(), SubmissionBlock> {
    let missing = if expense.category.trim().is_empty() {
        Some("category")
    } else if expense.amount <= Decimal::ZERO {
        Some("amount")
    } else if expense.quantity <= Decimal::ZERO {
        Some("quantity")
    } else {
        None
    };

    match missing {
        Some(field) => Err(SubmissionBlock::fields(format!(
            "route {route} expense {line}: {field} is required"
        ))),
        None => Ok(()),
    }
}

fn check_fuel(draft: &TripDraft) -> Result<(), SubmissionBlock> {
    let required = draft.totals.trip_fuel_quantity;
    let available = draft
        .fuel
        .as_ref()
        .map(|fuel| fuel.fuel_quantity)
        .unwrap_or_default();
    if required > available {
        return Err(SubmissionBlock::Fuel {
            required,
            available,
        });
    }
    Ok(())
}

fn check_budget(draft: &TripDraft) -> Result<(), SubmissionBlock> {
    let Some(budget) = draft.budget.as_ref() else {
        return Err(SubmissionBlock::NoBudget);
    };
    let available = budget.remaining_budget_amount;
    if available <= Decimal::ZERO {
        return Err(SubmissionBlock::BudgetExhausted);
    }
    let required = draft.totals.trip_expenses;
    if required > available {
        return Err(SubmissionBlock::Budget {
            required,
            available,
        });
    }
    Ok(())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::domain::models::{
        DriverBudgetSnapshot, LocationHop, PaymentType, VehicleFuelSnapshot,
    };

    fn valid_draft() -> TripDraft {
        let mut draft = TripDraft {
            driver_id: Some(Uuid::new_v4()),
            vehicle_id: Some(Uuid::new_v4()),
            start_km: 100,
            end_km: 350,
            routes: vec![RouteBreakdown {
                sequence: 1,
                hops: vec![LocationHop {
                    from: "Mumbai".to_string(),
                    to: "Pune".to_string(),
                    ..LocationHop::default()
                }],
                customer_id: Some(Uuid::new_v4()),
                product_name: Some("Cement".to_string()),
                rate: Some(Decimal::from(5)),
                weight: Decimal::from(1000),
                payment_type: Some(PaymentType::Cash),
                bank_id: Some(Uuid::new_v4()),
                app_user_id: Some(Uuid::new_v4()),
                expenses: vec![Expense {
                    category: "Toll".to_string(),
                    amount: Decimal::from(100),
                    quantity: Decimal::from(8),
                    ..Expense::default()
                }],
                dates: vec![NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()],
                ..RouteBreakdown::default()
            }],
            fuel: Some(VehicleFuelSnapshot {
                fuel_quantity: Decimal::from(30),
                rate: Decimal::from(90),
                total_amount: Decimal::from(2700),
                average: Decimal::from(10),
            }),
            budget: Some(DriverBudgetSnapshot {
                remaining_budget_amount: Decimal::from(1000),
                allocation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            }),
            ..TripDraft::default()
        };
        draft.recompute().unwrap();
        draft
    }

    #[test]
    fn accepts_a_complete_draft() {
        assert_eq!(validate_submission(&valid_draft()), Ok(()));
    }

    #[test]
    fn missing_driver_is_reported_first() {
        let mut draft = valid_draft();
        draft.driver_id = None;
        draft.budget = None;
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields("select a driver"))
        );
    }

    #[test]
    fn rejects_non_increasing_odometer() {
        let mut draft = valid_draft();
        draft.end_km = draft.start_km;
        draft.recompute().unwrap();
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields(
                "end km must be greater than start km"
            ))
        );
    }

    #[test]
    fn route_fields_are_checked_in_order() {
        let mut draft = valid_draft();
        draft.routes[0].bank_id = None;
        draft.routes[0].weight = Decimal::ZERO;
        draft.recompute().unwrap();
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields("route 1: bank is required"))
        );
    }

    #[test]
    fn zero_rate_is_allowed_but_missing_rate_is_not() {
        let mut draft = valid_draft();
        draft.routes[0].rate = Some(Decimal::ZERO);
        draft.recompute().unwrap();
        assert_eq!(validate_submission(&draft), Ok(()));

        draft.routes[0].rate = None;
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields("route 1: rate is required"))
        );
    }

    #[test]
    fn expense_needs_positive_quantity() {
        let mut draft = valid_draft();
        draft.routes[0].expenses[0].quantity = Decimal::ZERO;
        draft.recompute().unwrap();
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields(
                "route 1 expense 1: quantity is required"
            ))
        );
    }

    #[test]
    fn blocks_when_fuel_required_exceeds_available() {
        let mut draft = valid_draft();
        if let Some(fuel) = draft.fuel.as_mut() {
            fuel.fuel_quantity = Decimal::from(20);
        }
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::Fuel {
                required: Decimal::from(25),
                available: Decimal::from(20),
            })
        );
    }

    #[test]
    fn fuel_is_checked_before_budget() {
        let mut draft = valid_draft();
        draft.fuel = Some(VehicleFuelSnapshot {
            fuel_quantity: Decimal::ZERO,
            rate: Decimal::from(90),
            total_amount: Decimal::ZERO,
            average: Decimal::from(10),
        });
        draft.budget = None;
        draft.recompute().unwrap();
        assert!(matches!(
            validate_submission(&draft),
            Err(SubmissionBlock::Fuel { .. })
        ));
    }

    #[test]
    fn blocks_without_budget_or_with_exhausted_budget() {
        let mut draft = valid_draft();
        draft.budget = None;
        assert_eq!(validate_submission(&draft), Err(SubmissionBlock::NoBudget));

        draft.budget = Some(DriverBudgetSnapshot {
            remaining_budget_amount: Decimal::ZERO,
            allocation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        });
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::BudgetExhausted)
        );
    }

    #[test]
    fn blocks_when_expenses_exceed_budget() {
        let mut draft = valid_draft();
        draft.budget = Some(DriverBudgetSnapshot {
            remaining_budget_amount: Decimal::from(500),
            allocation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        });
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::Budget {
                required: Decimal::from(800),
                available: Decimal::from(500),
            })
        );
    }

    #[test]
    fn rejects_negative_odometer_readings() {
        let mut draft = valid_draft();
        draft.start_km = -10;
        assert_eq!(
            validate_submission(&draft),
            Err(SubmissionBlock::fields("odometer readings cannot be negative"))
        );
    }

    #[test]
    fn date_span_is_limited() {
        let mut draft = valid_draft();
        assert_eq!(validate_date_span(&draft, 31), Ok(()));

        draft.routes[0].dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap(),
        ];
        assert!(matches!(
            validate_date_span(&draft, 31),
            Err(SubmissionBlock::Fields { message }) if message.starts_with("trip dates span")
        ));

        draft.routes[0].dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        ];
        assert_eq!(validate_date_span(&draft, 31), Ok(()));
    }
}
