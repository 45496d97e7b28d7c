//! The trip draft aggregate and its reducer.
//!
//! A draft is the whole editable state of one trip form: odometer range,
//! selected vehicle and driver with their snapshots, and an ordered list of
//! routes. Each route owns its own location hops and expenses, so removing a
//! route never leaves index-keyed side tables behind. Every edit goes through
//! [`TripDraft::apply`], which re-runs the cost aggregator before returning.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    costing::{self, Overflow, TripTotals},
    models::{
        self, DriverBudgetSnapshot, Expense, LocationHop, PaymentType, RouteBreakdown, RouteStatus,
        Trip, TripStatus, VehicleFuelSnapshot,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("{0} cannot be negative")]
    NegativeOdometer(&'static str),
    #[error(transparent)]
    Overflow(#[from] Overflow),
    #[error("route {0} does not exist")]
    RouteOutOfRange(usize),
    #[error("hop {hop} does not exist on route {route}")]
    HopOutOfRange { route: usize, hop: usize },
    #[error("expense {expense} does not exist on route {route}")]
    ExpenseOutOfRange { route: usize, expense: usize },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub start_km: i64,
    #[serde(default)]
    pub end_km: i64,
    #[serde(default)]
    pub status: TripStatus,
    pub remarks: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteBreakdown>,
    pub fuel: Option<VehicleFuelSnapshot>,
    pub budget: Option<DriverBudgetSnapshot>,
    #[serde(default)]
    pub totals: TripTotals,
}

/// Partial update of a route's own fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePatch {
    pub customer_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub rate: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub advance_amount: Option<Decimal>,
    pub payment_type: Option<PaymentType>,
    pub bank_id: Option<Uuid>,
    pub app_user_id: Option<Uuid>,
    pub dates: Option<Vec<NaiveDate>>,
    pub status: Option<RouteStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DraftEdit {
    SelectVehicle {
        vehicle_id: Uuid,
        start_km: i64,
        fuel: Option<VehicleFuelSnapshot>,
    },
    SelectDriver {
        driver_id: Uuid,
        budget: Option<DriverBudgetSnapshot>,
    },
    SetStartKm {
        start_km: i64,
    },
    SetEndKm {
        end_km: i64,
    },
    SetDates {
        dates: Vec<NaiveDate>,
    },
    SetStatus {
        status: TripStatus,
    },
    SetRemarks {
        remarks: Option<String>,
    },
    AddRoute,
    RemoveRoute {
        route: usize,
    },
    UpdateRoute {
        route: usize,
        patch: RoutePatch,
    },
    AddHop {
        route: usize,
    },
    RemoveHop {
        route: usize,
        hop: usize,
    },
    SetHopFrom {
        route: usize,
        hop: usize,
        from: String,
    },
    SetHopTo {
        route: usize,
        hop: usize,
        to: String,
    },
    SetHopStatus {
        route: usize,
        hop: usize,
        status: RouteStatus,
    },
    AddExpense {
        route: usize,
    },
    RemoveExpense {
        route: usize,
        expense: usize,
    },
    UpdateExpense {
        route: usize,
        expense: usize,
        patch: ExpensePatch,
    },
}

impl TripDraft {
    /// A fresh draft holding one empty route, as the form opens.
    pub fn new() -> Self {
        let mut draft = Self::default();
        draft.add_route();
        draft
    }

    pub fn apply(&mut self, edit: DraftEdit) -> Result<(), DraftError> {
        match edit {
            DraftEdit::SelectVehicle {
                vehicle_id,
                start_km,
                fuel,
            } => {
                non_negative_km("start km", start_km)?;
                self.vehicle_id = Some(vehicle_id);
                self.start_km = start_km;
                self.fuel = fuel;
            }
            DraftEdit::SelectDriver { driver_id, budget } => {
                self.driver_id = Some(driver_id);
                self.budget = budget;
            }
            DraftEdit::SetStartKm { start_km } => {
                self.start_km = non_negative_km("start km", start_km)?;
            }
            DraftEdit::SetEndKm { end_km } => {
                self.end_km = non_negative_km("end km", end_km)?;
            }
            DraftEdit::SetDates { dates } => self.dates = dates,
            DraftEdit::SetStatus { status } => self.status = status,
            DraftEdit::SetRemarks { remarks } => self.remarks = remarks,
            DraftEdit::AddRoute => self.add_route(),
            DraftEdit::RemoveRoute { route } => self.remove_route(route)?,
            DraftEdit::UpdateRoute { route, patch } => self.route_mut(route)?.apply_patch(patch),
            DraftEdit::AddHop { route } => self.route_mut(route)?.add_hop(),
            DraftEdit::RemoveHop { route, hop } => {
                let entry = self.route_mut(route)?;
                if hop >= entry.hops.len() {
                    return Err(DraftError::HopOutOfRange { route, hop });
                }
                entry.hops.remove(hop);
            }
            DraftEdit::SetHopFrom { route, hop, from } => {
                self.route_mut(route)?
                    .set_hop_from(hop, from)
                    .map_err(|hop| DraftError::HopOutOfRange { route, hop })?;
            }
            DraftEdit::SetHopTo { route, hop, to } => {
                let entry = self.route_mut(route)?;
                let target = entry
                    .hops
                    .get_mut(hop)
                    .ok_or(DraftError::HopOutOfRange { route, hop })?;
                target.to = to;
            }
            DraftEdit::SetHopStatus { route, hop, status } => {
                let entry = self.route_mut(route)?;
                let target = entry
                    .hops
                    .get_mut(hop)
                    .ok_or(DraftError::HopOutOfRange { route, hop })?;
                target.status = status;
            }
            DraftEdit::AddExpense { route } => {
                let entry = self.route_mut(route)?;
                let quantity = entry.weight;
                entry.expenses.push(Expense {
                    quantity,
                    ..Expense::default()
                });
            }
            DraftEdit::RemoveExpense { route, expense } => {
                let entry = self.route_mut(route)?;
                if expense >= entry.expenses.len() {
                    return Err(DraftError::ExpenseOutOfRange { route, expense });
                }
                entry.expenses.remove(expense);
            }
            DraftEdit::UpdateExpense {
                route,
                expense,
                patch,
            } => {
                let entry = self.route_mut(route)?;
                let target = entry
                    .expenses
                    .get_mut(expense)
                    .ok_or(DraftError::ExpenseOutOfRange { route, expense })?;
                target.apply_patch(patch);
            }
        }
        self.recompute()
    }

    /// Re-derives every computed figure: route endpoints, route amounts,
    /// expense totals and the trip-level totals.
    pub fn recompute(&mut self) -> Result<(), DraftError> {
        for route in &mut self.routes {
            route.derive_endpoints();
            costing::recompute_route(route)?;
        }
        self.totals = costing::compute_totals(
            self.start_km,
            self.end_km,
            &self.routes,
            self.fuel.as_ref(),
        )?;
        Ok(())
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        models::date_bounds(&self.routes, &self.dates)
    }

    /// Clears an infeasible odometer entry so the user must re-enter it.
    pub fn reset_end_km(&mut self) -> Result<(), DraftError> {
        self.end_km = 0;
        self.recompute()
    }

    /// Builds the persisted trip. Callers validate the draft first; a missing
    /// driver or vehicle yields `None`.
    pub fn to_trip(
        &self,
        id: Uuid,
        trip_number: String,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Option<Trip> {
        Some(Trip {
            id,
            trip_number,
            dates: self.dates.clone(),
            start_km: self.start_km,
            end_km: self.end_km,
            total_km: self.end_km.saturating_sub(self.start_km).max(0),
            driver_id: self.driver_id?,
            vehicle_id: self.vehicle_id?,
            status: self.status,
            remarks: self.remarks.clone(),
            routes: self.routes.clone(),
            trip_route_cost: self.totals.trip_route_cost,
            trip_expenses: self.totals.trip_expenses,
            trip_diesel_cost: self.totals.trip_diesel_cost,
            trip_fuel_quantity: self.totals.trip_fuel_quantity,
            remaining_amount: self.totals.remaining_amount,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    fn add_route(&mut self) {
        let seed = self
            .routes
            .last()
            .and_then(|route| route.hops.last())
            .map(|hop| hop.to.clone())
            .unwrap_or_default();
        self.routes.push(RouteBreakdown {
            sequence: self.routes.len() as u32 + 1,
            hops: vec![LocationHop {
                from: seed,
                ..LocationHop::default()
            }],
            ..RouteBreakdown::default()
        });
    }

    fn remove_route(&mut self, route: usize) -> Result<(), DraftError> {
        if route >= self.routes.len() {
            return Err(DraftError::RouteOutOfRange(route));
        }
        self.routes.remove(route);
        for (idx, entry) in self.routes.iter_mut().enumerate() {
            entry.sequence = idx as u32 + 1;
        }
        Ok(())
    }

    fn route_mut(&mut self, route: usize) -> Result<&mut RouteBreakdown, DraftError> {
        self.routes
            .get_mut(route)
            .ok_or(DraftError::RouteOutOfRange(route))
    }
}

fn non_negative_km(field: &'static str, km: i64) -> Result<i64, DraftError> {
    if km < 0 {
        return Err(DraftError::NegativeOdometer(field));
    }
    Ok(km)
}

impl RouteBreakdown {
    /// `start_location` is the first hop's `from`, `end_location` the last
    /// hop's `to`.
    pub fn derive_endpoints(&mut self) {
        self.start_location = self
            .hops
            .first()
            .map(|hop| hop.from.clone())
            .unwrap_or_default();
        self.end_location = self
            .hops
            .last()
            .map(|hop| hop.to.clone())
            .unwrap_or_default();
    }

    /// Sets hop `hop`'s origin and moves the previous hop's destination with
    /// it, keeping the chain connected. Returns the offending index when the
    /// hop does not exist.
    fn set_hop_from(&mut self, hop: usize, from: String) -> Result<(), usize> {
        if hop >= self.hops.len() {
            return Err(hop);
        }
        if let Some(previous) = hop.checked_sub(1) {
            self.hops[previous].to = from.clone();
        }
        self.hops[hop].from = from;
        Ok(())
    }

    fn add_hop(&mut self) {
        let seed = self
            .hops
            .last()
            .map(|hop| hop.to.clone())
            .unwrap_or_default();
        self.hops.push(LocationHop {
            from: seed,
            ..LocationHop::default()
        });
    }

    fn apply_patch(&mut self, patch: RoutePatch) {
        if let Some(customer_id) = patch.customer_id {
            self.customer_id = Some(customer_id);
        }
        if let Some(product_name) = patch.product_name {
            self.product_name = Some(product_name);
        }
        if let Some(rate) = patch.rate {
            self.rate = Some(rate);
        }
        if let Some(advance_amount) = patch.advance_amount {
            self.advance_amount = advance_amount;
        }
        if let Some(payment_type) = patch.payment_type {
            self.payment_type = Some(payment_type);
        }
        if let Some(bank_id) = patch.bank_id {
            self.bank_id = Some(bank_id);
        }
        if let Some(app_user_id) = patch.app_user_id {
            self.app_user_id = Some(app_user_id);
        }
        if let Some(dates) = patch.dates {
            self.dates = dates;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
            // expenses are priced per unit of weight carried
            for expense in &mut self.expenses {
                expense.quantity = weight;
            }
        }
    }
}

impl Expense {
    fn apply_patch(&mut self, patch: ExpensePatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop_from(route: usize, hop: usize, from: &str) -> DraftEdit {
        DraftEdit::SetHopFrom {
            route,
            hop,
            from: from.to_string(),
        }
    }

    fn hop_to(route: usize, hop: usize, to: &str) -> DraftEdit {
        DraftEdit::SetHopTo {
            route,
            hop,
            to: to.to_string(),
        }
    }

    fn apply_all(draft: &mut TripDraft, edits: Vec<DraftEdit>) {
        for edit in edits {
            draft.apply(edit).expect("edit should apply");
        }
    }

    fn weight_edit(route: usize, weight: i64) -> DraftEdit {
        DraftEdit::UpdateRoute {
            route,
            patch: RoutePatch {
                weight: Some(Decimal::from(weight)),
                ..RoutePatch::default()
            },
        }
    }

    #[test]
    fn new_draft_has_one_seeded_route() {
        let draft = TripDraft::new();
        assert_eq!(draft.routes.len(), 1);
        assert_eq!(draft.routes[0].sequence, 1);
        assert_eq!(draft.routes[0].hops.len(), 1);
    }

    #[test]
    fn setting_hop_origin_rewrites_previous_destination() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                hop_from(0, 0, "Mumbai"),
                hop_to(0, 0, "Nashik"),
                DraftEdit::AddHop { route: 0 },
                hop_from(0, 1, "Igatpuri"),
                hop_to(0, 1, "Pune"),
            ],
        );

        let route = &draft.routes[0];
        assert_eq!(route.hops[0].to, "Igatpuri");
        assert_eq!(route.hops[1].from, "Igatpuri");
        assert_eq!(route.start_location, "Mumbai");
        assert_eq!(route.end_location, "Pune");
    }

    #[test]
    fn new_route_starts_where_the_previous_one_ended() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                hop_from(0, 0, "Mumbai"),
                hop_to(0, 0, "Pune"),
                DraftEdit::AddRoute,
            ],
        );

        assert_eq!(draft.routes[1].sequence, 2);
        assert_eq!(draft.routes[1].hops[0].from, "Pune");
        assert_eq!(draft.routes[1].start_location, "Pune");
    }

    #[test]
    fn removing_a_route_renumbers_the_rest() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                hop_to(0, 0, "A"),
                DraftEdit::AddRoute,
                hop_to(1, 0, "B"),
                DraftEdit::AddRoute,
                hop_to(2, 0, "C"),
                DraftEdit::RemoveRoute { route: 1 },
            ],
        );

        assert_eq!(draft.routes.len(), 2);
        assert_eq!(draft.routes[1].sequence, 2);
        assert_eq!(draft.routes[1].hops[0].from, "B");
        assert_eq!(draft.routes[1].end_location, "C");
    }

    #[test]
    fn removing_a_hop_does_not_rechain_neighbours() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                hop_from(0, 0, "A"),
                hop_to(0, 0, "B"),
                DraftEdit::AddHop { route: 0 },
                hop_to(0, 1, "C"),
                DraftEdit::AddHop { route: 0 },
                hop_to(0, 2, "D"),
                DraftEdit::RemoveHop { route: 0, hop: 1 },
            ],
        );

        let route = &draft.routes[0];
        assert_eq!(route.hops.len(), 2);
        assert_eq!(route.hops[0].to, "B");
        assert_eq!(route.hops[1].from, "C");
        assert_eq!(route.start_location, "A");
        assert_eq!(route.end_location, "D");
    }

    #[test]
    fn weight_change_mirrors_into_expense_quantities() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                DraftEdit::AddExpense { route: 0 },
                DraftEdit::UpdateExpense {
                    route: 0,
                    expense: 0,
                    patch: ExpensePatch {
                        category: Some("Toll".to_string()),
                        amount: Some(Decimal::from(2)),
                        quantity: Some(Decimal::from(3)),
                        description: None,
                    },
                },
                DraftEdit::AddExpense { route: 0 },
                DraftEdit::UpdateExpense {
                    route: 0,
                    expense: 1,
                    patch: ExpensePatch {
                        amount: Some(Decimal::from(5)),
                        ..ExpensePatch::default()
                    },
                },
                weight_edit(0, 40),
            ],
        );

        let route = &draft.routes[0];
        assert!(route
            .expenses
            .iter()
            .all(|expense| expense.quantity == Decimal::from(40)));
        assert_eq!(route.expenses[0].total, Decimal::from(80));
        assert_eq!(route.expenses[1].total, Decimal::from(200));
        assert_eq!(route.total_expense, Decimal::from(280));
        assert_eq!(draft.totals.trip_expenses, Decimal::from(280));
    }

    #[test]
    fn route_and_trip_totals_recompute_on_every_edit() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                DraftEdit::SelectVehicle {
                    vehicle_id: Uuid::new_v4(),
                    start_km: 100,
                    fuel: Some(VehicleFuelSnapshot {
                        fuel_quantity: Decimal::from(40),
                        rate: Decimal::from(90),
                        total_amount: Decimal::from(3600),
                        average: Decimal::from(10),
                    }),
                },
                weight_edit(0, 1000),
                DraftEdit::UpdateRoute {
                    route: 0,
                    patch: RoutePatch {
                        rate: Some(Decimal::from(5)),
                        ..RoutePatch::default()
                    },
                },
                DraftEdit::SetEndKm { end_km: 350 },
            ],
        );

        assert_eq!(draft.routes[0].route_amount, Decimal::from(5000));
        assert_eq!(draft.totals.trip_fuel_quantity, Decimal::from(25));
        assert_eq!(draft.totals.trip_diesel_cost, Decimal::from(2250));
        assert_eq!(draft.totals.remaining_amount, Decimal::from(2750));

        draft.reset_end_km().unwrap();
        assert_eq!(draft.end_km, 0);
        assert_eq!(draft.totals.trip_fuel_quantity, Decimal::ZERO);
        assert_eq!(draft.totals.trip_diesel_cost, Decimal::ZERO);
    }

    #[test]
    fn out_of_range_edits_are_rejected() {
        let mut draft = TripDraft::new();
        assert_eq!(
            draft.apply(DraftEdit::RemoveRoute { route: 3 }),
            Err(DraftError::RouteOutOfRange(3))
        );
        assert_eq!(
            draft.apply(hop_from(0, 2, "X")),
            Err(DraftError::HopOutOfRange { route: 0, hop: 2 })
        );
        assert_eq!(
            draft.apply(DraftEdit::RemoveExpense {
                route: 0,
                expense: 0
            }),
            Err(DraftError::ExpenseOutOfRange {
                route: 0,
                expense: 0
            })
        );
    }

    #[test]
    fn negative_odometer_readings_are_rejected() {
        let mut draft = TripDraft::new();
        assert_eq!(
            draft.apply(DraftEdit::SelectVehicle {
                vehicle_id: Uuid::new_v4(),
                start_km: -10,
                fuel: None,
            }),
            Err(DraftError::NegativeOdometer("start km"))
        );
        assert_eq!(draft.vehicle_id, None);
        assert_eq!(
            draft.apply(DraftEdit::SetStartKm { start_km: -1 }),
            Err(DraftError::NegativeOdometer("start km"))
        );
        assert_eq!(
            draft.apply(DraftEdit::SetEndKm { end_km: -1 }),
            Err(DraftError::NegativeOdometer("end km"))
        );
    }

    #[test]
    fn overflowing_route_amount_is_an_error() {
        let mut draft = TripDraft::new();
        let result = draft.apply(DraftEdit::UpdateRoute {
            route: 0,
            patch: RoutePatch {
                weight: Some(Decimal::MAX),
                rate: Some(Decimal::from(10)),
                ..RoutePatch::default()
            },
        });
        assert_eq!(result, Err(DraftError::Overflow(Overflow("route amount"))));
    }

    #[test]
    fn widest_odometer_range_still_costs() {
        let mut draft = TripDraft::new();
        apply_all(
            &mut draft,
            vec![
                DraftEdit::SelectVehicle {
                    vehicle_id: Uuid::new_v4(),
                    start_km: 0,
                    fuel: Some(VehicleFuelSnapshot {
                        fuel_quantity: Decimal::from(40),
                        rate: Decimal::from(90),
                        total_amount: Decimal::from(3600),
                        average: Decimal::from(10),
                    }),
                },
                DraftEdit::SetEndKm { end_km: i64::MAX },
            ],
        );
        assert!(draft.totals.trip_fuel_quantity > Decimal::ZERO);
    }

    #[test]
    fn edits_deserialize_from_tagged_json() {
        let edit: DraftEdit = serde_json::from_value(serde_json::json!({
            "op": "set_hop_from",
            "route": 0,
            "hop": 1,
            "from": "Nagpur"
        }))
        .unwrap();
        assert_eq!(edit, hop_from(0, 1, "Nagpur"));

        let edit: DraftEdit =
            serde_json::from_value(serde_json::json!({ "op": "set_end_km", "endKm": 420 }))
                .unwrap();
        assert_eq!(edit, DraftEdit::SetEndKm { end_km: 420 });
    }
}
