use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Draft => "draft",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    BankTransfer,
    Cheque,
    Credit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    OnTrip,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::OnTrip => "on_trip",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "on_trip" => Ok(AttendanceStatus::OnTrip),
            _ => Err(ParseEnumError::new("attendance status", value)),
        }
    }
}

/// Kinds of master data the trip form references.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MasterKind {
    Driver,
    Vehicle,
    Customer,
    Bank,
    AppUser,
    Location,
    Product,
    ExpenseCategory,
}

impl MasterKind {
    pub const ALL: [MasterKind; 8] = [
        MasterKind::Driver,
        MasterKind::Vehicle,
        MasterKind::Customer,
        MasterKind::Bank,
        MasterKind::AppUser,
        MasterKind::Location,
        MasterKind::Product,
        MasterKind::ExpenseCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasterKind::Driver => "driver",
            MasterKind::Vehicle => "vehicle",
            MasterKind::Customer => "customer",
            MasterKind::Bank => "bank",
            MasterKind::AppUser => "app_user",
            MasterKind::Location => "location",
            MasterKind::Product => "product",
            MasterKind::ExpenseCategory => "expense_category",
        }
    }

    /// Kinds that may be created from within the trip form. Drivers, vehicles,
    /// banks and app users are owned by their own modules.
    pub fn creatable_inline(&self) -> bool {
        matches!(
            self,
            MasterKind::Customer
                | MasterKind::Location
                | MasterKind::Product
                | MasterKind::ExpenseCategory
        )
    }
}

impl FromStr for MasterKind {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        MasterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("master kind", value))
    }
}

#[derive(Debug, Clone)]
pub struct ParseEnumError {
    what: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} value: {}", self.what, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// One `{from, to, status}` segment of a route's location chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationHop {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub status: RouteStatus,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub category: String,
    pub amount: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub total: Decimal,
    pub description: Option<String>,
}

/// One leg of a trip with its own customer, product, pricing and expenses.
///
/// `start_location`, `end_location`, `route_amount` and `total_expense` are
/// derived and overwritten whenever the route is recomputed.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteBreakdown {
    pub sequence: u32,
    #[serde(default)]
    pub hops: Vec<LocationHop>,
    #[serde(default)]
    pub start_location: String,
    #[serde(default)]
    pub end_location: String,
    pub customer_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    pub route_amount: Decimal,
    #[serde(default)]
    pub advance_amount: Decimal,
    pub payment_type: Option<PaymentType>,
    pub bank_id: Option<Uuid>,
    pub app_user_id: Option<Uuid>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub total_expense: Decimal,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub status: RouteStatus,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub trip_number: String,
    pub dates: Vec<NaiveDate>,
    pub start_km: i64,
    pub end_km: i64,
    pub total_km: i64,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: TripStatus,
    pub remarks: Option<String>,
    pub routes: Vec<RouteBreakdown>,
    pub trip_route_cost: Decimal,
    pub trip_expenses: Decimal,
    pub trip_diesel_cost: Decimal,
    pub trip_fuel_quantity: Decimal,
    pub remaining_amount: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Latest date the trip touches, across its own dates and every route.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates
            .iter()
            .chain(self.routes.iter().flat_map(|route| route.dates.iter()))
            .copied()
            .max()
    }

    /// First and last day the trip covers. See [`date_bounds`].
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        date_bounds(&self.routes, &self.dates)
    }

    pub fn end_location(&self) -> Option<&str> {
        self.routes
            .last()
            .map(|route| route.end_location.as_str())
            .filter(|location| !location.is_empty())
    }
}

/// Earliest and latest route date, falling back to the trip-level dates when
/// no route carries any.
pub fn date_bounds(
    routes: &[RouteBreakdown],
    dates: &[NaiveDate],
) -> Option<(NaiveDate, NaiveDate)> {
    let route_dates: Vec<NaiveDate> = routes
        .iter()
        .flat_map(|route| route.dates.iter().copied())
        .collect();
    let source = if route_dates.is_empty() {
        dates
    } else {
        route_dates.as_slice()
    };
    Some((*source.iter().min()?, *source.iter().max()?))
}

/// Latest fuel-tracking figures for a vehicle, as used by trip costing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFuelSnapshot {
    pub fuel_quantity: Decimal,
    pub rate: Decimal,
    pub total_amount: Decimal,
    /// Kilometres per fuel unit.
    pub average: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FuelRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub fill_date: NaiveDate,
    pub filled_quantity: Decimal,
    pub fuel_quantity: Decimal,
    pub rate: Decimal,
    pub total_amount: Decimal,
    pub average: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&FuelRecord> for VehicleFuelSnapshot {
    fn from(record: &FuelRecord) -> Self {
        Self {
            fuel_quantity: record.fuel_quantity,
            rate: record.rate,
            total_amount: record.total_amount,
            average: record.average,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverBudget {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub allocation_date: NaiveDate,
    pub amount: Decimal,
    pub carried_forward: Decimal,
    pub remaining_amount: Decimal,
    pub remarks: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverBudgetSnapshot {
    pub remaining_budget_amount: Decimal,
    pub allocation_date: NaiveDate,
}

impl From<&DriverBudget> for DriverBudgetSnapshot {
    fn from(budget: &DriverBudget) -> Self {
        Self {
            remaining_budget_amount: budget.remaining_amount,
            allocation_date: budget.allocation_date,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StandbyRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub standby_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub trip_id: Option<Uuid>,
    pub trip_number: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterRecord {
    pub id: Uuid,
    pub kind: MasterKind,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_kind_parses_path_segments() {
        assert_eq!(
            "expense-category".parse::<MasterKind>().unwrap(),
            MasterKind::ExpenseCategory
        );
        assert_eq!("Customer".parse::<MasterKind>().unwrap(), MasterKind::Customer);
        assert!("mechanic".parse::<MasterKind>().is_err());
    }

    #[test]
    fn only_form_owned_kinds_are_creatable_inline() {
        let inline: Vec<_> = MasterKind::ALL
            .into_iter()
            .filter(MasterKind::creatable_inline)
            .collect();
        assert_eq!(
            inline,
            vec![
                MasterKind::Customer,
                MasterKind::Location,
                MasterKind::Product,
                MasterKind::ExpenseCategory
            ]
        );
    }

    #[test]
    fn last_date_spans_trip_and_route_dates() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let trip = Trip {
            id: Uuid::new_v4(),
            trip_number: "TRP-1".to_string(),
            dates: vec![day(3)],
            start_km: 0,
            end_km: 10,
            total_km: 10,
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            status: TripStatus::Completed,
            remarks: None,
            routes: vec![RouteBreakdown {
                dates: vec![day(5), day(7)],
                end_location: "Pune".to_string(),
                ..RouteBreakdown::default()
            }],
            trip_route_cost: Decimal::ZERO,
            trip_expenses: Decimal::ZERO,
            trip_diesel_cost: Decimal::ZERO,
            trip_fuel_quantity: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(trip.last_date(), Some(day(7)));
        assert_eq!(trip.end_location(), Some("Pune"));
    }
}
