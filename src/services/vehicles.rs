//! Prefills a trip form from what is already known about a vehicle.
//!
//! Resolution is best-effort: each lookup that fails is logged and treated
//! as "nothing known", so callers always get a usable state back.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain::models::{FuelRecord, StandbyRecord, Trip, VehicleFuelSnapshot},
    infrastructure::{state::AppState, store::StoreError},
};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    pub start_km: i64,
    /// Whole days the vehicle has stood idle since its last trip ended.
    pub standby_days: i64,
    pub on_standby: bool,
    pub fuel: Option<VehicleFuelSnapshot>,
    pub last_destination: Option<String>,
    pub next_available_date: Option<NaiveDate>,
}

pub struct VehicleStateResolver {
    state: Arc<AppState>,
}

impl VehicleStateResolver {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn resolve(&self, vehicle_id: Uuid, today: NaiveDate) -> VehicleState {
        let store = &self.state.store;
        let (trip, standby, fuel) = tokio::join!(
            store.latest_trip_for_vehicle(vehicle_id),
            store.latest_standby(vehicle_id),
            store.latest_fuel_record(vehicle_id),
        );

        derive_vehicle_state(
            best_effort(trip, vehicle_id, "latest trip").as_ref(),
            best_effort(standby, vehicle_id, "latest standby").as_ref(),
            best_effort(fuel, vehicle_id, "latest fuel record").as_ref(),
            today,
        )
    }

    /// Latest fuel snapshot alone, used to re-check fuel at submission.
    pub async fn fuel_snapshot(&self, vehicle_id: Uuid) -> Option<VehicleFuelSnapshot> {
        let fuel = self.state.store.latest_fuel_record(vehicle_id).await;
        best_effort(fuel, vehicle_id, "latest fuel record")
            .as_ref()
            .map(VehicleFuelSnapshot::from)
    }
}

fn best_effort<T>(
    result: Result<Option<T>, StoreError>,
    vehicle_id: Uuid,
    lookup: &'static str,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(%vehicle_id, lookup, error = %err, "vehicle prefill lookup failed");
            None
        }
    }
}

pub fn derive_vehicle_state(
    trip: Option<&Trip>,
    standby: Option<&StandbyRecord>,
    fuel: Option<&FuelRecord>,
    today: NaiveDate,
) -> VehicleState {
    let last_trip_date = trip.and_then(Trip::last_date);
    let standby_date = standby.map(|record| record.standby_date);

    let on_standby = match (standby_date, last_trip_date) {
        (Some(standby), Some(trip)) => standby > trip,
        (Some(_), None) => true,
        _ => false,
    };
    let anchor = if on_standby {
        standby_date
    } else {
        last_trip_date
    };

    VehicleState {
        start_km: trip.map(|trip| trip.end_km).unwrap_or_default(),
        standby_days: last_trip_date
            .map(|date| ((today - date).num_days() - 1).max(0))
            .unwrap_or_default(),
        on_standby,
        fuel: fuel.map(VehicleFuelSnapshot::from),
        last_destination: trip.and_then(Trip::end_location).map(str::to_owned),
        next_available_date: anchor.and_then(|date| date.checked_add_signed(Duration::days(1))),
    }
}
