use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{FleetStore, StoreError};
use crate::domain::{
    carry,
    models::{
        Attendance, DriverBudget, FuelRecord, MasterKind, MasterRecord, StandbyRecord, Trip,
    },
};

#[derive(Default)]
struct Tables {
    master: Vec<MasterRecord>,
    trips: Vec<Trip>,
    fuel: Vec<FuelRecord>,
    budgets: Vec<DriverBudget>,
    standby: Vec<StandbyRecord>,
    attendance: Vec<Attendance>,
}

impl Tables {
    fn latest_budget_mut(&mut self, driver_id: Uuid) -> Option<&mut DriverBudget> {
        self.budgets
            .iter_mut()
            .filter(|budget| budget.driver_id == driver_id)
            .max_by_key(|budget| (budget.allocation_date, budget.created_at))
    }

    fn debit_budget(&mut self, driver_id: Uuid, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        if let Some(budget) = self.latest_budget_mut(driver_id) {
            budget.remaining_amount -= amount;
        }
    }
}

/// Case-insensitive name match with Unicode folding, as `LOWER(name)` does in
/// Postgres.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Process-local store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn list_master(&self, kind: MasterKind) -> Result<Vec<MasterRecord>, StoreError> {
        let tables = self.tables.read();
        let mut records: Vec<_> = tables
            .master
            .iter()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(records)
    }

    async fn find_master_by_name(
        &self,
        kind: MasterKind,
        name: &str,
    ) -> Result<Option<MasterRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .master
            .iter()
            .find(|record| record.kind == kind && same_name(&record.name, name))
            .cloned())
    }

    async fn insert_master(&self, record: MasterRecord) -> Result<MasterRecord, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .master
            .iter()
            .any(|existing| existing.kind == record.kind && same_name(&existing.name, &record.name))
        {
            return Err(StoreError::Duplicate);
        }
        tables.master.push(record.clone());
        Ok(record)
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.trips.iter().find(|trip| trip.id == id).cloned())
    }

    async fn latest_trip_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .trips
            .iter()
            .filter(|trip| trip.vehicle_id == vehicle_id)
            .max_by_key(|trip| (trip.last_date(), trip.created_at))
            .cloned())
    }

    async fn create_trip(&self, trip: Trip) -> Result<Trip, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .trips
            .iter()
            .any(|existing| existing.id == trip.id || existing.trip_number == trip.trip_number)
        {
            return Err(StoreError::Duplicate);
        }
        tables.debit_budget(trip.driver_id, trip.trip_expenses);
        tables.trips.push(trip.clone());
        Ok(trip)
    }

    async fn update_trip(&self, trip: Trip) -> Result<Trip, StoreError> {
        let mut tables = self.tables.write();
        let Some(position) = tables.trips.iter().position(|existing| existing.id == trip.id) else {
            return Err(StoreError::NotFound);
        };
        let previous = tables.trips[position].clone();
        if previous.driver_id == trip.driver_id {
            tables.debit_budget(trip.driver_id, trip.trip_expenses - previous.trip_expenses);
        } else {
            tables.debit_budget(previous.driver_id, -previous.trip_expenses);
            tables.debit_budget(trip.driver_id, trip.trip_expenses);
        }
        tables.trips[position] = trip.clone();
        Ok(trip)
    }

    async fn latest_fuel_record(&self, vehicle_id: Uuid) -> Result<Option<FuelRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .fuel
            .iter()
            .filter(|record| record.vehicle_id == vehicle_id)
            .max_by_key(|record| (record.fill_date, record.created_at))
            .cloned())
    }

    async fn insert_fuel_record(&self, mut record: FuelRecord) -> Result<FuelRecord, StoreError> {
        let mut tables = self.tables.write();
        let prior = tables
            .fuel
            .iter()
            .filter(|existing| existing.vehicle_id == record.vehicle_id)
            .max_by_key(|existing| (existing.fill_date, existing.created_at))
            .map(|existing| existing.fuel_quantity);
        record.fuel_quantity = carry::refuel(prior, record.filled_quantity);
        tables.fuel.push(record.clone());
        Ok(record)
    }

    async fn latest_budget(&self, driver_id: Uuid) -> Result<Option<DriverBudget>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .budgets
            .iter()
            .filter(|budget| budget.driver_id == driver_id)
            .max_by_key(|budget| (budget.allocation_date, budget.created_at))
            .cloned())
    }

    async fn allocate_budget(&self, mut budget: DriverBudget) -> Result<DriverBudget, StoreError> {
        let mut tables = self.tables.write();
        let prior = tables.latest_budget_mut(budget.driver_id);
        let allocation =
            carry::allocate_budget(prior.as_ref().map(|p| p.remaining_amount), budget.amount);
        if let Some(prior) = prior {
            if allocation.carried_forward > Decimal::ZERO {
                prior.remaining_amount = Decimal::ZERO;
            }
        }
        budget.carried_forward = allocation.carried_forward;
        budget.remaining_amount = allocation.remaining_amount;
        tables.budgets.push(budget.clone());
        Ok(budget)
    }

    async fn latest_standby(&self, vehicle_id: Uuid) -> Result<Option<StandbyRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .standby
            .iter()
            .filter(|record| record.vehicle_id == vehicle_id)
            .max_by_key(|record| (record.standby_date, record.created_at))
            .cloned())
    }

    async fn insert_standby(&self, record: StandbyRecord) -> Result<StandbyRecord, StoreError> {
        self.tables.write().standby.push(record.clone());
        Ok(record)
    }

    async fn create_attendance(&self, record: Attendance) -> Result<Attendance, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .attendance
            .iter()
            .any(|existing| existing.driver_id == record.driver_id && existing.date == record.date)
        {
            return Err(StoreError::Duplicate);
        }
        tables.attendance.push(record.clone());
        Ok(record)
    }

    async fn list_attendance(&self, driver_id: Uuid) -> Result<Vec<Attendance>, StoreError> {
        let tables = self.tables.read();
        let mut records: Vec<_> = tables
            .attendance
            .iter()
            .filter(|record| record.driver_id == driver_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.date);
        Ok(records)
    }
}
