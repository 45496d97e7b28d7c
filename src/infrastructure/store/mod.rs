//! The backing-store seam. Services depend on [`FleetStore`] only; the
//! provider is chosen from configuration at startup.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::models::{
        Attendance, DriverBudget, FuelRecord, MasterKind, MasterRecord, StandbyRecord, Trip,
    },
    infrastructure::{config::Config, db},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgFleetStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Duplicate,
    #[error("store error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn list_master(&self, kind: MasterKind) -> Result<Vec<MasterRecord>, StoreError>;
    async fn find_master_by_name(
        &self,
        kind: MasterKind,
        name: &str,
    ) -> Result<Option<MasterRecord>, StoreError>;
    /// Names are unique per kind, ignoring case.
    async fn insert_master(&self, record: MasterRecord) -> Result<MasterRecord, StoreError>;

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;
    async fn latest_trip_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Trip>, StoreError>;
    /// Persists a new trip and debits its expenses from the driver's latest
    /// budget allocation in one atomic step.
    async fn create_trip(&self, trip: Trip) -> Result<Trip, StoreError>;
    /// Replaces a trip wholesale, moving the budget debit by the change in
    /// trip expenses.
    async fn update_trip(&self, trip: Trip) -> Result<Trip, StoreError>;

    async fn latest_fuel_record(&self, vehicle_id: Uuid) -> Result<Option<FuelRecord>, StoreError>;
    /// Records a fill. `fuel_quantity` is recomputed to include the fuel left
    /// over from the previous record.
    async fn insert_fuel_record(&self, record: FuelRecord) -> Result<FuelRecord, StoreError>;

    async fn latest_budget(&self, driver_id: Uuid) -> Result<Option<DriverBudget>, StoreError>;
    /// Records an allocation, carrying the previous allocation's unspent
    /// remainder into it.
    async fn allocate_budget(&self, budget: DriverBudget) -> Result<DriverBudget, StoreError>;

    async fn latest_standby(&self, vehicle_id: Uuid) -> Result<Option<StandbyRecord>, StoreError>;
    async fn insert_standby(&self, record: StandbyRecord) -> Result<StandbyRecord, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the driver already has an
    /// attendance record for that date.
    async fn create_attendance(&self, record: Attendance) -> Result<Attendance, StoreError>;
    async fn list_attendance(&self, driver_id: Uuid) -> Result<Vec<Attendance>, StoreError>;
}

pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn FleetStore>> {
    match config.store.provider.as_str() {
        "postgres" => {
            let pool = db::connect(&config.database).await?;
            db::run_migrations(&pool).await?;
            info!("database migrations completed successfully");
            Ok(Arc::new(PgFleetStore::new(pool)))
        }
        "memory" => Ok(Arc::new(MemoryStore::default())),
        other => anyhow::bail!("unsupported store provider: {other}"),
    }
}
