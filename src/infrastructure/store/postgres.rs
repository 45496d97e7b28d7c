use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, types::Json, Postgres, Row, Transaction};
use uuid::Uuid;

use super::{FleetStore, StoreError};
use crate::{
    domain::{
        carry,
        models::{
            Attendance, AttendanceStatus, DriverBudget, FuelRecord, MasterKind, MasterRecord,
            StandbyRecord, Trip,
        },
    },
    infrastructure::db::PgPool,
};

/// PostgreSQL provider. Trips are stored as JSONB documents beside the
/// columns needed to find the latest trip per vehicle.
pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn list_master(&self, kind: MasterKind) -> Result<Vec<MasterRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, kind, name, attributes, created_at FROM master_records WHERE kind = $1 ORDER BY LOWER(name)",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(map_master).collect()
    }

    async fn find_master_by_name(
        &self,
        kind: MasterKind,
        name: &str,
    ) -> Result<Option<MasterRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, kind, name, attributes, created_at FROM master_records WHERE kind = $1 AND LOWER(name) = LOWER($2)",
        )
        .bind(kind.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(map_master).transpose()
    }

    async fn insert_master(&self, record: MasterRecord) -> Result<MasterRecord, StoreError> {
        let row = sqlx::query(
            "INSERT INTO master_records (id, kind, name, attributes, created_at)
             VALUES ($1,$2,$3,$4,$5)
             RETURNING id, kind, name, attributes, created_at",
        )
        .bind(record.id)
        .bind(record.kind.as_str())
        .bind(&record.name)
        .bind(&record.attributes)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        map_master(row)
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query("SELECT document FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(map_trip).transpose()
    }

    async fn latest_trip_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT document
            FROM trips
            WHERE vehicle_id = $1
            ORDER BY last_date DESC NULLS LAST, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(map_trip).transpose()
    }

    async fn create_trip(&self, trip: Trip) -> Result<Trip, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query(
            "INSERT INTO trips (id, trip_number, vehicle_id, driver_id, last_date, document, created_by, created_at, updated_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(trip.id)
        .bind(&trip.trip_number)
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.last_date())
        .bind(Json(&trip))
        .bind(trip.created_by)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        debit_budget(&mut tx, trip.driver_id, trip.trip_expenses).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(trip)
    }

    async fn update_trip(&self, trip: Trip) -> Result<Trip, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let previous = sqlx::query("SELECT document FROM trips WHERE id = $1 FOR UPDATE")
            .bind(trip.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .map(map_trip)
            .transpose()?
            .ok_or(StoreError::NotFound)?;

        sqlx::query(
            "UPDATE trips SET vehicle_id=$1, driver_id=$2, last_date=$3, document=$4, updated_at=$5 WHERE id=$6",
        )
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.last_date())
        .bind(Json(&trip))
        .bind(trip.updated_at)
        .bind(trip.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if previous.driver_id == trip.driver_id {
            debit_budget(
                &mut tx,
                trip.driver_id,
                trip.trip_expenses - previous.trip_expenses,
            )
            .await?;
        } else {
            debit_budget(&mut tx, previous.driver_id, -previous.trip_expenses).await?;
            debit_budget(&mut tx, trip.driver_id, trip.trip_expenses).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(trip)
    }

    async fn latest_fuel_record(&self, vehicle_id: Uuid) -> Result<Option<FuelRecord>, StoreError> {
        sqlx::query_as::<_, FuelRecord>(
            r#"
            SELECT id, vehicle_id, fill_date, filled_quantity, fuel_quantity, rate,
                   total_amount, average, created_by, created_at
            FROM fuel_records
            WHERE vehicle_id = $1
            ORDER BY fill_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_fuel_record(&self, record: FuelRecord) -> Result<FuelRecord, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let prior = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT fuel_quantity
            FROM fuel_records
            WHERE vehicle_id = $1
            ORDER BY fill_date DESC, created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(record.vehicle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let inserted = sqlx::query_as::<_, FuelRecord>(
            "INSERT INTO fuel_records (id, vehicle_id, fill_date, filled_quantity, fuel_quantity, rate, total_amount, average, created_by, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
             RETURNING *",
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(record.fill_date)
        .bind(record.filled_quantity)
        .bind(carry::refuel(prior, record.filled_quantity))
        .bind(record.rate)
        .bind(record.total_amount)
        .bind(record.average)
        .bind(record.created_by)
        .bind(record.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(inserted)
    }

    async fn latest_budget(&self, driver_id: Uuid) -> Result<Option<DriverBudget>, StoreError> {
        sqlx::query_as::<_, DriverBudget>(
            r#"
            SELECT id, driver_id, allocation_date, amount, carried_forward, remaining_amount,
                   remarks, created_by, created_at
            FROM driver_budgets
            WHERE driver_id = $1
            ORDER BY allocation_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn allocate_budget(&self, budget: DriverBudget) -> Result<DriverBudget, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let prior: Option<(Uuid, Decimal)> = sqlx::query_as(
            r#"
            SELECT id, remaining_amount
            FROM driver_budgets
            WHERE driver_id = $1
            ORDER BY allocation_date DESC, created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(budget.driver_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let allocation = carry::allocate_budget(prior.map(|(_, remaining)| remaining), budget.amount);
        if let Some((prior_id, _)) = prior {
            if allocation.carried_forward > Decimal::ZERO {
                sqlx::query("UPDATE driver_budgets SET remaining_amount = 0 WHERE id = $1")
                    .bind(prior_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
        }

        let inserted = sqlx::query_as::<_, DriverBudget>(
            "INSERT INTO driver_budgets (id, driver_id, allocation_date, amount, carried_forward, remaining_amount, remarks, created_by, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
             RETURNING *",
        )
        .bind(budget.id)
        .bind(budget.driver_id)
        .bind(budget.allocation_date)
        .bind(budget.amount)
        .bind(allocation.carried_forward)
        .bind(allocation.remaining_amount)
        .bind(&budget.remarks)
        .bind(budget.created_by)
        .bind(budget.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(inserted)
    }

    async fn latest_standby(&self, vehicle_id: Uuid) -> Result<Option<StandbyRecord>, StoreError> {
        sqlx::query_as::<_, StandbyRecord>(
            r#"
            SELECT id, vehicle_id, driver_id, standby_date, remarks, created_by, created_at
            FROM standby_records
            WHERE vehicle_id = $1
            ORDER BY standby_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_standby(&self, record: StandbyRecord) -> Result<StandbyRecord, StoreError> {
        sqlx::query_as::<_, StandbyRecord>(
            "INSERT INTO standby_records (id, vehicle_id, driver_id, standby_date, remarks, created_by, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7)
             RETURNING *",
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(record.driver_id)
        .bind(record.standby_date)
        .bind(&record.remarks)
        .bind(record.created_by)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_attendance(&self, record: Attendance) -> Result<Attendance, StoreError> {
        let row = sqlx::query(
            "INSERT INTO attendance (id, driver_id, attendance_date, status, remarks, trip_id, trip_number, created_by, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
             RETURNING *",
        )
        .bind(record.id)
        .bind(record.driver_id)
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(&record.remarks)
        .bind(record.trip_id)
        .bind(&record.trip_number)
        .bind(record.created_by)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        map_attendance(row)
    }

    async fn list_attendance(&self, driver_id: Uuid) -> Result<Vec<Attendance>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, driver_id, attendance_date, status, remarks, trip_id, trip_number,
                   created_by, created_at
            FROM attendance
            WHERE driver_id = $1
            ORDER BY attendance_date ASC
            "#,
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(map_attendance).collect()
    }
}

async fn debit_budget(
    tx: &mut Transaction<'_, Postgres>,
    driver_id: Uuid,
    amount: Decimal,
) -> Result<(), StoreError> {
    if amount.is_zero() {
        return Ok(());
    }
    sqlx::query(
        r#"
        UPDATE driver_budgets
        SET remaining_amount = remaining_amount - $1
        WHERE id = (
            SELECT id FROM driver_budgets
            WHERE driver_id = $2
            ORDER BY allocation_date DESC, created_at DESC
            LIMIT 1
        )
        "#,
    )
    .bind(amount)
    .bind(driver_id)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

fn map_trip(row: PgRow) -> Result<Trip, StoreError> {
    let Json(trip) = row
        .try_get::<Json<Trip>, _>("document")
        .map_err(map_sqlx_error)?;
    Ok(trip)
}

fn map_master(row: PgRow) -> Result<MasterRecord, StoreError> {
    let kind = row
        .try_get::<String, _>("kind")
        .map_err(map_sqlx_error)?
        .parse::<MasterKind>()
        .map_err(|err| StoreError::Backend(err.to_string()))?;
    Ok(MasterRecord {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        kind,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        attributes: row.try_get("attributes").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
    })
}

fn map_attendance(row: PgRow) -> Result<Attendance, StoreError> {
    let status = row
        .try_get::<String, _>("status")
        .map_err(map_sqlx_error)?
        .parse::<AttendanceStatus>()
        .map_err(|err| StoreError::Backend(err.to_string()))?;
    Ok(Attendance {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        driver_id: row.try_get("driver_id").map_err(map_sqlx_error)?,
        date: row.try_get("attendance_date").map_err(map_sqlx_error)?,
        status,
        remarks: row
            .try_get::<Option<String>, _>("remarks")
            .map_err(map_sqlx_error)?,
        trip_id: row
            .try_get::<Option<Uuid>, _>("trip_id")
            .map_err(map_sqlx_error)?,
        trip_number: row
            .try_get::<Option<String>, _>("trip_number")
            .map_err(map_sqlx_error)?,
        created_by: row.try_get("created_by").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Backend(err.to_string()),
    }
}
