use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::FuelRecord,
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    validation::requests::positive_amount,
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordFuelRequest {
    pub vehicle_id: Uuid,
    pub fill_date: Option<NaiveDate>,
    #[validate(custom = "positive_amount")]
    pub filled_quantity: Decimal,
    #[validate(custom = "positive_amount")]
    pub rate: Decimal,
    /// Kilometres per unit of fuel.
    #[validate(custom = "positive_amount")]
    pub average: Decimal,
}

pub struct FuelService {
    state: Arc<AppState>,
}

impl FuelService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn latest(&self, vehicle_id: Uuid) -> Result<Option<FuelRecord>, ServiceError> {
        Ok(self.state.store.latest_fuel_record(vehicle_id).await?)
    }

    /// Records a fill. Whatever fuel the previous record still held is added
    /// to the new record's on-hand quantity by the store.
    pub async fn record_fill(
        &self,
        actor: &AuthenticatedUser,
        payload: RecordFuelRequest,
    ) -> Result<FuelRecord, ServiceError> {
        payload.validate()?;
        let now = Utc::now();
        let total_amount = payload
            .filled_quantity
            .checked_mul(payload.rate)
            .ok_or_else(|| ServiceError::Validation("fill amount is too large to compute".into()))?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let record = self
            .state
            .store
            .insert_fuel_record(FuelRecord {
                id: Uuid::new_v4(),
                vehicle_id: payload.vehicle_id,
                fill_date: payload.fill_date.unwrap_or_else(|| now.date_naive()),
                filled_quantity: payload.filled_quantity,
                fuel_quantity: payload.filled_quantity,
                rate: payload.rate,
                total_amount,
                average: payload.average,
                created_by: actor.user_id,
                created_at: now,
            })
            .await?;
        info!(
            vehicle_id = %record.vehicle_id,
            filled = %record.filled_quantity,
            on_hand = %record.fuel_quantity,
            "fuel fill recorded"
        );
        Ok(record)
    }
}
