use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{Attendance, AttendanceStatus, StandbyRecord},
    infrastructure::{auth::AuthenticatedUser, state::AppState, store::StoreError},
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStandbyRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub standby_date: NaiveDate,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

pub struct StandbyService {
    state: Arc<AppState>,
}

impl StandbyService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn latest(&self, vehicle_id: Uuid) -> Result<Option<StandbyRecord>, ServiceError> {
        Ok(self.state.store.latest_standby(vehicle_id).await?)
    }

    /// Records a standby day. When a driver is named, their attendance for
    /// the day is also recorded; that write never fails the standby.
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        payload: CreateStandbyRequest,
    ) -> Result<StandbyRecord, ServiceError> {
        payload.validate()?;
        let now = Utc::now();
        let record = self
            .state
            .store
            .insert_standby(StandbyRecord {
                id: Uuid::new_v4(),
                vehicle_id: payload.vehicle_id,
                driver_id: payload.driver_id,
                standby_date: payload.standby_date,
                remarks: payload.remarks,
                created_by: actor.user_id,
                created_at: now,
            })
            .await?;
        info!(
            vehicle_id = %record.vehicle_id,
            date = %record.standby_date,
            "standby recorded"
        );

        if let Some(driver_id) = record.driver_id {
            let attendance = Attendance {
                id: Uuid::new_v4(),
                driver_id,
                date: record.standby_date,
                status: AttendanceStatus::Present,
                remarks: Some(self.state.config.workflow.standby_remark.clone()),
                trip_id: None,
                trip_number: None,
                created_by: actor.user_id,
                created_at: now,
            };
            match self.state.store.create_attendance(attendance).await {
                Ok(_) | Err(StoreError::Duplicate) => {}
                Err(err) => {
                    warn!(%driver_id, error = %err, "standby attendance could not be recorded");
                }
            }
        }

        Ok(record)
    }
}
