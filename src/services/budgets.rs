use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        carry,
        models::{DriverBudget, DriverBudgetSnapshot},
    },
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    validation::requests::positive_amount,
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AllocateBudgetRequest {
    pub driver_id: Uuid,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    pub allocation_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Latest allocation for a driver, with the notice operators see before
/// allocating again.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub budget: Option<DriverBudget>,
    pub snapshot: Option<DriverBudgetSnapshot>,
    pub carry_forward_notice: Option<String>,
}

pub struct DriverBudgetService {
    state: Arc<AppState>,
}

impl DriverBudgetService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Snapshot used to gate trip submission. A failed lookup reads as "no
    /// budget", which blocks the submission.
    pub async fn latest_snapshot(&self, driver_id: Uuid) -> Option<DriverBudgetSnapshot> {
        match self.state.store.latest_budget(driver_id).await {
            Ok(budget) => budget.as_ref().map(DriverBudgetSnapshot::from),
            Err(err) => {
                warn!(%driver_id, error = %err, "driver budget lookup failed");
                None
            }
        }
    }

    pub async fn status(&self, driver_id: Uuid) -> Result<BudgetStatus, ServiceError> {
        let budget = self.state.store.latest_budget(driver_id).await?;
        let snapshot = budget.as_ref().map(DriverBudgetSnapshot::from);
        let carry_forward_notice = snapshot
            .as_ref()
            .and_then(|snapshot| carry::carry_forward_notice(snapshot.remaining_budget_amount));
        Ok(BudgetStatus {
            budget,
            snapshot,
            carry_forward_notice,
        })
    }

    pub async fn allocate(
        &self,
        actor: &AuthenticatedUser,
        payload: AllocateBudgetRequest,
    ) -> Result<DriverBudget, ServiceError> {
        payload.validate()?;
        let now = Utc::now();
        let budget = self
            .state
            .store
            .allocate_budget(DriverBudget {
                id: Uuid::new_v4(),
                driver_id: payload.driver_id,
                allocation_date: payload.allocation_date.unwrap_or_else(|| now.date_naive()),
                amount: payload.amount,
                carried_forward: Decimal::ZERO,
                remaining_amount: payload.amount,
                remarks: payload.remarks,
                created_by: actor.user_id,
                created_at: now,
            })
            .await?;
        info!(
            driver_id = %budget.driver_id,
            amount = %budget.amount,
            carried_forward = %budget.carried_forward,
            "driver budget allocated"
        );
        Ok(budget)
    }
}
