//! Trip submission: refresh snapshots, validate, persist, then fan out
//! attendance for a newly created trip.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        draft::{DraftError, TripDraft},
        models::{DriverBudgetSnapshot, Trip},
    },
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    validation::rules::{validate_date_span, validate_submission, SubmissionBlock},
};

use super::{
    attendance::{record_trip_attendance, AttendanceReport},
    budgets::DriverBudgetService,
    errors::ServiceError,
    vehicles::VehicleStateResolver,
};

#[derive(Debug)]
pub enum SubmissionOutcome {
    Persisted {
        trip: Trip,
        /// Present for newly created trips only.
        attendance: Option<AttendanceReport>,
    },
    Blocked {
        reason: SubmissionBlock,
        draft: TripDraft,
    },
}

const TRIP_NUMBER_DIGITS: usize = 12;

/// Human-readable trip reference derived from the trip id.
pub fn trip_number(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("TRP-{}", hex[..TRIP_NUMBER_DIGITS].to_uppercase())
}

pub struct SubmissionService {
    state: Arc<AppState>,
}

impl SubmissionService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        mut draft: TripDraft,
    ) -> Result<SubmissionOutcome, ServiceError> {
        let checked = self
            .refresh_snapshots(&mut draft)
            .await
            .and_then(|()| self.validate(&draft));
        if let Err(reason) = checked {
            return Ok(self.blocked(reason, draft));
        }

        let id = Uuid::new_v4();
        let trip = draft
            .to_trip(id, trip_number(id), actor.user_id, Utc::now())
            .ok_or_else(|| ServiceError::Validation("select a driver and a vehicle".into()))?;
        let trip = self.state.store.create_trip(trip).await?;
        info!(
            trip_id = %trip.id,
            trip_number = %trip.trip_number,
            vehicle_id = %trip.vehicle_id,
            driver_id = %trip.driver_id,
            remaining_amount = %trip.remaining_amount,
            "trip created"
        );

        let report = record_trip_attendance(
            self.state.store.as_ref(),
            &trip,
            &self.state.config.workflow.attendance_remark,
            actor.user_id,
        )
        .await;

        Ok(SubmissionOutcome::Persisted {
            trip,
            attendance: Some(report),
        })
    }

    /// Replaces an existing trip wholesale. The budget check credits back what
    /// the stored version already debited from the same driver.
    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        mut draft: TripDraft,
    ) -> Result<SubmissionOutcome, ServiceError> {
        let previous = self
            .state
            .store
            .get_trip(id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let checked = self.refresh_snapshots(&mut draft).await.and_then(|()| {
            if draft.driver_id == Some(previous.driver_id) {
                draft.budget = credit_previous_expenses(draft.budget.take(), previous.trip_expenses);
            }
            self.validate(&draft)
        });
        if let Err(reason) = checked {
            return Ok(self.blocked(reason, draft));
        }

        let mut trip = draft
            .to_trip(id, previous.trip_number.clone(), previous.created_by, Utc::now())
            .ok_or_else(|| ServiceError::Validation("select a driver and a vehicle".into()))?;
        trip.created_at = previous.created_at;
        let trip = self.state.store.update_trip(trip).await?;
        info!(
            trip_id = %trip.id,
            updated_by = %actor.user_id,
            remaining_amount = %trip.remaining_amount,
            "trip updated"
        );

        Ok(SubmissionOutcome::Persisted {
            trip,
            attendance: None,
        })
    }

    /// Replaces client-supplied fuel and budget snapshots with the stored
    /// ones and recomputes the draft.
    async fn refresh_snapshots(&self, draft: &mut TripDraft) -> Result<(), SubmissionBlock> {
        if let Some(vehicle_id) = draft.vehicle_id {
            draft.fuel = VehicleStateResolver::new(self.state.clone())
                .fuel_snapshot(vehicle_id)
                .await;
        }
        if let Some(driver_id) = draft.driver_id {
            draft.budget = DriverBudgetService::new(self.state.clone())
                .latest_snapshot(driver_id)
                .await;
        }
        draft.recompute().map_err(draft_block)
    }

    fn validate(&self, draft: &TripDraft) -> Result<(), SubmissionBlock> {
        validate_date_span(draft, self.state.config.workflow.max_trip_days)?;
        validate_submission(draft)
    }

    fn blocked(&self, reason: SubmissionBlock, mut draft: TripDraft) -> SubmissionOutcome {
        if matches!(reason, SubmissionBlock::Fuel { .. }) {
            if let Err(err) = draft.reset_end_km() {
                warn!(error = %err, "could not recompute draft after clearing end km");
            }
        }
        warn!(reason = %reason, "trip submission blocked");
        SubmissionOutcome::Blocked { reason, draft }
    }
}

fn draft_block(err: DraftError) -> SubmissionBlock {
    SubmissionBlock::fields(err.to_string())
}

fn credit_previous_expenses(
    budget: Option<DriverBudgetSnapshot>,
    previous_expenses: rust_decimal::Decimal,
) -> Option<DriverBudgetSnapshot> {
    budget.map(|snapshot| DriverBudgetSnapshot {
        remaining_budget_amount: snapshot
            .remaining_budget_amount
            .saturating_add(previous_expenses),
        ..snapshot
    })
}
