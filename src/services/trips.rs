use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
    domain::{
        draft::{DraftEdit, DraftError, TripDraft},
        models::Trip,
    },
    infrastructure::state::AppState,
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize)]
pub struct ApplyEditsRequest {
    /// Absent on the first call; a fresh one-route draft is used.
    pub draft: Option<TripDraft>,
    #[serde(default)]
    pub edits: Vec<DraftEdit>,
}

pub struct TripService {
    state: Arc<AppState>,
}

impl TripService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn get(&self, id: Uuid) -> Result<Trip, ServiceError> {
        self.state
            .store
            .get_trip(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> Result<Trip, ServiceError> {
        self.state
            .store
            .latest_trip_for_vehicle(vehicle_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}

/// Runs each edit through the draft reducer in order. The returned draft is
/// fully recomputed even when no edits were given.
pub fn apply_edits(request: ApplyEditsRequest) -> Result<TripDraft, ServiceError> {
    let mut draft = request.draft.unwrap_or_else(TripDraft::new);
    for edit in request.edits {
        draft.apply(edit).map_err(invalid_draft)?;
    }
    draft.recompute().map_err(invalid_draft)?;
    Ok(draft)
}

fn invalid_draft(err: DraftError) -> ServiceError {
    ServiceError::Validation(err.to_string())
}
