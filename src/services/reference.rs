//! Master data behind the trip form's dropdowns.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{MasterKind, MasterRecord},
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    validation::requests::not_blank,
};

use super::errors::ServiceError;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub drivers: Vec<MasterRecord>,
    pub vehicles: Vec<MasterRecord>,
    pub customers: Vec<MasterRecord>,
    pub banks: Vec<MasterRecord>,
    pub app_users: Vec<MasterRecord>,
    pub locations: Vec<MasterRecord>,
    pub products: Vec<MasterRecord>,
    pub expense_categories: Vec<MasterRecord>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMasterRequest {
    #[validate(length(max = 200), custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

pub struct ReferenceService {
    state: Arc<AppState>,
}

impl ReferenceService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Loads every list in parallel. Any failing list fails the whole load.
    pub async fn load(&self) -> Result<ReferenceData, ServiceError> {
        let store = &self.state.store;
        let (
            drivers,
            vehicles,
            customers,
            banks,
            app_users,
            locations,
            products,
            expense_categories,
        ) = tokio::try_join!(
            store.list_master(MasterKind::Driver),
            store.list_master(MasterKind::Vehicle),
            store.list_master(MasterKind::Customer),
            store.list_master(MasterKind::Bank),
            store.list_master(MasterKind::AppUser),
            store.list_master(MasterKind::Location),
            store.list_master(MasterKind::Product),
            store.list_master(MasterKind::ExpenseCategory),
        )?;
        Ok(ReferenceData {
            drivers,
            vehicles,
            customers,
            banks,
            app_users,
            locations,
            products,
            expense_categories,
        })
    }

    /// Creates a record from within the trip form. Only the kinds the form
    /// may extend are accepted.
    pub async fn create_inline(
        &self,
        actor: &AuthenticatedUser,
        kind: MasterKind,
        payload: CreateMasterRequest,
    ) -> Result<MasterRecord, ServiceError> {
        if !kind.creatable_inline() {
            return Err(ServiceError::Forbidden);
        }
        payload.validate()?;
        let attributes = if payload.attributes.is_null() {
            serde_json::json!({})
        } else {
            payload.attributes
        };
        let record = self
            .state
            .store
            .insert_master(MasterRecord {
                id: Uuid::new_v4(),
                kind,
                name: payload.name.trim().to_owned(),
                attributes,
                created_at: Utc::now(),
            })
            .await?;
        info!(
            kind = kind.as_str(),
            id = %record.id,
            created_by = %actor.user_id,
            "master record created"
        );
        Ok(record)
    }
}
