use std::sync::Arc;

use crate::infrastructure::{auth::JwtKeys, config::Config, store::FleetStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn FleetStore>,
    pub jwt_keys: JwtKeys,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn FleetStore>) -> Self {
        let jwt_keys = JwtKeys::new(&config.auth.jwt_secret);
        Self {
            config,
            store,
            jwt_keys,
        }
    }
}
