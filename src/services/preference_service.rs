use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::models::preferences::{Preferences, PreferencesUpdate};
use crate::repository::PreferenceStore;
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Created with defaults on first access.
    pub async fn get(&self, owner_id: &str) -> Result<Preferences> {
        self.store
            .get_or_create_preferences(owner_id, self.clock.now())
            .await
    }

    pub async fn update(&self, owner_id: &str, update: PreferencesUpdate) -> Result<Preferences> {
        let prefs = self
            .store
            .update_preferences(owner_id, update, self.clock.now())
            .await?;
        info!(owner_id, "Preferences updated");
        Ok(prefs)
    }
}
