use std::sync::Arc;

use reflect_core::model::{Preferences, UserId};
use storage::repository::PreferencesRepository;

use crate::api_client::ApiClient;
use crate::error::PreferencesError;

/// Loads and saves local UI preferences.
///
/// Dark mode is written locally first and then mirrored to the backend on a
/// best-effort basis; the local value wins if the mirror fails.
#[derive(Clone)]
pub struct PreferencesService {
    repo: Arc<dyn PreferencesRepository>,
    api: Option<Arc<ApiClient>>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(repo: Arc<dyn PreferencesRepository>) -> Self {
        Self { repo, api: None }
    }

    /// Attach an API client for mirroring settings to the backend.
    #[must_use]
    pub fn with_api(mut self, api: Arc<ApiClient>) -> Self {
        self.api = Some(api);
        self
    }

    /// Load persisted preferences (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError` on storage failures.
    pub async fn load(&self) -> Result<Preferences, PreferencesError> {
        let prefs = self.repo.get_preferences().await?;
        Ok(prefs.unwrap_or_default())
    }

    /// Persist the dark-mode flag and mirror it to the backend.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError` if local persistence fails; a failed
    /// backend mirror is logged and ignored.
    pub async fn set_dark_mode(&self, enabled: bool) -> Result<Preferences, PreferencesError> {
        let prefs = self.load().await?.with_dark_mode(enabled);
        self.repo.save_preferences(&prefs).await?;

        if let Some(api) = &self.api {
            if let Err(err) = api.update_settings(enabled).await {
                tracing::warn!(error = %err, "dark mode mirror to backend failed");
            }
        }
        Ok(prefs)
    }

    /// Persist the guest user id captured from the backend.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError` on storage failures.
    pub async fn remember_guest_user(&self, id: UserId) -> Result<Preferences, PreferencesError> {
        let prefs = self.load().await?.with_guest_user_id(id);
        self.repo.save_preferences(&prefs).await?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;

    #[tokio::test]
    async fn load_defaults_when_nothing_persisted() {
        let service = PreferencesService::new(Arc::new(InMemoryStore::new()));
        let prefs = service.load().await.unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[tokio::test]
    async fn dark_mode_round_trips_without_backend() {
        let service = PreferencesService::new(Arc::new(InMemoryStore::new()));
        service.set_dark_mode(true).await.unwrap();
        let prefs = service.load().await.unwrap();
        assert!(prefs.dark_mode);
    }

    #[tokio::test]
    async fn guest_id_survives_dark_mode_update() {
        let service = PreferencesService::new(Arc::new(InMemoryStore::new()));
        service.remember_guest_user(UserId::new(3)).await.unwrap();
        service.set_dark_mode(true).await.unwrap();

        let prefs = service.load().await.unwrap();
        assert_eq!(prefs.guest_user_id, Some(UserId::new(3)));
        assert!(prefs.dark_mode);
    }
}
