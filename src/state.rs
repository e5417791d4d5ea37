use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::memory::MemoryStore;
use crate::database::store::{PostStore, ProfileStore, UserStore};
use crate::services::profile_service::ProfileService;
use crate::services::user_service::UserService;
use crate::storage::{MemoryStorage, ObjectStorage};

/// Shared application state: configuration, the token service, and the
/// persistence/storage collaborators behind their trait seams.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tokens: TokenService,
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub posts: Arc<dyn PostStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        posts: Arc<dyn PostStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let tokens = TokenService::new(&config.security);
        Self {
            config,
            tokens,
            users,
            profiles,
            posts,
            storage,
        }
    }

    /// State over the in-memory backends. Used by the integration tests and
    /// by local runs without DATABASE_URL.
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            config,
            store.clone(),
            store.clone(),
            store,
            Arc::new(MemoryStorage::new()),
        )
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.users.clone(), self.tokens.clone())
    }

    pub fn profile_service(&self) -> ProfileService {
        ProfileService::new(
            self.users.clone(),
            self.profiles.clone(),
            self.posts.clone(),
            self.storage.clone(),
        )
    }
}
