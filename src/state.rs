use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::{PasswordHasher, SessionManager, TokenKeys};
use crate::credentials::CredentialStore;
use crate::notify::Notifier;
use crate::store::{InMemoryStore, TaskRepository, UserRepository};
use crate::tasks::TaskService;
use crate::upload::{ImageTranscoder, PngTranscoder};

/// Shared services handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub tasks: TaskService,
    pub notifier: Arc<dyn Notifier>,
    pub transcoder: Arc<dyn ImageTranscoder>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        hasher: Arc<dyn PasswordHasher>,
        keys: TokenKeys,
        notifier: Arc<dyn Notifier>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(users.clone(), tasks.clone(), hasher.clone()),
            sessions: SessionManager::new(users, hasher, keys),
            tasks: TaskService::new(tasks),
            notifier,
            transcoder: Arc::new(PngTranscoder::default()),
            upload_dir,
        }
    }

    /// State over a fresh process-local store.
    pub fn in_memory(
        hasher: Arc<dyn PasswordHasher>,
        keys: TokenKeys,
        notifier: Arc<dyn Notifier>,
        upload_dir: PathBuf,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, hasher, keys, notifier, upload_dir)
    }
}
