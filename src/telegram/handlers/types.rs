//! Handler types, dependencies, and user registration helpers

use chrono::Utc;
use std::sync::Arc;
use teloxide::types::User;

use crate::core::state::SharedState;
use crate::download::orchestrator::DownloadOrchestrator;
use crate::storage::store::UserIdentity;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub state: SharedState,
    pub orchestrator: Arc<DownloadOrchestrator>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(state: SharedState, orchestrator: Arc<DownloadOrchestrator>) -> Self {
        Self { state, orchestrator }
    }
}

/// Converts a Telegram user into the store's identity type
pub fn identity_of(user: &User) -> Option<UserIdentity> {
    let id = i64::try_from(user.id.0).ok()?;
    Some(UserIdentity {
        id,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    })
}

/// Registers the sender on first contact; failures are only logged.
pub async fn register_user(deps: &HandlerDeps, identity: &UserIdentity) {
    let mut state = deps.state.lock().await;
    if let Err(e) = state.store.register_user(identity, Utc::now()) {
        log::error!("Failed to register user {}: {}", identity.id, e);
    }
}
