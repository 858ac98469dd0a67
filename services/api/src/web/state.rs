//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use boardvision_core::gateway::AiGateway;
use boardvision_core::ports::KeyValueStore;
use boardvision_core::review::ReviewSession;
use boardvision_core::session::SessionStore;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Handlers never hold `session` across a call to `gateway`; the in-progress
/// flags inside the store guard against a second submission instead.
pub struct AppState {
    pub gateway: AiGateway,
    pub session: Mutex<SessionStore>,
    /// The flashcard review in progress, if any.
    pub review: Mutex<Option<ReviewSession>>,
}

impl AppState {
    /// Loads the persisted session from `store` and wires up the gateway.
    pub async fn load(gateway: AiGateway, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            gateway,
            session: Mutex::new(SessionStore::load(store).await),
            review: Mutex::new(None),
        }
    }
}
