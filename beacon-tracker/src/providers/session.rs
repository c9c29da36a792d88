//! Session id and foreground/background state.

use std::sync::{Arc, PoisonError, RwLock};

use beacon_core::errors::StorageError;
use beacon_core::event::AppState;
use beacon_storage::PersistentCounters;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: String,
    pub app_state: AppState,
}

pub struct SessionProvider {
    state: RwLock<Arc<SessionState>>,
}

impl SessionProvider {
    /// Adopt the stored session id, creating one on first run.
    pub fn load(counters: &PersistentCounters) -> Result<Self, StorageError> {
        let session_id = counters.session_id_or_init(new_session_id)?;
        Ok(Self {
            state: RwLock::new(Arc::new(SessionState {
                session_id,
                app_state: AppState::Background,
            })),
        })
    }

    pub fn current(&self) -> Arc<SessionState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new session. The next event is preceded by a `Visit`.
    pub fn refresh(&self, counters: &PersistentCounters) -> Result<String, StorageError> {
        let session_id = new_session_id();
        counters.set_session_id(&session_id)?;
        counters.set_visit_sent(false)?;
        self.publish(|s| s.session_id = session_id.clone());
        info!(session_id = %session_id, "session refreshed");
        Ok(session_id)
    }

    pub fn set_app_state(&self, app_state: AppState) {
        self.publish(|s| s.app_state = app_state);
    }

    fn publish(&self, f: impl FnOnce(&mut SessionState)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        f(&mut next);
        *guard = Arc::new(next);
    }
}

pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
