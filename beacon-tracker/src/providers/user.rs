//! Login identity, location, and general properties.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use beacon_core::errors::StorageError;
use beacon_storage::PersistentCounters;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub user_id: Option<String>,
    pub user_key: Option<String>,
    pub location: Option<(f64, f64)>,
    /// Attached to every `Custom` event that does not set the key itself.
    pub general_props: BTreeMap<String, String>,
}

pub struct UserProvider {
    state: RwLock<Arc<UserState>>,
}

impl UserProvider {
    pub fn load(counters: &PersistentCounters) -> Result<Self, StorageError> {
        let state = UserState {
            user_id: counters.user_id()?,
            user_key: counters.user_key()?,
            ..UserState::default()
        };
        Ok(Self {
            state: RwLock::new(Arc::new(state)),
        })
    }

    pub fn current(&self) -> Arc<UserState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy-on-write update; readers keep the snapshot they already hold.
    pub fn update(&self, f: impl FnOnce(&mut UserState)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        f(&mut next);
        *guard = Arc::new(next);
    }
}
