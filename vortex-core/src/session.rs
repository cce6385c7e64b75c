//! Session state stamped onto every event
//!
//! Identity, tenant, platform and app version are fixed for the lifetime of
//! the process. The session id is the one mutable field: it is regenerated at
//! startup and may be rotated while other threads are tracking.

use std::sync::RwLock;

use chrono::Utc;

use crate::collector::{Event, TrackingData};
use crate::identity::{self, IdentityStore};

/// Per-process session state
#[derive(Debug)]
pub struct SessionState {
    tenant_id: String,
    identity: String,
    platform: String,
    app_version: String,
    session_id: RwLock<String>,
}

impl SessionState {
    /// Build the session for this process.
    ///
    /// Loads (or creates) the persistent identity and generates a fresh
    /// session id. Identity storage problems are absorbed by
    /// [`identity::load_or_create`].
    pub fn initialize(
        tenant_id: impl Into<String>,
        platform: impl Into<String>,
        app_version: impl Into<String>,
        store: &dyn IdentityStore,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            identity: identity::load_or_create(store),
            platform: platform.into(),
            app_version: app_version.into(),
            session_id: RwLock::new(new_session_id()),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Current session id
    pub fn session_id(&self) -> String {
        match self.session_id.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the session id and return the new one.
    ///
    /// Events created before the rotation keep the id they were stamped with.
    pub fn rotate_session(&self) -> String {
        let fresh = new_session_id();
        let mut guard = match self.session_id.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = fresh.clone();
        tracing::debug!(session_id = %fresh, "Session rotated");
        fresh
    }

    /// Stamp a new event with the current session state
    pub fn create_event(&self, name: impl Into<String>, value: String) -> Event {
        Event {
            tenant_id: self.tenant_id.clone(),
            tracking: TrackingData {
                name: name.into(),
                value,
                identity: self.identity.clone(),
                session_id: self.session_id(),
                platform: self.platform.clone(),
                app_version: self.app_version.clone(),
                timestamp: Utc::now(),
            },
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
