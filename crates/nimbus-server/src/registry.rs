//! Connection registry: live sessions keyed by session id.
//!
//! Sessions are removed synchronously when their transport closes. Removed
//! ids are remembered so they are never reused by another connection, and
//! a delivery call naming one gets "session not found" instead of silently
//! creating a new session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use nimbus_core::ids::SessionId;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::RegistryError;
use crate::transport::{Transport, TransportKind};

/// Registry entry binding a session id to its transport.
///
/// Immutable once created; the client id is fixed at authentication time.
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// The owned transport.
    pub transport: Arc<dyn Transport>,
    /// Authenticated client (socket sessions only).
    pub client_id: Option<String>,
    /// When the session was registered.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("kind", &self.transport.kind())
            .field("client_id", &self.client_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    live: HashMap<SessionId, Arc<Session>>,
    retired: HashSet<SessionId>,
}

impl RegistryInner {
    fn remove(&mut self, session_id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.live.remove(session_id);
        let _ = self.retired.insert(session_id.clone());
        removed
    }
}

/// Process-wide map of live sessions. Cheap to clone.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `transport` under its session id.
    ///
    /// Installs a close hook so the entry disappears when the transport
    /// closes. A transport that is already closed is removed immediately.
    pub fn register(
        &self,
        transport: Arc<dyn Transport>,
        client_id: Option<String>,
    ) -> Result<Arc<Session>, RegistryError> {
        let session_id = transport.session_id().clone();
        let session = Arc::new(Session {
            session_id: session_id.clone(),
            transport: transport.clone(),
            client_id,
            created_at: Utc::now(),
        });

        {
            let mut inner = self.inner.write();
            if inner.retired.contains(&session_id) {
                return Err(RegistryError::SessionRetired(session_id.into_inner()));
            }
            if inner.live.contains_key(&session_id) {
                return Err(RegistryError::DuplicateSession(session_id.into_inner()));
            }
            let _ = inner.live.insert(session_id.clone(), session.clone());
        }

        // Outside the lock: the hook runs inline if the transport is closed.
        let weak: Weak<RwLock<RegistryInner>> = Arc::downgrade(&self.inner);
        transport.on_close(Box::new(move |id| {
            if let Some(inner) = weak.upgrade() {
                if inner.write().remove(id).is_some() {
                    debug!(session_id = %id, "session removed on close");
                }
            }
        }));

        info!(
            session_id = %session_id,
            kind = %session.transport.kind(),
            client_id = session.client_id.as_deref().unwrap_or("-"),
            "session registered"
        );
        Ok(session)
    }

    /// Transport of a live session.
    pub fn lookup(&self, session_id: &str) -> Option<Arc<dyn Transport>> {
        self.session(session_id).map(|s| s.transport.clone())
    }

    /// Full entry of a live session.
    pub fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.inner
            .read()
            .live
            .get(&SessionId::from(session_id))
            .cloned()
    }

    /// Remove a session without closing its transport. The id is retired.
    pub fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        self.inner.write().remove(&SessionId::from(session_id))
    }

    /// Live sessions authenticated as `client_id`.
    pub fn sessions_for_client(&self, client_id: &str) -> Vec<Arc<Session>> {
        self.inner
            .read()
            .live
            .values()
            .filter(|s| s.client_id.as_deref() == Some(client_id))
            .cloned()
            .collect()
    }

    /// Snapshot of all live sessions.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.read().live.values().cloned().collect()
    }

    /// Number of live sessions of `kind`.
    pub fn count(&self, kind: TransportKind) -> usize {
        self.inner
            .read()
            .live
            .values()
            .filter(|s| s.transport.kind() == kind)
            .count()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().live.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
