//! Process-wide set of live sessions
//!
//! The registry owns nothing but delivery handles: each session registers its
//! outbound queue sender on connect and is removed on disconnect or on the
//! first failed send during a broadcast pass. Iteration is always over a
//! snapshot so concurrent connect/disconnect cannot invalidate it.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use super::protocol::Outbound;

/// Live-session registry keyed by session id
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<HashMap<Uuid, mpsc::Sender<Outbound>>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's delivery handle
    pub async fn add(&self, id: Uuid, tx: mpsc::Sender<Outbound>) {
        self.sessions.write().await.insert(id, tx);
        tracing::debug!(session = %id, "session registered");
    }

    /// Remove a session; returns whether it was present
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session = %id, "session removed");
        }
        removed
    }

    /// Snapshot of all current members for safe iteration
    pub async fn snapshot(&self) -> Vec<(Uuid, mpsc::Sender<Outbound>)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are connected
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
