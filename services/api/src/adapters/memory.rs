//! services/api/src/adapters/memory.rs
//!
//! A process-local `WizardSessionStore`, used when no `DATABASE_URL` is configured
//! and by the integration tests.

use async_trait::async_trait;
use picture_book_core::ports::{PortError, PortResult, WizardSessionStore};
use picture_book_core::session::WizardSession;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, WizardSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Wizard session {} not found", session_id))
}

#[async_trait]
impl WizardSessionStore for InMemorySessionStore {
    async fn create(&self, user_id: i64) -> PortResult<WizardSession> {
        let session = WizardSession::new(user_id);
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn load(&self, session_id: Uuid) -> PortResult<WizardSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn save(&self, session: &WizardSession) -> PortResult<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(())
            }
            None => Err(not_found(session.id)),
        }
    }

    async fn delete(&self, session_id: Uuid) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|_| ())
            .ok_or_else(|| not_found(session_id))
    }
}
