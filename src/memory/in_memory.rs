//! In-memory session store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Session, SessionStore, SessionSummary, SearchQuery, StateMap};
use crate::domain::Event;
use crate::error::EngineResult;

/// In-memory session store. Sessions are created lazily on first write and
/// lost on process exit.
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_events_per_session: usize,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new(max_events_per_session: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_events_per_session,
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_state(&self, session_id: &str, key: &str) -> EngineResult<Option<Value>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|s| s.state.get(key).cloned()))
    }

    async fn update_state(&self, session_id: &str, key: &str, value: Value) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id));
        session.set_state(key, value);
        Ok(())
    }

    async fn state(&self, session_id: &str) -> EngineResult<StateMap> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|s| s.state.clone())
            .unwrap_or_default())
    }

    async fn append_event(&self, event: Event) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(event.session_id.clone())
            .or_insert_with(|| Session::new(&event.session_id));
        session.append_event(event);

        // Trim oldest events past the cap
        if session.events.len() > self.max_events_per_session {
            let remove_count = session.events.len() - self.max_events_per_session;
            session.events.drain(0..remove_count);
        }

        Ok(())
    }

    async fn history(&self, session_id: &str) -> EngineResult<Vec<Event>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|s| s.events.clone())
            .unwrap_or_default())
    }

    async fn search(&self, session_id: &str, query: &SearchQuery) -> EngineResult<Vec<Event>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|s| {
                s.events
                    .iter()
                    .filter(|e| query.matches(e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }

    async fn list(&self) -> EngineResult<Vec<SessionSummary>> {
        let sessions = self.sessions.read().await;

        let mut summaries: Vec<SessionSummary> =
            sessions.values().map(|s| s.to_summary()).collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(summaries)
    }
}
