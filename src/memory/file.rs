//! File-based session store

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;

use super::{Session, SessionStore, SessionSummary, SearchQuery, StateMap};
use crate::domain::Event;
use crate::error::{EngineError, EngineResult};

/// File-based session store: one JSON file per session under a base directory.
pub struct FileStore {
    base_path: PathBuf,
    max_events_per_session: usize,
}

impl FileStore {
    /// Create a new file store, creating the base directory if needed
    pub fn new(base_path: impl Into<PathBuf>, max_events_per_session: usize) -> EngineResult<Self> {
        let base_path = base_path.into();

        // Sync create for the constructor
        std::fs::create_dir_all(&base_path)
            .map_err(|e| EngineError::Memory(format!("Failed to create directory: {}", e)))?;

        Ok(Self {
            base_path,
            max_events_per_session,
        })
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", session_id))
    }

    async fn load(&self, session_id: &str) -> EngineResult<Option<Session>> {
        let path = self.session_path(session_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| EngineError::Memory(format!("Failed to read session file: {}", e)))?;

        let session: Session = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> EngineResult<()> {
        let path = self.session_path(&session.session_id);
        let content = serde_json::to_string_pretty(session)?;

        fs::write(&path, content)
            .await
            .map_err(|e| EngineError::Memory(format!("Failed to write session file: {}", e)))?;

        Ok(())
    }

    async fn load_or_new(&self, session_id: &str) -> EngineResult<Session> {
        Ok(self
            .load(session_id)
            .await?
            .unwrap_or_else(|| Session::new(session_id)))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get_state(&self, session_id: &str, key: &str) -> EngineResult<Option<Value>> {
        Ok(self
            .load(session_id)
            .await?
            .and_then(|s| s.state.get(key).cloned()))
    }

    async fn update_state(&self, session_id: &str, key: &str, value: Value) -> EngineResult<()> {
        let mut session = self.load_or_new(session_id).await?;
        session.set_state(key, value);
        self.save(&session).await
    }

    async fn state(&self, session_id: &str) -> EngineResult<StateMap> {
        Ok(self
            .load(session_id)
            .await?
            .map(|s| s.state)
            .unwrap_or_default())
    }

    async fn append_event(&self, event: Event) -> EngineResult<()> {
        let mut session = self.load_or_new(&event.session_id).await?;
        session.append_event(event);

        if session.events.len() > self.max_events_per_session {
            let remove_count = session.events.len() - self.max_events_per_session;
            session.events.drain(0..remove_count);
        }

        self.save(&session).await
    }

    async fn history(&self, session_id: &str) -> EngineResult<Vec<Event>> {
        Ok(self
            .load(session_id)
            .await?
            .map(|s| s.events)
            .unwrap_or_default())
    }

    async fn search(&self, session_id: &str, query: &SearchQuery) -> EngineResult<Vec<Event>> {
        Ok(self
            .load(session_id)
            .await?
            .map(|s| {
                s.events
                    .into_iter()
                    .filter(|e| query.matches(e))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> EngineResult<()> {
        let path = self.session_path(session_id);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| EngineError::Memory(format!("Failed to delete session file: {}", e)))?;
        }

        Ok(())
    }

    async fn list(&self) -> EngineResult<Vec<SessionSummary>> {
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| EngineError::Memory(format!("Failed to read directory: {}", e)))?;

        let mut summaries = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EngineError::Memory(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "json") {
                if let Ok(content) = fs::read_to_string(&path).await {
                    if let Ok(session) = serde_json::from_str::<Session>(&content) {
                        summaries.push(session.to_summary());
                    }
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(summaries)
    }
}
