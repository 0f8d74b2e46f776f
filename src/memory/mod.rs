//! Session memory: event history plus cross-run state
//!
//! Provides storage backends for sessions:
//! - In-memory (default, lost on restart)
//! - File-based (one JSON file per session)
//!
//! The engine consumes storage through the [`SessionStore`] trait and the
//! per-run [`SessionContext`] facade, so backends are pluggable.

mod file;
mod in_memory;
mod session;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use session::{Session, SessionSummary};


use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{MemoryBackend, MemorySettings};
use crate::domain::{Event, EventAuthor};
use crate::error::EngineResult;

/// Key/value state attached to a session
pub type StateMap = HashMap<String, Value>;

/// Query forms accepted by [`SessionStore::search`]
#[derive(Debug, Clone)]
pub enum SearchQuery {
    /// Case-insensitive substring match over event content
    Content(String),
    /// Match events produced by a specific author
    Author(EventAuthor),
    /// Match events whose serialized fields contain all given key/value pairs
    Fields(serde_json::Map<String, Value>),
}

impl SearchQuery {
    /// Whether an event satisfies this query
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            SearchQuery::Content(needle) => event
                .content
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            SearchQuery::Author(author) => event.author == *author,
            SearchQuery::Fields(fields) => {
                let value = match serde_json::to_value(event) {
                    Ok(v) => v,
                    Err(_) => return false,
                };
                fields
                    .iter()
                    .all(|(key, expected)| value.get(key) == Some(expected))
            }
        }
    }
}

/// Trait for session storage backends.
///
/// Sessions are created lazily on first write; reads against a session that
/// does not exist yet return empty defaults rather than errors. Backends must
/// support concurrent access from many agent instances.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a single state value
    async fn get_state(&self, session_id: &str, key: &str) -> EngineResult<Option<Value>>;

    /// Set a state value, creating the session if needed
    async fn update_state(&self, session_id: &str, key: &str, value: Value) -> EngineResult<()>;

    /// Snapshot the full state map for a session
    async fn state(&self, session_id: &str) -> EngineResult<StateMap>;

    /// Append an event to a session's log, creating the session if needed
    async fn append_event(&self, event: Event) -> EngineResult<()>;

    /// Get a session's event log in time order
    async fn history(&self, session_id: &str) -> EngineResult<Vec<Event>>;

    /// Find events in a session matching a query
    async fn search(&self, session_id: &str, query: &SearchQuery) -> EngineResult<Vec<Event>>;

    /// Remove a session entirely (events and state)
    async fn clear(&self, session_id: &str) -> EngineResult<()>;

    /// List stored sessions, most recently updated first
    async fn list(&self) -> EngineResult<Vec<SessionSummary>>;
}

/// Create a session store from configuration
pub fn create_store(settings: &MemorySettings) -> EngineResult<Arc<dyn SessionStore>> {
    match settings.backend {
        MemoryBackend::InMemory => Ok(Arc::new(InMemoryStore::new(settings.max_events))),
        MemoryBackend::File => {
            let path = settings
                .file_path
                .clone()
                .unwrap_or_else(|| "data/sessions".to_string());
            Ok(Arc::new(FileStore::new(path, settings.max_events)?))
        }
    }
}

/// Per-run view of one session.
///
/// Holds a working copy of the session's state map loaded at run start; state
/// updates write through to the store so they are visible both to later steps
/// in the same run and to future runs against the same session.
#[derive(Clone)]
pub struct SessionContext {
    session_id: String,
    invocation_id: String,
    state: StateMap,
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    /// Load a session view, snapshotting its current state map
    pub async fn load(
        store: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
        invocation_id: impl Into<String>,
    ) -> EngineResult<Self> {
        let session_id = session_id.into();
        let state = store.state(&session_id).await?;
        Ok(Self {
            session_id,
            invocation_id: invocation_id.into(),
            state,
            store,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// The working state map as of the last merge
    pub fn state(&self) -> &StateMap {
        &self.state
    }

    /// Merge state updates (shallow key overwrite), writing through to the
    /// store before returning
    pub async fn merge_state(
        &mut self,
        updates: serde_json::Map<String, Value>,
    ) -> EngineResult<()> {
        for (key, value) in updates {
            self.store
                .update_state(&self.session_id, &key, value.clone())
                .await?;
            self.state.insert(key, value);
        }
        Ok(())
    }

    /// Start an event pre-tagged with this run's session and invocation ids
    pub fn event(&self, author: EventAuthor) -> Event {
        Event::new(&self.session_id, author).with_invocation(&self.invocation_id)
    }

    pub async fn append_event(&self, event: Event) -> EngineResult<()> {
        self.store.append_event(event).await
    }

    pub async fn history(&self) -> EngineResult<Vec<Event>> {
        self.store.history(&self.session_id).await
    }
}
