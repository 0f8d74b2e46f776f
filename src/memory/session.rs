//! Session container types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::Event;

/// A session accumulating event history and cross-run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub session_id: String,
    /// Ordered event log (append-only unless the session is cleared)
    #[serde(default)]
    pub events: Vec<Event>,
    /// Arbitrary key/value state shared across runs
    #[serde(default)]
    pub state: HashMap<String, Value>,
    /// Session creation timestamp (Unix epoch milliseconds)
    pub created_at: u64,
    /// Last update timestamp (Unix epoch milliseconds)
    pub updated_at: u64,
}

impl Session {
    /// Create a new empty session
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
            state: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an event to the session log
    pub fn append_event(&mut self, event: Event) {
        self.events.push(event);
        self.updated_at = now_millis();
    }

    /// Set a state key, overwriting any previous value
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
        self.updated_at = now_millis();
    }

    /// Get the number of events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Get a preview of the last event's content
    pub fn last_event_preview(&self, max_len: usize) -> Option<String> {
        self.events.last().map(|e| {
            if e.content.len() > max_len {
                format!("{}...", &e.content[..max_len])
            } else {
                e.content.clone()
            }
        })
    }

    /// Convert to a session summary
    pub fn to_summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            event_count: self.events.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_event_preview: self.last_event_preview(100),
        }
    }
}

/// Summary of a session returned from list operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique session identifier
    pub session_id: String,
    /// Number of events in the session
    pub event_count: usize,
    /// Session creation timestamp (Unix epoch milliseconds)
    pub created_at: u64,
    /// Last update timestamp (Unix epoch milliseconds)
    pub updated_at: u64,
    /// Optional preview of the last event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_preview: Option<String>,
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
