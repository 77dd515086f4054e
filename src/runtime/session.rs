//! Conversation memory, keyed by session id.
//!
//! The store is created and owned by the host and handed to the engine; the
//! AI blocks read the history before calling out and append to it after.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Result, common::MemCache};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn user(
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            intent: None,
            at,
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            intent: None,
            at,
        }
    }

    pub fn with_intent(
        mut self,
        intent: &str,
    ) -> Self {
        self.intent = Some(intent.to_string());
        self
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Opens a session; keeps the history if it already exists.
    async fn create(
        &self,
        session_id: &str,
    ) -> Result<()>;

    /// History of a session, oldest first. Unknown sessions have no history.
    async fn get(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionMessage>>;

    async fn append(
        &self,
        session_id: &str,
        message: SessionMessage,
    ) -> Result<()>;

    async fn clear(
        &self,
        session_id: &str,
    ) -> Result<()>;
}

/// Session store kept in process memory.
///
/// Each history keeps at most `history_limit` messages, dropping the oldest.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: MemCache<String, Vec<SessionMessage>>,
    history_limit: usize,
}

impl MemorySessionStore {
    pub fn new(
        capacity: usize,
        history_limit: usize,
    ) -> Self {
        Self {
            sessions: MemCache::new(capacity),
            history_limit: history_limit.max(1),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(10_000, 20)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        session_id: &str,
    ) -> Result<()> {
        let key = session_id.to_string();
        if !self.sessions.contains(&key) {
            trace!(session_id, "session created");
            self.sessions.set(key, Vec::new());
        }
        Ok(())
    }

    async fn get(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionMessage>> {
        Ok(self.sessions.get(&session_id.to_string()).unwrap_or_default())
    }

    async fn append(
        &self,
        session_id: &str,
        message: SessionMessage,
    ) -> Result<()> {
        let key = session_id.to_string();
        let mut history = self.sessions.get(&key).unwrap_or_default();
        history.push(message);
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }
        self.sessions.set(key, history);
        Ok(())
    }

    async fn clear(
        &self,
        session_id: &str,
    ) -> Result<()> {
        self.sessions.remove(&session_id.to_string());
        Ok(())
    }
}
