//! Session files: one JSON document per conversation.
//!
//! The agent is stateless between turns, so the whole conversation state is
//! written after every turn and read back before the next one.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use procura_agent::ConversationState;
use serde::{Deserialize, Serialize};

/// A saved conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub updated_at: i64,
    pub model: String,
    pub state: ConversationState,
}

impl Session {
    /// A new session with a fresh id
    pub fn new(model: &str, state: ConversationState) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            model: model.to_string(),
            state,
        }
    }

    /// Replace the state after a turn
    pub fn update(&mut self, state: ConversationState) {
        self.state = state;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// Directory-backed session storage
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Get the default sessions directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("procura")
            .join("sessions")
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> io::Result<PathBuf> {
        // Ids are uuids; anything else could point outside the store
        let id = uuid::Uuid::parse_str(id).map_err(|_| {
            io::Error::new(ErrorKind::InvalidInput, format!("Invalid session id: {}", id))
        })?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Write a session, replacing any previous version
    pub fn save(&self, session: &Session) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.id)?;
        let content = serde_json::to_string_pretty(session)?;

        // Write then rename so an interrupted save never leaves half a file
        let tmp = path.with_extension("json.tmp");
        let result = fs::write(&tmp, content).and_then(|()| fs::rename(&tmp, &path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    /// Load a session by id
    pub fn load(&self, id: &str) -> io::Result<Session> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("Session not found: {}", id),
            ));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("Corrupt session file {}: {}", path.display(), e),
            )
        })
    }

    /// List all sessions, most recently updated first
    pub fn list(&self) -> io::Result<Vec<SessionInfo>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match read_session(&path) {
                Some(session) => sessions.push(SessionInfo::from(&session)),
                None => tracing::warn!("Skipping unreadable session file {}", path.display()),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Delete a session
    pub fn delete(&self, id: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(id)?)
    }
}

fn read_session(path: &Path) -> Option<Session> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Information about a saved session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub updated_at: i64,
    pub initial_query: String,
    pub category: Option<String>,
    pub message_count: usize,
    pub complete: bool,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            updated_at: session.updated_at,
            initial_query: session.state.initial_query().to_string(),
            category: session.state.category().map(str::to_string),
            message_count: session.state.message_log().len(),
            complete: session.state.is_complete(),
        }
    }
}

impl SessionInfo {
    /// Format the updated_at timestamp for display
    pub fn updated_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.updated_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn status(&self) -> &'static str {
        if self.complete { "complete" } else { "open" }
    }
}
