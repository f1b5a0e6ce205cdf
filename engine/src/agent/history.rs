//! Conversation history and session persistence
//!
//! A `Session` is an id plus an append-only list of turns. The
//! `HistoryStore` keeps one file per session and never holds a file open
//! between calls: `load` opens, reads and closes; `save` writes a temporary
//! sibling file and renames it over the old one.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Longest accepted session id
const MAX_SESSION_ID_LEN: usize = 64;

/// Returns true when `id` matches `[A-Za-z0-9_-]{1,64}`
///
/// Session ids become file names, so anything that could name a path
/// component (`/`, `.`, `..`) is refused.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// A tool call the model asked for
    Action,
    /// The text a tool call produced
    Observation,
}

impl Role {
    /// Label used when the turn is rendered into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Action => "Action",
            Role::Observation => "Observation",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn action(content: impl Into<String>) -> Self {
        Self::new(Role::Action, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::new(Role::Observation, content)
    }
}

/// Ordered, append-only list of turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn from index `len` on
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }
}

impl From<Vec<Turn>> for ConversationHistory {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

/// A conversation keyed by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Model used by the most recent run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "turns")]
    pub history: ConversationHistory,
}

impl Session {
    /// Create an empty session, rejecting ids that are not file-name safe
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        if !is_valid_session_id(&id) {
            return Err(EngineError::History(format!(
                "Invalid session id '{}': use 1-64 letters, digits, '_' or '-'",
                id
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id,
            created_at: now,
            updated_at: now,
            model: None,
            history: ConversationHistory::new(),
        })
    }

    /// Append a turn and bump `updated_at`
    pub fn append(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp.max(self.updated_at);
        self.history.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        self.history.turns()
    }

    /// Roll the conversation back to its first `len` turns
    pub fn truncate(&mut self, len: usize) {
        self.history.truncate(len);
    }
}

/// On-disk layout of a session file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFormat {
    /// Pretty JSON document with session metadata and all turns
    #[default]
    Json,
    /// One turn per line
    Jsonl,
}

impl HistoryFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            HistoryFormat::Json => "json",
            HistoryFormat::Jsonl => "jsonl",
        }
    }
}

/// Listing entry for `history list`
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub turns: usize,
    pub updated_at: DateTime<Utc>,
}

/// File-backed session storage
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    format: HistoryFormat,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>, format: HistoryFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// File a session lives in
    pub fn path_for(&self, id: &str) -> Result<PathBuf, EngineError> {
        if !is_valid_session_id(id) {
            return Err(EngineError::History(format!("Invalid session id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.{}", id, self.format.extension())))
    }

    /// Read a session, or start an empty one if no file exists yet
    pub fn load(&self, id: &str) -> Result<Session, EngineError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            tracing::debug!("No history for session '{}', starting fresh", id);
            return Session::new(id);
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            EngineError::History(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let session = match self.format {
            HistoryFormat::Json => serde_json::from_str::<Session>(&contents).map_err(|e| {
                EngineError::History(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            HistoryFormat::Jsonl => {
                let mut turns = Vec::new();
                for (lineno, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let turn: Turn = serde_json::from_str(line).map_err(|e| {
                        EngineError::History(format!(
                            "Failed to parse {}:{}: {}",
                            path.display(),
                            lineno + 1,
                            e
                        ))
                    })?;
                    turns.push(turn);
                }

                // The line format carries no metadata; derive it from the turns
                let mut session = Session::new(id)?;
                if let (Some(first), Some(last)) = (turns.first(), turns.last()) {
                    session.created_at = first.timestamp;
                    session.updated_at = last.timestamp;
                }
                session.history = ConversationHistory::from(turns);
                session
            }
        };

        if session.id != id {
            return Err(EngineError::History(format!(
                "{} holds session '{}', expected '{}'",
                path.display(),
                session.id,
                id
            )));
        }

        tracing::debug!("Loaded session '{}' with {} turns", id, session.history.len());
        Ok(session)
    }

    /// Overwrite the session file atomically
    pub fn save(&self, session: &Session) -> Result<(), EngineError> {
        let path = self.path_for(&session.id)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            EngineError::History(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let body = self.render(session)?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", session.id, std::process::id()));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            EngineError::History(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn render(&self, session: &Session) -> Result<String, EngineError> {
        let encode_err = |e: serde_json::Error| EngineError::History(format!("Failed to encode session: {}", e));
        match self.format {
            HistoryFormat::Json => serde_json::to_string_pretty(session).map_err(encode_err),
            HistoryFormat::Jsonl => {
                let mut out = String::new();
                for turn in session.turns() {
                    out.push_str(&serde_json::to_string(turn).map_err(encode_err)?);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    /// Delete a session file. Returns false when there was nothing to delete.
    pub fn clear(&self, id: &str) -> Result<bool, EngineError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EngineError::History(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Summaries of every stored session, most recently updated first
    pub fn list(&self) -> Result<Vec<SessionSummary>, EngineError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            EngineError::History(format!("Failed to read {}: {}", self.dir.display(), e))
        })?;

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.format.extension()) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_valid_session_id(id) {
                continue;
            }
            match self.load(id) {
                Ok(session) => sessions.push(SessionSummary {
                    id: session.id,
                    turns: session.history.len(),
                    updated_at: session.updated_at,
                }),
                Err(e) => tracing::warn!("Skipping unreadable session file: {}", e),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}
