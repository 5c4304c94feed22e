//! State store - the durable memory between independent invocations
//! Stores to: ~/.genie_local_state.json (last session) and
//! ~/.genie_local_history (append-only task/command audit log)
//!
//! There is exactly one state record. Nothing locks it, so two invocations
//! running at once may overwrite each other's record.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

const STATE_FILE: &str = ".genie_local_state.json";
const HISTORY_FILE: &str = ".genie_local_history";

fn home_dir() -> PathBuf {
    dirs::home_dir()
        .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// Default location of the session state file
pub fn default_state_path() -> PathBuf {
    home_dir().join(STATE_FILE)
}

/// Default location of the history log
pub fn default_history_path() -> PathBuf {
    home_dir().join(HISTORY_FILE)
}

/// ISO-8601 local time with seconds precision
pub fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// The most recent task/command/error tuple
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct SessionState {
    #[serde(default)]
    pub task: String,
    #[serde(rename = "cmd", default)]
    pub command: String,
    #[serde(default)]
    pub last_error: String,
    #[serde(default, deserialize_with = "lenient_exit_code")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timestamp: String,
}

impl SessionState {
    /// Build a complete record stamped with the current time.
    /// Every field is explicit: a save never merges with what was stored.
    pub fn record(
        task: impl Into<String>,
        command: impl Into<String>,
        last_error: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            task: task.into(),
            command: command.into(),
            last_error: last_error.into(),
            exit_code,
            timestamp: timestamp_now(),
        }
    }

    /// A generated but not executed command
    pub fn generated(task: impl Into<String>, command: impl Into<String>) -> Self {
        Self::record(task, command, "", None)
    }

    /// Whether a previous task and command are available for reuse
    pub fn has_previous(&self) -> bool {
        !self.task.is_empty() && !self.command.is_empty()
    }
}

// Older state files wrote "" for a missing exit code.
fn lenient_exit_code<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Persistence for the session record and the history log
pub trait StateStore {
    /// Load the last session. Missing or unreadable data yields the default state.
    fn load(&self) -> SessionState;

    /// Replace the stored session
    fn save(&self, state: &SessionState) -> Result<()>;

    /// Append one task/command event to the history log
    fn append_history(&self, task: &str, command: &str) -> Result<()>;
}

/// File-backed store used by the CLI
pub struct FileStateStore {
    state_path: PathBuf,
    history_path: PathBuf,
}

impl FileStateStore {
    pub fn new(state_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            history_path: history_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(default_state_path(), default_history_path())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> SessionState {
        if !self.state_path.exists() {
            tracing::debug!(path = %self.state_path.display(), "no session state yet");
            return SessionState::default();
        }

        let content = match fs::read_to_string(&self.state_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %self.state_path.display(), error = %e, "cannot read session state");
                return SessionState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %self.state_path.display(), error = %e, "ignoring malformed session state");
                SessionState::default()
            }
        }
    }

    fn save(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_path, json)?;
        tracing::debug!(path = %self.state_path.display(), command = %state.command, "session state saved");
        Ok(())
    }

    fn append_history(&self, task: &str, command: &str) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)?;
        file.write_all(history_lines(&timestamp_now(), task, command).as_bytes())?;
        Ok(())
    }
}

fn history_lines(ts: &str, task: &str, command: &str) -> String {
    format!("[{ts}] TASK: {task}\n[{ts}] CMD:  {command}\n")
}

/// In-process store (for testing and embedding)
#[derive(Default)]
pub struct MemoryStateStore {
    state: RefCell<Option<SessionState>>,
    history: RefCell<Vec<(String, String)>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing session record
    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: RefCell::new(Some(state)),
            history: RefCell::new(Vec::new()),
        }
    }

    /// The saved record, if anything was ever saved
    pub fn saved(&self) -> Option<SessionState> {
        self.state.borrow().clone()
    }

    /// Recorded (task, command) history events
    pub fn history(&self) -> Vec<(String, String)> {
        self.history.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> SessionState {
        self.state.borrow().clone().unwrap_or_default()
    }

    fn save(&self, state: &SessionState) -> Result<()> {
        *self.state.borrow_mut() = Some(state.clone());
        Ok(())
    }

    fn append_history(&self, task: &str, command: &str) -> Result<()> {
        self.history
            .borrow_mut()
            .push((task.to_string(), command.to_string()));
        Ok(())
    }
}
