//! genie_core - natural language to shell command, backed by a local model
//!
//! Modules:
//! - normalize: flatten raw model output into one command line
//! - danger: advisory signatures for destructive commands
//! - prompt: suggest / refine / explain templates
//! - state_store: last-session record and history log
//! - backend: Ollama CLI and HTTP backends
//! - executor: shell execution with captured output
//! - confirm: confirmation gate input
//! - config: layered settings (flags, env, YAML file)
//! - session: the command lifecycle controller
//! - error: error kinds and exit statuses

pub mod backend;
pub mod config;
pub mod confirm;
pub mod danger;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod prompt;
pub mod session;
pub mod state_store;

// Re-export key types for convenience
pub use backend::{Backend, OllamaCli, OllamaHttp, ScriptedBackend};

pub use config::{BackendKind, FileConfig, Overrides, Settings};

pub use confirm::{Confirm, ScriptedConfirm, TerminalConfirm};

pub use danger::{is_dangerous, matched_signature};

pub use error::{GenieError, Result};

pub use executor::{ExecOutput, ScriptedShell, ShellExecutor, SystemShell};

pub use normalize::normalize;

pub use prompt::Prompt;

pub use session::{Mode, Outcome, Request, Session};

pub use state_store::{FileStateStore, MemoryStateStore, SessionState, StateStore};
