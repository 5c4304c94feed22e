//! Error types for genie_core.
//!
//! Every fatal condition an invocation can hit maps to one variant and one
//! process exit status. A generated command that exits nonzero is not an
//! error here: it is reported through `session::Outcome::CommandFailed`.

use thiserror::Error;

/// Exit status for usage, context, backend and I/O failures
pub const EXIT_FAILURE: i32 = 1;
/// Exit status when the backend produced an unusable command
pub const EXIT_BAD_OUTPUT: i32 = 2;
/// Exit status when a dangerous command was not confirmed
pub const EXIT_DECLINED_DANGEROUS: i32 = 3;

#[derive(Error, Debug)]
pub enum GenieError {
    #[error("backend failed: {0}")]
    Backend(String),

    #[error("Model returned empty or multiline command. {hint}")]
    EmptyOrMultilineResult { hint: &'static str },

    #[error("{0}")]
    MissingContext(&'static str),

    #[error("Use --cmd '<command>' or run suggest/refine first so a last command exists.")]
    MissingCommand,

    #[error("failed to start shell {shell}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenieError {
    /// Process exit status reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            GenieError::EmptyOrMultilineResult { .. } => EXIT_BAD_OUTPUT,
            GenieError::Backend(_)
            | GenieError::MissingContext(_)
            | GenieError::MissingCommand
            | GenieError::Spawn { .. }
            | GenieError::Config(_)
            | GenieError::Io(_)
            | GenieError::Json(_) => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenieError>;
