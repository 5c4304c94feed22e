//! Prompt templates sent to the model backend
//!
//! Pure string construction: no backend call happens here and the same
//! inputs always render the same text.

/// Substituted when no problem description is available for a refinement
pub const NO_DETAILS: &str = "no details";
/// Substituted when there is no previous command to correct
pub const NO_PREVIOUS: &str = "(none)";

/// One of the three fixed prompt kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt<'a> {
    /// Ask for a command that performs `task`
    Suggest { task: &'a str },
    /// Ask for a corrected version of `previous`
    Refine {
        task: &'a str,
        previous: &'a str,
        problem: &'a str,
    },
    /// Ask for a short explanation of `command`
    Explain { command: &'a str },
}

impl Prompt<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Prompt::Suggest { .. } => "suggest",
            Prompt::Refine { .. } => "refine",
            Prompt::Explain { .. } => "explain",
        }
    }

    /// Render the full instruction text
    pub fn render(&self) -> String {
        match self {
            Prompt::Suggest { task } => suggest(task),
            Prompt::Refine {
                task,
                previous,
                problem,
            } => refine(task, previous, problem),
            Prompt::Explain { command } => explain(command),
        }
    }
}

fn suggest(task: &str) -> String {
    format!(
        r#"You are a shell command generator.

Rules:
- Output ONLY a single shell command on one line: no markdown, no code fences, no quotes, no explanations, no backticks.
- Prefer portable POSIX sh where possible (macOS/BSD compatible if feasible).
- Do not include comments.

Task: {task}"#
    )
}

fn refine(task: &str, previous: &str, problem: &str) -> String {
    let previous = match previous.trim() {
        "" => NO_PREVIOUS,
        p => p,
    };
    let problem = match problem.trim() {
        "" => NO_DETAILS,
        p => p,
    };
    format!(
        r#"The command you returned previously was wrong.

Constraints:
- Output ONLY a single shell command on one line: no markdown, no code fences, no quotes, no explanations.
- Keep it portable POSIX sh when possible.
- Fix the issue while preserving the user's intent.

User task: {task}
Previous command: {previous}
Problem description (from user or stderr): {problem}"#
    )
}

fn explain(command: &str) -> String {
    format!(
        r#"Explain briefly what the command does, in 1-5 concise bullet points.
Command: {command}"#
    )
}
