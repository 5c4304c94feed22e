//! Session controller - the command lifecycle
//!
//! generate → normalize → classify → confirm → execute → refine on failure.
//!
//! Every invocation is independent: whatever must survive to the next run is
//! written through the `StateStore`. Handlers never exit the process; they
//! return an `Outcome` (or a `GenieError`) and the caller maps it to an exit
//! status exactly once.

use std::io::Write;

use crate::backend::Backend;
use crate::confirm::{is_danger_consent, is_yes, Confirm};
use crate::config::DEFAULT_SHELL;
use crate::danger;
use crate::error::{GenieError, Result, EXIT_DECLINED_DANGEROUS};
use crate::executor::{ExecOutput, ShellExecutor};
use crate::normalize::{is_usable, normalize};
use crate::prompt::Prompt;
use crate::state_store::{SessionState, StateStore};

const SUGGEST_HINT: &str = "Refine your prompt.";
const REFINE_HINT: &str = "Try adding more detail to --why.";

/// Operating mode of one invocation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Print a suggested command
    #[default]
    Suggest,
    /// Suggest, confirm, execute, and offer a fix on failure
    Run,
    /// Explain a command
    Explain,
    /// Correct the previous command
    Refine,
}

/// Everything one invocation asks for
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Request {
    pub mode: Mode,
    pub task: Option<String>,
    /// Refine: reuse the stored task, command and error
    pub use_last: bool,
    /// Refine: what was wrong with the previous command
    pub why: String,
    /// Explain: command to explain instead of the stored one
    pub command: Option<String>,
}

impl Request {
    pub fn new(mode: Mode, words: &[String]) -> Self {
        Self {
            mode,
            task: join_task(words),
            ..Default::default()
        }
    }
}

/// Join task words with single spaces; a blank task is no task
pub fn join_task(words: &[String]) -> Option<String> {
    let task = words.join(" ");
    if task.trim().is_empty() {
        None
    } else {
        Some(task)
    }
}

/// How an invocation ended when no fatal error occurred
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Command produced, explained or executed successfully
    Completed,
    /// User declined a normal command
    Declined,
    /// User did not type the danger token for a dangerous command
    DeclinedDangerous,
    /// The executed command exited nonzero
    CommandFailed(i32),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed | Outcome::Declined => 0,
            Outcome::DeclinedDangerous => EXIT_DECLINED_DANGEROUS,
            Outcome::CommandFailed(code) => *code,
        }
    }
}

/// Drives one invocation against injected collaborators
pub struct Session<'a> {
    backend: &'a dyn Backend,
    executor: &'a dyn ShellExecutor,
    store: &'a dyn StateStore,
    confirm: &'a mut dyn Confirm,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    shell: String,
    record_history: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        executor: &'a dyn ShellExecutor,
        store: &'a dyn StateStore,
        confirm: &'a mut dyn Confirm,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
    ) -> Self {
        Self {
            backend,
            executor,
            store,
            confirm,
            out,
            err,
            shell: DEFAULT_SHELL.to_string(),
            record_history: true,
        }
    }

    /// Shell used to execute accepted commands
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Whether accepted commands are appended to the history log
    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Run the handler for the requested mode
    pub fn dispatch(&mut self, request: &Request) -> Result<Outcome> {
        tracing::debug!(mode = ?request.mode, "dispatching");
        match request.mode {
            Mode::Suggest => self.suggest(request.task.as_deref()),
            Mode::Run => self.run(request.task.as_deref()),
            Mode::Explain => {
                let last = self.store.load();
                self.explain(&last, request.command.as_deref())
            }
            Mode::Refine => {
                let last = self.store.load();
                self.refine(&last, request.task.as_deref(), request.use_last, &request.why)
            }
        }
    }

    /// Generate a command for `task`, record it and print it
    pub fn suggest(&mut self, task: Option<&str>) -> Result<Outcome> {
        let task = task.ok_or(GenieError::MissingContext("Provide a task."))?;
        let command = self.generate(&Prompt::Suggest { task }, SUGGEST_HINT)?;

        self.record(task, &command);
        self.persist(&SessionState::generated(task, &command));
        writeln!(self.out, "{}", command)?;
        Ok(Outcome::Completed)
    }

    /// Ask for a corrected command, either for a new task or for the last session
    pub fn refine(
        &mut self,
        last: &SessionState,
        task: Option<&str>,
        use_last: bool,
        why: &str,
    ) -> Result<Outcome> {
        let (task, previous, problem) = if use_last {
            if !last.has_previous() {
                return Err(GenieError::MissingContext(
                    "No previous state found. Run a suggest or run first.",
                ));
            }
            let problem = if why.trim().is_empty() {
                last.last_error.clone()
            } else {
                why.to_string()
            };
            (last.task.clone(), last.command.clone(), problem)
        } else {
            let task = match task {
                Some(task) => task.to_string(),
                None if !last.task.is_empty() => last.task.clone(),
                None => {
                    return Err(GenieError::MissingContext(
                        "Provide a task (natural language) or use --use-last.",
                    ))
                }
            };
            if last.command.is_empty() {
                writeln!(
                    self.err,
                    "[warn] No previous command in state; refining without previous command context."
                )?;
            }
            (task, last.command.clone(), why.to_string())
        };

        let command = self.generate(
            &Prompt::Refine {
                task: &task,
                previous: &previous,
                problem: &problem,
            },
            REFINE_HINT,
        )?;

        self.record(&task, &command);
        self.persist(&SessionState::generated(&task, &command));
        writeln!(self.out, "{}", command)?;
        Ok(Outcome::Completed)
    }

    /// Print a short explanation of a command. State is left untouched.
    pub fn explain(&mut self, last: &SessionState, command: Option<&str>) -> Result<Outcome> {
        let command = command
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| Some(last.command.as_str()).filter(|c| !c.is_empty()))
            .ok_or(GenieError::MissingCommand)?;

        let prompt = Prompt::Explain { command }.render();
        let explanation = self.backend.generate(&prompt)?;

        write!(
            self.out,
            "Command:\n  {}\n\nExplanation:\n{}\n",
            command,
            explanation.trim()
        )?;
        Ok(Outcome::Completed)
    }

    /// Suggest, confirm, execute; on failure offer one refinement round
    pub fn run(&mut self, task: Option<&str>) -> Result<Outcome> {
        let task = task.ok_or(GenieError::MissingContext("Provide a task."))?;
        let command = self.generate(&Prompt::Suggest { task }, SUGGEST_HINT)?;

        write!(self.out, "Suggested:\n  {}\n\n", command)?;

        if let Some(signature) = danger::matched_signature(&command) {
            tracing::info!(command = %command, signature, "dangerous command");
            writeln!(
                self.err,
                "[warn] Command looks dangerous ({}). Not running without explicit consent.",
                signature
            )?;
            let reply = self.ask("Type 'YES' to run anyway: ")?;
            if !is_danger_consent(&reply) {
                writeln!(self.out, "Aborted.")?;
                self.persist(&SessionState::generated(task, &command));
                return Ok(Outcome::DeclinedDangerous);
            }
        } else {
            let reply = self.ask("Run this command? [y/N]: ")?;
            if !is_yes(&reply) {
                writeln!(self.out, "Aborted.")?;
                self.persist(&SessionState::generated(task, &command));
                return Ok(Outcome::Declined);
            }
        }

        let result = self.executor.execute(&self.shell, &command)?;
        if result.success() {
            self.out.write_all(result.stdout.as_bytes())?;
            self.record(task, &command);
            self.persist(&SessionState::record(task, &command, "", Some(0)));
            return Ok(Outcome::Completed);
        }

        let code = result.exit_code;
        self.err.write_all(result.stderr.as_bytes())?;
        self.persist(&SessionState::record(
            task,
            &command,
            result.stderr.trim(),
            Some(code),
        ));
        writeln!(self.err, "\n[err] Command failed with exit code {}.", code)?;

        let reply = self.ask("Refine based on this error? [y/N]: ")?;
        if !is_yes(&reply) {
            return Ok(Outcome::CommandFailed(code));
        }
        self.retry(task, &command, &result)
    }

    fn retry(&mut self, task: &str, failed: &str, failure: &ExecOutput) -> Result<Outcome> {
        let improved = self.generate(
            &Prompt::Refine {
                task,
                previous: failed,
                problem: &failure.stderr,
            },
            REFINE_HINT,
        )?;
        writeln!(self.out, "\nImproved suggestion:\n  {}", improved)?;

        // The improved command is not re-classified by the danger check.
        let reply = self.ask("Run improved command? [y/N]: ")?;
        if !is_yes(&reply) {
            self.persist(&SessionState::generated(task, &improved));
            return Ok(Outcome::Declined);
        }

        let result = self.executor.execute(&self.shell, &improved)?;
        if result.success() {
            self.out.write_all(result.stdout.as_bytes())?;
            self.record(task, &improved);
            self.persist(&SessionState::record(task, &improved, "", Some(0)));
            return Ok(Outcome::Completed);
        }

        let code = result.exit_code;
        self.err.write_all(result.stderr.as_bytes())?;
        writeln!(self.err, "[err] Improved command failed (exit {}).", code)?;
        let error = match result.stderr.trim() {
            "" => format!("exit {}", code),
            stderr => stderr.to_string(),
        };
        self.persist(&SessionState::record(task, &improved, error, Some(code)));
        Ok(Outcome::CommandFailed(code))
    }

    /// Prompt → backend → normalize, rejecting unusable output
    fn generate(&self, prompt: &Prompt<'_>, hint: &'static str) -> Result<String> {
        let raw = self.backend.generate(&prompt.render())?;
        let command = normalize(&raw);
        tracing::debug!(kind = prompt.kind(), raw = %raw, command = %command, "normalized response");

        if !is_usable(&command) {
            return Err(GenieError::EmptyOrMultilineResult { hint });
        }
        Ok(command)
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.out.flush()?;
        self.err.flush()?;
        let reply = self.confirm.ask(question)?;
        tracing::debug!(question, reply = reply.trim(), "confirmation");
        Ok(reply)
    }

    // History is best-effort: a write failure never fails the invocation.
    fn record(&self, task: &str, command: &str) {
        if !self.record_history {
            return;
        }
        if let Err(e) = self.store.append_history(task, command) {
            tracing::warn!(error = %e, "failed to append history");
        }
    }

    fn persist(&self, state: &SessionState) {
        if let Err(e) = self.store.save(state) {
            tracing::warn!(error = %e, "failed to save session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_task() {
        let words: Vec<String> = vec!["list".into(), "big".into(), "files".into()];
        assert_eq!(join_task(&words).as_deref(), Some("list big files"));
        assert_eq!(join_task(&[]), None);
        assert_eq!(join_task(&["  ".to_string()]), None);
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Completed.exit_code(), 0);
        assert_eq!(Outcome::Declined.exit_code(), 0);
        assert_eq!(Outcome::DeclinedDangerous.exit_code(), 3);
        assert_eq!(Outcome::CommandFailed(127).exit_code(), 127);
    }

    #[test]
    fn test_request_new() {
        let request = Request::new(Mode::Run, &["echo".to_string(), "hi".to_string()]);
        assert_eq!(request.mode, Mode::Run);
        assert_eq!(request.task.as_deref(), Some("echo hi"));
        assert!(!request.use_last);
        assert!(request.command.is_none());
    }
}
