//! Confirmation gate input
//!
//! The lifecycle asks questions through `Confirm` so it can be driven by a
//! terminal or by canned answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Token that must be typed verbatim to run a dangerous command
pub const DANGER_TOKEN: &str = "YES";

/// Asks the user a question and returns the raw reply
pub trait Confirm {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads one line from stdin. EOF reads as an empty reply.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Case-insensitive y/yes
pub fn is_yes(reply: &str) -> bool {
    matches!(reply.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Exact, case-sensitive danger token
pub fn is_danger_consent(reply: &str) -> bool {
    reply.trim() == DANGER_TOKEN
}

/// Replays canned replies and records the questions asked (for testing)
#[derive(Default)]
pub struct ScriptedConfirm {
    replies: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Confirm for ScriptedConfirm {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.replies.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes("YES\n"));
        assert!(is_yes("  Yes "));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
        assert!(!is_yes("n"));
    }

    #[test]
    fn test_danger_consent_is_exact() {
        assert!(is_danger_consent("YES"));
        assert!(is_danger_consent("YES\n"));
        assert!(!is_danger_consent("yes"));
        assert!(!is_danger_consent("Yes"));
        assert!(!is_danger_consent("y"));
        assert!(!is_danger_consent("YESS"));
    }

    #[test]
    fn test_scripted_confirm_runs_dry() {
        let mut confirm = ScriptedConfirm::new(["y"]);
        assert_eq!(confirm.ask("first? ").unwrap(), "y");
        assert_eq!(confirm.ask("second? ").unwrap(), "");
        assert_eq!(confirm.asked(), vec!["first? ", "second? "]);
    }
}
