//! Normalizer - flattens a raw model response into one command line
//!
//! Models ignore formatting instructions often enough that every response
//! goes through here before it is treated as a command. This is a sanitizer,
//! not a parser: malformed input degrades to an empty or noisy string that
//! the caller rejects, it never panics.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCE_OPEN: Regex = Regex::new(r"^```[\w-]*\n?").unwrap();
    static ref FENCE_CLOSE: Regex = Regex::new(r"\n?```$").unwrap();
    static ref NEWLINE_RUN: Regex = Regex::new(r"\s*\n\s*").unwrap();
    static ref SPACE_RUN: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Normalize a model response into a single command line.
///
/// Opening and closing fences are stripped independently, so an unpaired
/// fence is still removed. One layer of inline backticks is removed when it
/// wraps the whole string.
pub fn normalize(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    let s = FENCE_OPEN.replace(s, "");
    let s = FENCE_CLOSE.replace(&s, "");

    let s = s.as_ref();
    let s = if s.starts_with('`') && s.ends_with('`') {
        if s.len() >= 2 {
            s[1..s.len() - 1].trim()
        } else {
            ""
        }
    } else {
        s
    };

    let s = NEWLINE_RUN.replace_all(s, " ");
    let s = SPACE_RUN.replace_all(&s, " ");

    s.trim().to_string()
}

/// True when a normalized command can be handed to the confirmation gate
pub fn is_usable(command: &str) -> bool {
    !command.is_empty() && !command.contains('\n')
}
