//! Decides whether an input line is a shell command or a natural-language
//! prompt for the assistant.
//!
//! This is a heuristic, not a parser. Anything that looks like shell syntax
//! is treated as a command and handed to the real interpreter untouched.

use lazy_static::lazy_static;
use regex::Regex;

use super::command_index::CommandIndex;

lazy_static! {
    static ref ENV_ASSIGNMENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=").unwrap();
}

/// Characters that only make sense as shell syntax
const SHELL_OPERATORS: [char; 5] = ['|', '&', ';', '<', '>'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Empty,
    Command,
    Prompt,
}

pub fn classify(input: &str, index: &CommandIndex) -> Classification {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Classification::Empty;
    }

    if trimmed.contains(SHELL_OPERATORS) {
        return Classification::Command;
    }

    // Subshell, brace group or command substitution
    if trimmed.starts_with('(') || trimmed.starts_with('{') || trimmed.starts_with("$(") {
        return Classification::Command;
    }

    let tokens = tokenize(trimmed);
    let Some(first) = tokens.iter().find(|t| !ENV_ASSIGNMENT.is_match(t)) else {
        // Only `FOO=bar` assignments; the shell applies them
        return Classification::Command;
    };

    if index.has(first) || first.starts_with('.') || first.starts_with('/') {
        return Classification::Command;
    }

    Classification::Prompt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Bare,
    SingleQuoted,
    DoubleQuoted,
    /// Backslash seen; remembers which state to return to
    Escape { in_double: bool },
}

/// Split a line into words roughly the way a shell would.
///
/// Quotes and backslashes are copied into the tokens verbatim; only the
/// split points are affected. Transitions (anything not listed is copied
/// and stays in the same state):
///
/// | state        | input       | action        | next state            |
/// |--------------|-------------|---------------|-----------------------|
/// | Bare         | space / tab | end token     | Bare                  |
/// | Bare         | `'`         | copy          | SingleQuoted          |
/// | Bare         | `"`         | copy          | DoubleQuoted          |
/// | Bare         | `\`         | copy          | Escape (bare)         |
/// | SingleQuoted | `'`         | copy          | Bare                  |
/// | DoubleQuoted | `"`         | copy          | Bare                  |
/// | DoubleQuoted | `\`         | copy          | Escape (double)       |
/// | Escape       | any         | copy          | Bare / DoubleQuoted   |
///
/// Unterminated quotes are not an error; the rest of the line simply
/// becomes part of the last token.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Bare;

    for ch in input.chars() {
        state = match (state, ch) {
            (ScanState::Escape { in_double }, _) => {
                current.push(ch);
                if in_double {
                    ScanState::DoubleQuoted
                } else {
                    ScanState::Bare
                }
            }
            (ScanState::Bare, ' ' | '\t') => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                ScanState::Bare
            }
            (ScanState::Bare, '\'') => {
                current.push(ch);
                ScanState::SingleQuoted
            }
            (ScanState::Bare, '"') => {
                current.push(ch);
                ScanState::DoubleQuoted
            }
            (ScanState::Bare, '\\') => {
                current.push(ch);
                ScanState::Escape { in_double: false }
            }
            (ScanState::SingleQuoted, '\'') | (ScanState::DoubleQuoted, '"') => {
                current.push(ch);
                ScanState::Bare
            }
            (ScanState::DoubleQuoted, '\\') => {
                current.push(ch);
                ScanState::Escape { in_double: true }
            }
            (state, _) => {
                current.push(ch);
                state
            }
        };
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
