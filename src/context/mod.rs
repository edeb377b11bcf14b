//! Rolling window of recent terminal activity
//!
//! Keeps the last N commands and assistant exchanges so the assistant can be
//! told what the user has been doing. Large outputs are truncated once, when
//! an entry is added, so the rendered context stays bounded.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::utils::truncate_with_marker;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 20;

/// Default per-entry output limit, in characters
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 10_000;

const EMPTY_PLACEHOLDER: &str = "No recent terminal activity.";

/// One recorded unit of past activity
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEntry {
    Command {
        input: String,
        output: Option<String>,
        exit_code: Option<i32>,
        cwd: PathBuf,
        timestamp: DateTime<Local>,
    },
    AssistantResponse {
        input: String,
        output: String,
        timestamp: DateTime<Local>,
    },
}

impl ContextEntry {
    /// A command that ran in `cwd`, stamped with the current time
    pub fn command(
        input: impl Into<String>,
        output: Option<String>,
        exit_code: Option<i32>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self::Command {
            input: input.into(),
            output: output.filter(|o| !o.is_empty()),
            exit_code,
            cwd: cwd.into(),
            timestamp: Local::now(),
        }
    }

    pub fn assistant(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self::AssistantResponse {
            input: input.into(),
            output: output.into(),
            timestamp: Local::now(),
        }
    }

    pub fn input(&self) -> &str {
        match self {
            Self::Command { input, .. } | Self::AssistantResponse { input, .. } => input,
        }
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Command { output, .. } => output.as_deref(),
            Self::AssistantResponse { output, .. } => Some(output),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            Self::Command { timestamp, .. } | Self::AssistantResponse { timestamp, .. } => {
                *timestamp
            }
        }
    }

    fn truncate_output(&mut self, max_chars: usize) {
        match self {
            Self::Command {
                output: Some(output),
                ..
            }
            | Self::AssistantResponse { output, .. } => {
                if output.chars().count() > max_chars {
                    *output = truncate_with_marker(output, max_chars);
                }
            }
            Self::Command { output: None, .. } => {}
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Command {
                input,
                output,
                exit_code,
                cwd,
                ..
            } => {
                let mut s = format!("[{}] $ {}", cwd.display(), input);
                if let Some(output) = output {
                    s.push('\n');
                    s.push_str(output);
                }
                if let Some(code) = exit_code.filter(|c| *c != 0) {
                    s.push_str(&format!("\n(exit code: {})", code));
                }
                s
            }
            Self::AssistantResponse { input, output, .. } => {
                let text = if output.is_empty() { input } else { output };
                format!("[assistant] {}", text)
            }
        }
    }
}

/// Bounded FIFO of context entries
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    entries: VecDeque<ContextEntry>,
    capacity: usize,
    max_output_chars: usize,
}

impl Default for ContextBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ContextBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_output_limit(capacity, DEFAULT_MAX_OUTPUT_CHARS)
    }

    pub fn with_output_limit(capacity: usize, max_output_chars: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            max_output_chars,
        }
    }

    /// Append an entry, evicting the oldest ones beyond capacity
    pub fn add(&mut self, mut entry: ContextEntry) {
        entry.truncate_output(self.max_output_chars);
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render oldest to newest for the assistant's system prompt
    pub fn format(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }

        self.entries
            .iter()
            .map(ContextEntry::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
