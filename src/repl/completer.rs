//! Tab completion for the line editor
//!
//! Provides completion for:
//! - Command names (builtins and PATH executables) in the first word
//! - File and directory paths in every later word

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::command_index::CommandIndex;
use crate::shell::ShellEnvironment;

/// Candidates for the word under the cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Sorted replacement texts for `matched`
    pub candidates: Vec<String>,
    /// The text at the end of the line that the candidates replace
    pub matched: String,
}

/// Completion state; refreshed from the shell environment before each read
#[derive(Debug, Clone)]
pub struct Completer {
    index: Arc<CommandIndex>,
    cwd: PathBuf,
    home: Option<PathBuf>,
}

impl Completer {
    pub fn new(index: Arc<CommandIndex>, env: &ShellEnvironment) -> Self {
        let mut completer = Self {
            index,
            cwd: PathBuf::new(),
            home: None,
        };
        completer.sync(env);
        completer
    }

    /// Pick up the current directory and HOME after builtins ran
    pub fn sync(&mut self, env: &ShellEnvironment) {
        self.cwd = env.cwd().to_path_buf();
        self.home = env.var("HOME").filter(|h| !h.is_empty()).map(PathBuf::from);
    }

    pub fn set_index(&mut self, index: Arc<CommandIndex>) {
        self.index = index;
    }

    pub fn complete(&self, line: &str) -> Completion {
        let trimmed = line.trim_start();

        match trimmed.find(' ') {
            None => Completion {
                candidates: self.index.matches(trimmed),
                matched: trimmed.to_string(),
            },
            Some(space) => {
                let partial = last_word(&trimmed[space + 1..]);
                Completion {
                    candidates: self.complete_path(partial),
                    matched: partial.to_string(),
                }
            }
        }
    }

    /// Complete file/directory paths
    fn complete_path(&self, partial: &str) -> Vec<String> {
        let (dir_part, file_prefix) = match partial.rfind('/') {
            Some(slash) => partial.split_at(slash + 1),
            None => ("", partial),
        };

        let Some(search_dir) = self.resolve_dir(dir_part) else {
            return Vec::new();
        };

        let Ok(entries) = fs::read_dir(&search_dir) else {
            return Vec::new();
        };

        let mut suggestions: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if !name.starts_with(file_prefix) {
                    return None;
                }
                // Follow symlinks so links to directories get a slash too
                let is_dir = fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);
                let suffix = if is_dir { "/" } else { "" };
                Some(format!("{}{}{}", dir_part, name, suffix))
            })
            .collect();

        suggestions.sort();
        suggestions
    }

    fn resolve_dir(&self, dir_part: &str) -> Option<PathBuf> {
        if dir_part.is_empty() {
            return Some(self.cwd.clone());
        }
        if let Some(rest) = dir_part.strip_prefix("~/") {
            return self.home.as_ref().map(|home| home.join(rest));
        }
        if Path::new(dir_part).is_absolute() {
            Some(PathBuf::from(dir_part))
        } else {
            Some(self.cwd.join(dir_part))
        }
    }
}

/// Text after the last space that is not inside quotes
fn last_word(args: &str) -> &str {
    let mut start = 0;
    let mut in_single = false;
    let mut in_double = false;

    for (i, ch) in args.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ' ' if !in_single && !in_double => start = i + 1,
            _ => {}
        }
    }

    &args[start..]
}
