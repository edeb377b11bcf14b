//! Line editing on top of rustyline: completion, persistent history and
//! yes/no confirmation prompts.

use anyhow::{anyhow, Context as _, Result};
use rustyline::completion::{Completer as RlCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as ReadlineConfig, Context, Editor, Helper};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::command_index::CommandIndex;
use super::completer::Completer;
use crate::shell::ShellEnvironment;

/// Asks the user a yes/no question
pub trait Confirm {
    /// `None` once input has ended
    fn confirm(&mut self, question: &str) -> Option<bool>;
}

/// Empty and anything other than `n`/`no` counts as yes.
pub fn parse_answer(answer: &str) -> bool {
    !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

/// rustyline helper that defers to [`Completer`]
pub struct ShellHelper {
    completer: Completer,
}

impl ShellHelper {
    pub fn new(completer: Completer) -> Self {
        Self { completer }
    }
}

impl RlCompleter for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let pos = pos.min(line.len());
        let completion = self.completer.complete(&line[..pos]);
        let start = pos.saturating_sub(completion.matched.len());

        let candidates = completion
            .candidates
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}

/// The session's line editor
pub struct LineEditor {
    editor: Editor<ShellHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl LineEditor {
    pub fn new(
        completer: Completer,
        history_size: usize,
        history_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config = ReadlineConfig::builder()
            .max_history_size(history_size)
            .context("Invalid history size")?
            .history_ignore_dups(true)
            .context("Invalid history settings")?
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();

        let mut editor = Editor::<ShellHelper, DefaultHistory>::with_config(config)
            .context("Failed to initialize line editor")?;
        editor.set_helper(Some(ShellHelper::new(completer)));

        if let Some(path) = &history_path {
            load_history(&mut editor, path);
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Refresh completion state after the environment or index changed
    pub fn sync(&mut self, env: &ShellEnvironment, index: &Arc<CommandIndex>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.completer.sync(env);
            helper.completer.set_index(Arc::clone(index));
        }
    }

    /// Read one line. Ctrl-C discards the line being edited and yields an
    /// empty one; `None` means end of input.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(anyhow!("Failed to read input: {}", e)),
        }
    }

    pub fn save_history(&mut self) {
        let Some(path) = &self.history_path else {
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("Failed to create history directory {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = self.editor.save_history(path) {
            tracing::warn!("Failed to save history to {}: {}", path.display(), e);
        }
    }
}

impl Confirm for LineEditor {
    fn confirm(&mut self, question: &str) -> Option<bool> {
        match tokio::task::block_in_place(|| self.editor.readline(question)) {
            Ok(answer) => Some(parse_answer(&answer)),
            Err(ReadlineError::Interrupted) => Some(false),
            Err(_) => None,
        }
    }
}

fn load_history(editor: &mut Editor<ShellHelper, DefaultHistory>, path: &Path) {
    if let Err(e) = editor.load_history(path) {
        let missing = matches!(
            e,
            ReadlineError::Io(ref io_error) if io_error.kind() == std::io::ErrorKind::NotFound
        );
        if !missing {
            tracing::warn!("Failed to load history from {}: {}", path.display(), e);
        }
    }
}
