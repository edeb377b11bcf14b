//! Index of every command name the shell would recognise: builtins, reserved
//! words and the executables found on PATH.

use std::collections::BTreeSet;
use std::env;
use std::fs;

use crate::shell::ShellEnvironment;

/// Builtins of an interactive zsh/POSIX shell
const SHELL_BUILTINS: &[&str] = &[
    // POSIX / common builtins
    "cd", "export", "alias", "source", "set", "unset", "pushd", "popd", "dirs", "history",
    "bg", "fg", "jobs", "kill", "wait", "eval", "exec", "exit", "logout", "umask", "ulimit",
    "type", "hash", "readonly", "declare", "local", "typeset", "let", "test", "true", "false",
    "command", "builtin", "getopts", "read", "printf", "echo", "trap", "return", "shift",
    "unalias",
    // zsh-specific
    "print", "whence", "rehash", "setopt", "unsetopt", "bindkey", "zle", "autoload",
    "zmodload", "emulate", "repeat", "coproc", "vared", "compctl", "compadd", "compdef",
    "zstyle", "zcompile", "zformat", "zparseopts", "zregexparse", "noglob", "nocorrect",
    "disown", "sched", "limit", "unlimit", "where", "which",
];

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "case", "esac", "for", "while", "until", "do", "done",
    "in", "function", "select", "time", "coproc", "foreach", "end",
];

/// Set of known command names. Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct CommandIndex {
    names: BTreeSet<String>,
}

impl CommandIndex {
    /// Scan builtins plus every directory on the environment's PATH.
    pub fn build(env: &ShellEnvironment) -> Self {
        let mut index = Self::default();
        index.rebuild(env);
        index
    }

    /// Index containing exactly `names`
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn rebuild(&mut self, env: &ShellEnvironment) {
        self.names = SHELL_BUILTINS
            .iter()
            .chain(RESERVED_WORDS)
            .map(|name| name.to_string())
            .collect();

        let path_var = env.var("PATH").unwrap_or_default();
        for dir in env::split_paths(path_var) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            // Unreadable or missing PATH entries are common; skip them
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_file() || file_type.is_symlink() {
                    if let Some(name) = entry.file_name().to_str() {
                        self.names.insert(name.to_string());
                    }
                }
            }
        }

        tracing::debug!("Command index built with {} names", self.names.len());
    }

    pub fn has(&self, token: &str) -> bool {
        self.names.contains(token)
    }

    /// All names starting with `prefix`, sorted
    pub fn matches(&self, prefix: &str) -> Vec<String> {
        self.names
            .range(prefix.to_string()..)
            .take_while(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
