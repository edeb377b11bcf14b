//! Shell state owned by the session: working directory, previous working
//! directory and the exported variable set.
//!
//! A `ShellEnvironment` created with [`ShellEnvironment::from_process`] mirrors
//! every change into the real process environment (and the process working
//! directory) so that the internal map and what children inherit never
//! diverge. [`ShellEnvironment::isolated`] skips the mirroring, which lets
//! tests run side by side without touching global state.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors raised while mutating the shell environment
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("{}: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a valid variable name: {0}")]
    InvalidName(String),

    #[error("invalid value for {0}")]
    InvalidValue(String),
}

/// Working directory and variables for the running session
#[derive(Debug, Clone)]
pub struct ShellEnvironment {
    cwd: PathBuf,
    old_pwd: PathBuf,
    vars: BTreeMap<String, String>,
    /// Mirror changes into the process environment and working directory
    sync_process: bool,
}

impl ShellEnvironment {
    /// Snapshot the inherited environment and working directory.
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        let vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        Ok(Self {
            old_pwd: cwd.clone(),
            cwd,
            vars,
            sync_process: true,
        })
    }

    /// Build a detached environment rooted at `cwd`.
    pub fn isolated<I>(cwd: impl AsRef<Path>, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let cwd = normalize(&absolute(cwd.as_ref()));
        Self {
            old_pwd: cwd.clone(),
            cwd,
            vars: vars.into_iter().collect(),
            sync_process: false,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn old_pwd(&self) -> &Path {
        &self.old_pwd
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// All variables, ordered by name
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Change directory. Relative paths resolve against the current directory.
    pub fn set_cwd(&mut self, dir: impl AsRef<Path>) -> Result<(), EnvError> {
        let resolved = normalize(&self.cwd.join(dir.as_ref()));

        let metadata = fs::metadata(&resolved).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => EnvError::NotFound(resolved.clone()),
            _ => EnvError::Inaccessible {
                path: resolved.clone(),
                source,
            },
        })?;
        if !metadata.is_dir() {
            return Err(EnvError::NotADirectory(resolved));
        }

        if self.sync_process {
            env::set_current_dir(&resolved).map_err(|source| EnvError::Inaccessible {
                path: resolved.clone(),
                source,
            })?;
        }

        self.old_pwd = std::mem::replace(&mut self.cwd, resolved);
        let old_pwd = self.old_pwd.display().to_string();
        let pwd = self.cwd.display().to_string();
        self.store("OLDPWD", old_pwd);
        self.store("PWD", pwd);

        tracing::debug!("cwd changed: {} -> {}", self.old_pwd.display(), self.cwd.display());
        Ok(())
    }

    pub fn set_var(&mut self, key: &str, value: &str) -> Result<(), EnvError> {
        if !is_valid_key(key) {
            return Err(EnvError::InvalidName(key.to_string()));
        }
        if value.contains('\0') {
            return Err(EnvError::InvalidValue(key.to_string()));
        }
        self.store(key, value.to_string());
        Ok(())
    }

    pub fn unset_var(&mut self, key: &str) -> Result<(), EnvError> {
        if !is_valid_key(key) {
            return Err(EnvError::InvalidName(key.to_string()));
        }
        self.vars.remove(key);
        if self.sync_process {
            env::remove_var(key);
        }
        Ok(())
    }

    fn store(&mut self, key: &str, value: String) {
        if self.sync_process {
            env::set_var(key, &value);
        }
        self.vars.insert(key.to_string(), value);
    }
}

/// Names the OS will accept as environment keys
fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0'])
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| Path::new("/").join(path))
    }
}

/// Lexically resolve `.` and `..` without following symlinks.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    if out.as_os_str().is_empty() {
        out.push("/");
    }
    out
}
