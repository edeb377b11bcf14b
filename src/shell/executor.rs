//! Runs command lines through the system shell interpreter.
//!
//! Every line is handed verbatim to `<interpreter> -c <line>`; nothing here
//! parses shell syntax. Two I/O modes exist:
//!
//! - **Interactive**: editors, pagers, REPLs and the like get the terminal
//!   directly. Nothing is captured and only the exit code is reported.
//! - **Capture**: stdin is inherited, stdout and stderr are piped. Each chunk
//!   is echoed to our own streams as it arrives and kept for the result.
//!
//! While a child runs, SIGINT is taken over so Ctrl-C never kills the session.
//! Interactive children receive it through the terminal's process group and
//! the supervisor ignores it; capture-mode children also get it forwarded
//! explicitly. The previous disposition is restored when the child ends.

use nix::libc::c_int;
use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use std::io::{self, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use super::environment::ShellEnvironment;
use crate::config::ShellConfig;

/// Programs that need the terminal to themselves
const INTERACTIVE_COMMANDS: &[&str] = &[
    "vim", "nvim", "vi", "nano", "emacs", "less", "more", "man", "top", "htop", "ssh",
    "python", "python3", "node", "irb", "ruby", "mysql", "psql", "sqlite3", "mongo",
    "redis-cli", "ftp", "sftp", "telnet", "screen", "tmux", "nnn", "ranger", "mc",
];

/// Interpreters that only open a REPL when run without arguments
const BARE_REPLS: &[&str] = &["python", "python3", "node"];

const READ_CHUNK_SIZE: usize = 8192;

/// Child pid that the capture-mode SIGINT handler forwards to (0 = none)
static FORWARD_PID: AtomicI32 = AtomicI32::new(0);

/// Output and status of one executed line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    fn spawn_failure(interpreter: &Path, err: io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("failed to start {}: {}", interpreter.display(), err),
            exit_code: 1,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Interactive,
    Capture,
}

/// Decide whether `line` should own the terminal.
pub fn execution_mode(line: &str) -> ExecutionMode {
    let trimmed = line.trim();
    let first = trimmed.split_whitespace().next().unwrap_or("");

    if !INTERACTIVE_COMMANDS.contains(&first) {
        return ExecutionMode::Capture;
    }
    // Piped or redirected programs are not driving the terminal
    if trimmed.contains(['|', '>', '<']) {
        return ExecutionMode::Capture;
    }
    // `python script.py` runs a script, `python` opens a REPL
    if BARE_REPLS.contains(&first) && trimmed.split_whitespace().count() > 1 {
        return ExecutionMode::Capture;
    }
    ExecutionMode::Interactive
}

/// Spawns command lines through a shell interpreter
#[derive(Debug, Clone)]
pub struct Executor {
    interpreter: PathBuf,
}

impl Executor {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Resolve the configured interpreter on PATH, falling back to `sh`.
    pub fn from_config(config: &ShellConfig) -> Self {
        match which::which(&config.interpreter) {
            Ok(path) => Self::new(path),
            Err(e) => {
                tracing::warn!(
                    "Shell interpreter '{}' not found ({}), falling back to sh",
                    config.interpreter,
                    e
                );
                Self::new("sh")
            }
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Run `line` in the environment's working directory with its variables.
    pub async fn execute(&self, line: &str, env: &ShellEnvironment) -> ExecutionResult {
        let mode = execution_mode(line);
        tracing::debug!("Executing ({:?}) via {}: {}", mode, self.interpreter.display(), line);

        let guard = SigintGuard::install(mode);
        let result = match mode {
            ExecutionMode::Interactive => self.run_interactive(line, env).await,
            ExecutionMode::Capture => self.run_capture(line, env).await,
        };
        drop(guard);

        result
    }

    fn command(&self, line: &str, env: &ShellEnvironment) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(line)
            .current_dir(env.cwd())
            .env_clear()
            .envs(env.vars());
        cmd
    }

    async fn run_interactive(&self, line: &str, env: &ShellEnvironment) -> ExecutionResult {
        let spawned = self
            .command(line, env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return ExecutionResult::spawn_failure(&self.interpreter, e),
        };

        interactive_result(child.wait().await)
    }

    async fn run_capture(&self, line: &str, env: &ShellEnvironment) -> ExecutionResult {
        let spawned = self
            .command(line, env)
            .stdin(Stdio::inherit()) // Child may still prompt for input
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return ExecutionResult::spawn_failure(&self.interpreter, e),
        };

        if let Some(pid) = child.id() {
            FORWARD_PID.store(pid as i32, Ordering::SeqCst);
        }

        let (stdout_buf, stderr_buf) = drain_output(&mut child).await;
        let stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
        let mut stderr = String::from_utf8_lossy(&stderr_buf).into_owned();

        let exit_code = match child.wait().await {
            Ok(status) => exit_code(status),
            Err(e) => {
                stderr.push_str(&e.to_string());
                1
            }
        };
        FORWARD_PID.store(0, Ordering::SeqCst);

        ExecutionResult {
            stdout,
            stderr,
            exit_code,
        }
    }
}

/// The child owned the terminal, so only the exit code is reported.
fn interactive_result(status: io::Result<ExitStatus>) -> ExecutionResult {
    let exit_code = match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            tracing::warn!("Failed to wait for interactive child: {}", e);
            1
        }
    };
    ExecutionResult {
        exit_code,
        ..Default::default()
    }
}

/// Read stdout and stderr until both close, echoing every chunk live.
async fn drain_output(child: &mut Child) -> (Vec<u8>, Vec<u8>) {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (stdout_buf, stderr_buf);
    };

    let mut out_chunk = [0u8; READ_CHUNK_SIZE];
    let mut err_chunk = [0u8; READ_CHUNK_SIZE];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            result = stdout.read(&mut out_chunk), if out_open => match result {
                Ok(0) | Err(_) => out_open = false,
                Ok(n) => {
                    echo(&mut io::stdout(), &out_chunk[..n]);
                    stdout_buf.extend_from_slice(&out_chunk[..n]);
                }
            },
            result = stderr.read(&mut err_chunk), if err_open => match result {
                Ok(0) | Err(_) => err_open = false,
                Ok(n) => {
                    echo(&mut io::stderr(), &err_chunk[..n]);
                    stderr_buf.extend_from_slice(&err_chunk[..n]);
                }
            },
        }
    }

    (stdout_buf, stderr_buf)
}

fn echo(stream: &mut impl Write, chunk: &[u8]) {
    if let Err(e) = stream.write_all(chunk).and_then(|_| stream.flush()) {
        tracing::debug!("Failed to echo child output: {}", e);
    }
}

/// Shell convention: signal deaths report 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

extern "C" fn ignore_sigint(_: c_int) {}

extern "C" fn forward_sigint(_: c_int) {
    let pid = FORWARD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        let _ = kill(Pid::from_raw(pid), Signal::SIGINT);
    }
}

/// Holds the SIGINT handler for the lifetime of one child. Dropping it puts
/// back whatever disposition was active before.
///
/// A handler function is used rather than `SIG_IGN` because ignored signals
/// stay ignored across exec, which would leave the child deaf to Ctrl-C.
struct SigintGuard {
    previous: SigAction,
}

impl SigintGuard {
    fn install(mode: ExecutionMode) -> Option<Self> {
        let handler = match mode {
            ExecutionMode::Interactive => ignore_sigint as extern "C" fn(c_int),
            ExecutionMode::Capture => forward_sigint as extern "C" fn(c_int),
        };
        let action = SigAction::new(
            SigHandler::Handler(handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        // SAFETY: both handlers only touch an atomic and call kill(2), which
        // is async-signal-safe.
        match unsafe { sigaction(Signal::SIGINT, &action) } {
            Ok(previous) => Some(Self { previous }),
            Err(e) => {
                tracing::warn!("Failed to install SIGINT handler: {}", e);
                None
            }
        }
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        FORWARD_PID.store(0, Ordering::SeqCst);
        // SAFETY: restores the disposition that was active before install.
        if let Err(e) = unsafe { sigaction(Signal::SIGINT, &self.previous) } {
            tracing::warn!("Failed to restore SIGINT handler: {}", e);
        }
    }
}
