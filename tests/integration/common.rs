use anyhow::Result;
use assert_fs::TempDir;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use uterm::assistant::{Assistant, ContextSnapshot};
use uterm::context::ContextBuffer;
use uterm::repl::Confirm;
use uterm::session::Engine;
use uterm::shell::{ExecutionResult, Executor, ShellEnvironment};

/// Test utilities for integration tests
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub project_path: PathBuf,
    pub config_dir: TempDir,
}

impl TestEnvironment {
    /// Create a new test environment with a temporary working directory
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config_dir = TempDir::new()?;
        let project_path = temp_dir.path().canonicalize()?;

        Ok(Self {
            temp_dir,
            project_path,
            config_dir,
        })
    }

    /// Detached shell environment rooted at the project, with HOME pointing
    /// there too
    pub fn shell_env(&self) -> ShellEnvironment {
        let path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
        ShellEnvironment::isolated(
            &self.project_path,
            [
                ("PATH".to_string(), path),
                ("HOME".to_string(), self.project_path.display().to_string()),
            ],
        )
    }

    pub fn engine(&self) -> Engine {
        Engine::new(self.shell_env(), Executor::new("sh"), ContextBuffer::new(20))
    }

    /// Run the uterm binary with the given arguments, feeding `stdin` to it
    pub async fn run_uterm(&self, args: &[&str], stdin: &str) -> Result<std::process::Output> {
        self.run_uterm_with_env(args, stdin, &[]).await
    }

    /// Like [`run_uterm`](Self::run_uterm), with extra environment variables
    pub async fn run_uterm_with_env(
        &self,
        args: &[&str],
        stdin: &str,
        vars: &[(&str, &str)],
    ) -> Result<std::process::Output> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_uterm"))
            .args(args)
            .current_dir(&self.project_path)
            .env("XDG_CONFIG_HOME", self.config_dir.path().join("config"))
            .env("XDG_DATA_HOME", self.config_dir.path().join("data"))
            .env_remove("ANTHROPIC_API_KEY")
            .envs(vars.iter().copied())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to run uterm: {}", e))?;

        if let Some(mut input) = child.stdin.take() {
            input.write_all(stdin.as_bytes()).await?;
        }

        Ok(child.wait_with_output().await?)
    }

    /// Where the binary keeps its config file under this environment
    pub fn config_file(&self) -> PathBuf {
        self.config_dir
            .path()
            .join("config")
            .join("uterm")
            .join("config.toml")
    }
}

/// Assistant returning a fixed reply and recording what it was asked
#[derive(Clone, Default)]
pub struct ScriptedAssistant {
    pub reply: String,
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub snapshots: Arc<Mutex<Vec<ContextSnapshot>>>,
}

impl ScriptedAssistant {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    async fn ask(&self, prompt: &str, context: &ContextSnapshot) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.snapshots.lock().unwrap().push(context.clone());
        self.reply.clone()
    }

    async fn help(
        &self,
        command: &str,
        _result: &ExecutionResult,
        context: &ContextSnapshot,
    ) -> String {
        self.prompts.lock().unwrap().push(format!("help: {}", command));
        self.snapshots.lock().unwrap().push(context.clone());
        self.reply.clone()
    }
}

/// Answers confirmation questions from a fixed script; runs out as end of input
pub struct ScriptedAnswers {
    answers: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedAnswers {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Confirm for ScriptedAnswers {
    fn confirm(&mut self, question: &str) -> Option<bool> {
        self.asked.push(question.to_string());
        self.answers.pop_front()
    }
}

/// Assert that a string contains the given text
pub fn assert_contains(text: &str, needle: &str) {
    assert!(
        text.contains(needle),
        "Expected '{}' to contain '{}'",
        text,
        needle
    );
}

/// Convert process output to a string
pub fn output_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Convert process stderr to a string
pub fn stderr_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
