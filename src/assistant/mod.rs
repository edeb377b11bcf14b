//! Natural-language assistant used for prompts and failed-command help.
//!
//! The session only depends on the [`Assistant`] trait. The bundled
//! implementation streams responses from the Anthropic Messages API, echoing
//! text to the terminal as it arrives. Failures never propagate: they are
//! reported on stderr and turned into an empty response.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::AssistantConfig;
use crate::context::ContextBuffer;
use crate::shell::{ExecutionResult, ShellEnvironment};

pub mod snippets;

pub use snippets::extract_shell_snippets;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// What the assistant is told about the user's situation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub cwd: PathBuf,
    /// Rendered context buffer
    pub activity: String,
}

impl ContextSnapshot {
    pub fn capture(env: &ShellEnvironment, context: &ContextBuffer) -> Self {
        Self {
            cwd: env.cwd().to_path_buf(),
            activity: context.format(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are an AI assistant integrated into a terminal called Universal Terminal (uterm).\n\
             You help users with shell commands, programming, and general questions.\n\
             Be concise and practical. When suggesting commands, show them directly in fenced code blocks.\n\
             Current working directory: {}\n\
             \n\
             Recent terminal activity:\n\
             {}",
            self.cwd.display(),
            self.activity
        )
    }
}

/// An assistant the session can consult. An empty response means the
/// assistant was unavailable or failed.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Answer a natural-language request
    async fn ask(&self, prompt: &str, context: &ContextSnapshot) -> String;

    /// Explain why `command` failed and suggest a fix
    async fn help(&self, command: &str, result: &ExecutionResult, context: &ContextSnapshot) -> String;
}

/// The user message sent when asking for help with a failed command
pub fn help_message(command: &str, result: &ExecutionResult) -> String {
    let mut lines = vec![
        format!("The following command failed with exit code {}:", result.exit_code),
        format!("$ {}", command),
    ];
    if !result.stdout.is_empty() {
        lines.push(format!("stdout:\n{}", result.stdout));
    }
    if !result.stderr.is_empty() {
        lines.push(format!("stderr:\n{}", result.stderr));
    }
    lines.push("Please explain what went wrong and suggest a fix. Be concise.".to_string());
    lines.join("\n")
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Streaming client for the Anthropic Messages API
pub struct AnthropicAssistant {
    api_key: String,
    model: String,
    max_tokens: usize,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicAssistant {
    pub fn new(api_key: String, model: String, max_tokens: usize) -> Self {
        Self {
            api_key,
            model,
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `None` when neither the config nor ANTHROPIC_API_KEY provides a key
    pub fn from_config(config: &AssistantConfig) -> Option<Self> {
        let api_key = config.resolved_api_key()?;
        let assistant = Self::new(api_key, config.model.clone(), config.max_tokens);
        Some(match &config.base_url {
            Some(url) => assistant.with_base_url(url.as_str()),
            None => assistant,
        })
    }

    /// Print a framed, streamed response; errors become an empty string.
    async fn exchange(&self, auto_help: bool, system: &str, user: &str) -> String {
        print!("{}", header(auto_help));
        println!();
        let _ = io::stdout().flush();

        match self.stream_response(system, user).await {
            Ok(text) => {
                println!();
                print!("{}", footer());
                let _ = io::stdout().flush();
                text
            }
            Err(e) => {
                tracing::warn!("Assistant request failed: {:#}", e);
                eprintln!("\n(assistant error: {:#})", e);
                String::new()
            }
        }
    }

    async fn stream_response(&self, system: &str, user: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![RequestMessage {
                role: "user",
                content: user,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .context("Failed to reach the assistant API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let mut full_response = String::new();
        let mut buffer: Vec<u8> = Vec::new();
        let mut bytes_stream = response.bytes_stream();

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = chunk.context("Error reading response stream")?;
            buffer.extend_from_slice(&chunk);

            // Process complete SSE messages (double newline separated)
            while let Some(pos) = find_event_end(&buffer) {
                let message: Vec<u8> = buffer.drain(..pos + 2).collect();
                let message = String::from_utf8_lossy(&message);
                if let Some(text) = parse_sse_message(&message)? {
                    print!("{}", text);
                    let _ = io::stdout().flush();
                    full_response.push_str(&text);
                }
            }
        }

        Ok(full_response)
    }
}

#[async_trait]
impl Assistant for AnthropicAssistant {
    async fn ask(&self, prompt: &str, context: &ContextSnapshot) -> String {
        self.exchange(false, &context.system_prompt(), prompt).await
    }

    async fn help(&self, command: &str, result: &ExecutionResult, context: &ContextSnapshot) -> String {
        let message = help_message(command, result);
        self.exchange(true, &context.system_prompt(), &message).await
    }
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Text carried by one SSE message, if any. Stream-level errors fail the
/// whole response.
fn parse_sse_message(message: &str) -> Result<Option<String>> {
    let Some(data) = message.lines().find_map(|line| line.strip_prefix("data:")) else {
        return Ok(None);
    };

    match serde_json::from_str::<StreamEvent>(data.trim()) {
        Ok(StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        }) => Ok(Some(text)),
        Ok(StreamEvent::Error { error }) => anyhow::bail!("stream error: {}", error.message),
        Ok(_) => Ok(None),
        Err(e) => {
            tracing::debug!("Ignoring unparseable stream event: {}", e);
            Ok(None)
        }
    }
}

fn header(auto_help: bool) -> &'static str {
    if auto_help {
        "\n\x1b[2m--- \x1b[1;36mAssistant (auto-help)\x1b[0m\x1b[2m ---\x1b[0m"
    } else {
        "\n\x1b[2m--- \x1b[1;35mAssistant\x1b[0m\x1b[2m ---\x1b[0m"
    }
}

fn footer() -> &'static str {
    "\x1b[2m---\x1b[0m\n"
}
