//! The dispatch engine and the interactive loop around it.
//!
//! Every line goes through [`Engine::dispatch`]: it is classified, commands
//! run through the builtin handler or the executor, and prompts go to the
//! assistant, whose shell snippets are offered back to the user.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::assistant::{extract_shell_snippets, AnthropicAssistant, Assistant, ContextSnapshot};
use crate::config::Config;
use crate::context::{ContextBuffer, ContextEntry};
use crate::repl::{
    classify, render_prompt, Classification, CommandIndex, Completer, Confirm, LineEditor,
};
use crate::shell::{builtins, BuiltinOutcome, ExecutionResult, Executor, ShellEnvironment};

/// Exit code a child reports when it was stopped with Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Whether the session should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// What running one command line did
enum Ran {
    Exit,
    Builtin,
    Process(ExecutionResult),
}

/// Owns all session state and routes each input line
pub struct Engine {
    env: ShellEnvironment,
    index: Arc<CommandIndex>,
    context: ContextBuffer,
    executor: Executor,
    assistant: Option<Box<dyn Assistant>>,
    auto_help: bool,
    last_exit_code: i32,
}

impl Engine {
    pub fn new(env: ShellEnvironment, executor: Executor, context: ContextBuffer) -> Self {
        let index = Arc::new(CommandIndex::build(&env));
        Self {
            env,
            index,
            context,
            executor,
            assistant: None,
            auto_help: true,
            last_exit_code: 0,
        }
    }

    pub fn from_config(config: &Config, env: ShellEnvironment) -> Self {
        let context = ContextBuffer::with_output_limit(
            config.shell.context_size,
            config.shell.max_output_chars,
        );
        Self::new(env, Executor::from_config(&config.shell), context)
            .with_auto_help(config.shell.auto_help)
    }

    pub fn with_assistant(mut self, assistant: Box<dyn Assistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn with_auto_help(mut self, enabled: bool) -> Self {
        self.auto_help = enabled;
        self
    }

    pub fn env(&self) -> &ShellEnvironment {
        &self.env
    }

    pub fn index(&self) -> &Arc<CommandIndex> {
        &self.index
    }

    pub fn context(&self) -> &ContextBuffer {
        &self.context
    }

    pub fn last_exit_code(&self) -> i32 {
        self.last_exit_code
    }

    pub fn has_assistant(&self) -> bool {
        self.assistant.is_some()
    }

    /// Handle one line of input.
    pub async fn dispatch(&mut self, line: &str, confirm: &mut dyn Confirm) -> Flow {
        let line = line.trim();

        match classify(line, &self.index) {
            Classification::Empty => Flow::Continue,
            Classification::Command => self.dispatch_command(line).await,
            Classification::Prompt => self.dispatch_prompt(line, confirm).await,
        }
    }

    async fn dispatch_command(&mut self, line: &str) -> Flow {
        let result = match self.run_command(line).await {
            Ran::Exit => return Flow::Exit,
            Ran::Builtin => return Flow::Continue,
            Ran::Process(result) => result,
        };

        if result.success() || result.exit_code == INTERRUPTED_EXIT_CODE || !self.auto_help {
            return Flow::Continue;
        }

        let Some(assistant) = &self.assistant else {
            return Flow::Continue;
        };

        let snapshot = ContextSnapshot::capture(&self.env, &self.context);
        let response = assistant.help(line, &result, &snapshot).await;
        if !response.is_empty() {
            self.context
                .add(ContextEntry::assistant(format!("auto-help for: {}", line), response));
        }

        Flow::Continue
    }

    async fn dispatch_prompt(&mut self, line: &str, confirm: &mut dyn Confirm) -> Flow {
        let Some(assistant) = &self.assistant else {
            println!(
                "\x1b[33mAssistant is not available (no API key). Try running it as a shell command.\x1b[0m"
            );
            return Flow::Continue;
        };

        let snapshot = ContextSnapshot::capture(&self.env, &self.context);
        let response = assistant.ask(line, &snapshot).await;
        if response.is_empty() {
            return Flow::Continue;
        }

        let snippets = extract_shell_snippets(&response);
        self.context.add(ContextEntry::assistant(line, response));

        for snippet in snippets {
            let question = format!(
                "\x1b[2m  $ \x1b[0m\x1b[1m{}\x1b[0m\x1b[2m  Run? [Y/n] \x1b[0m",
                snippet
            );
            match confirm.confirm(&question) {
                None => break,
                Some(false) => continue,
                Some(true) => {
                    if let Ran::Exit = self.run_command(&snippet).await {
                        return Flow::Exit;
                    }
                }
            }
        }

        Flow::Continue
    }

    /// Builtins first, then the executor. The outcome is recorded in the
    /// context buffer either way.
    async fn run_command(&mut self, line: &str) -> Ran {
        let path_before = self.env.var("PATH").map(str::to_string);

        match builtins::handle(line, &mut self.env) {
            BuiltinOutcome::Exit => Ran::Exit,
            BuiltinOutcome::Handled(result) => {
                if let Some(output) = &result.output {
                    println!("{}", output);
                }
                self.last_exit_code = result.exit_code;
                self.context.add(ContextEntry::command(
                    line,
                    result.output,
                    Some(result.exit_code),
                    self.env.cwd(),
                ));

                if self.env.var("PATH") != path_before.as_deref() {
                    self.refresh_index();
                }
                Ran::Builtin
            }
            BuiltinOutcome::NotHandled => {
                let result = self.executor.execute(line, &self.env).await;
                self.last_exit_code = result.exit_code;
                self.context.add(ContextEntry::command(
                    line,
                    Some(combined_output(&result)),
                    Some(result.exit_code),
                    self.env.cwd(),
                ));
                Ran::Process(result)
            }
        }
    }

    fn refresh_index(&mut self) {
        tracing::debug!("PATH changed, rebuilding command index");
        self.index = Arc::new(CommandIndex::build(&self.env));
    }
}

/// stdout and stderr joined with a newline, skipping empty streams
fn combined_output(result: &ExecutionResult) -> String {
    [result.stdout.as_str(), result.stderr.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_welcome(assistant_available: bool, shell_only: bool) {
    println!(
        "\x1b[1;36mUniversal Terminal\x1b[0m\x1b[2m (uterm v{})\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    if assistant_available {
        println!("\x1b[2mAssistant is available. Type natural language for help.\x1b[0m");
    } else if shell_only {
        println!("\x1b[2mRunning in shell-only mode\x1b[0m");
    } else {
        println!("\x1b[33mNo ANTHROPIC_API_KEY found, running in shell-only mode\x1b[0m");
    }
    println!();
}

/// Run the interactive session until `exit` or end of input
pub async fn run_session(config: Config, path: Option<PathBuf>, shell_only: bool) -> Result<()> {
    let mut env = ShellEnvironment::from_process()?;
    if let Some(path) = path {
        env.set_cwd(&path)
            .with_context(|| format!("Cannot start in {}", path.display()))?;
    }

    let mut engine = Engine::from_config(&config, env);
    if !shell_only {
        if let Some(assistant) = AnthropicAssistant::from_config(&config.assistant) {
            engine = engine.with_assistant(Box::new(assistant));
        }
    }
    tracing::info!(
        "Session started with {} known commands, interpreter {}",
        engine.index().len(),
        engine.executor.interpreter().display()
    );

    print_welcome(engine.has_assistant(), shell_only);

    let completer = Completer::new(Arc::clone(engine.index()), engine.env());
    let mut editor = LineEditor::new(completer, config.shell.history_size, Config::history_path())?;

    loop {
        editor.sync(engine.env(), engine.index());
        let prompt = render_prompt(engine.env(), engine.last_exit_code());

        let Some(line) = tokio::task::block_in_place(|| editor.read_line(&prompt))? else {
            println!("\n\x1b[2mGoodbye!\x1b[0m");
            break;
        };

        if engine.dispatch(&line, &mut editor).await == Flow::Exit {
            break;
        }
    }

    editor.save_history();
    Ok(())
}
