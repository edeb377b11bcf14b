//! Builtins that must change the session's own state instead of running in a
//! child shell: `cd`, `export`, `unset` and `exit`.

use super::environment::ShellEnvironment;

/// Outcome of offering a line to the builtin handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Not a builtin; hand the line to the executor
    NotHandled,
    /// The builtin ran against the shell environment
    Handled(BuiltinResult),
    /// `exit` was requested; the session ends with code 0
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinResult {
    pub output: Option<String>,
    pub exit_code: i32,
}

impl BuiltinResult {
    fn ok() -> Self {
        Self {
            output: None,
            exit_code: 0,
        }
    }

    fn ok_with(output: String) -> Self {
        Self {
            output: (!output.is_empty()).then_some(output),
            exit_code: 0,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            output: Some(message.into()),
            exit_code: 1,
        }
    }
}

/// Run `line` if it is one of the recognised builtins.
pub fn handle(line: &str, env: &mut ShellEnvironment) -> BuiltinOutcome {
    let trimmed = line.trim();
    let (cmd, args) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (trimmed, ""),
    };

    match cmd {
        "cd" => BuiltinOutcome::Handled(change_directory(args, env)),
        "export" => BuiltinOutcome::Handled(export(args, env)),
        "unset" => BuiltinOutcome::Handled(unset(args, env)),
        "exit" => BuiltinOutcome::Exit,
        _ => BuiltinOutcome::NotHandled,
    }
}

fn change_directory(arg: &str, env: &mut ShellEnvironment) -> BuiltinResult {
    let target = if arg.is_empty() {
        match env.var("HOME") {
            Some(home) => home.to_string(),
            None => return BuiltinResult::error("cd: HOME not set"),
        }
    } else if arg == "-" {
        env.old_pwd().display().to_string()
    } else if let Some(rest) = arg.strip_prefix('~') {
        format!("{}{}", env.var("HOME").unwrap_or_default(), rest)
    } else {
        arg.to_string()
    };

    match env.set_cwd(&target) {
        Ok(()) => BuiltinResult::ok(),
        Err(e) => BuiltinResult::error(format!("cd: {}", e)),
    }
}

fn export(args: &str, env: &mut ShellEnvironment) -> BuiltinResult {
    if args.is_empty() {
        let listing = env
            .vars()
            .iter()
            .map(|(k, v)| format!("export {}=\"{}\"", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        return BuiltinResult::ok_with(listing);
    }

    for part in split_export_args(args) {
        let result = match part.split_once('=') {
            Some((key, value)) => env.set_var(key, strip_matching_quotes(value)),
            None => {
                let current = env.var(&part).map(str::to_string);
                match current {
                    Some(current) => env.set_var(&part, &current),
                    None => Ok(()),
                }
            }
        };
        if let Err(e) = result {
            tracing::debug!("export: skipping {}: {}", part, e);
        }
    }

    BuiltinResult::ok()
}

fn unset(args: &str, env: &mut ShellEnvironment) -> BuiltinResult {
    if args.is_empty() {
        return BuiltinResult::error("unset: not enough arguments");
    }

    for key in args.split_whitespace() {
        if let Err(e) = env.unset_var(key) {
            tracing::debug!("unset: skipping {}: {}", key, e);
        }
    }

    BuiltinResult::ok()
}

/// Split `export` arguments on spaces outside quotes. Quotes are kept in the
/// output and backslashes get no special treatment.
fn split_export_args(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in input.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ' ' if !in_single && !in_double => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
