//! Shell state and command execution for uterm
//!
//! `cd`, `export`, `unset` and `exit` are applied in-process through
//! [`builtins`]; every other command line is handed to a real shell
//! interpreter by the [`Executor`].

pub mod builtins;
pub mod environment;
pub mod executor;

pub use builtins::{BuiltinOutcome, BuiltinResult};
pub use environment::{EnvError, ShellEnvironment};
pub use executor::{execution_mode, ExecutionMode, ExecutionResult, Executor};
