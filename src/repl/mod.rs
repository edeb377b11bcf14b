//! Everything between the keyboard and the dispatch engine

pub mod classifier;
pub mod command_index;
pub mod completer;
pub mod input;
pub mod prompt;

pub use classifier::{classify, tokenize, Classification};
pub use command_index::CommandIndex;
pub use completer::{Completer, Completion};
pub use input::{parse_answer, Confirm, LineEditor, ShellHelper};
pub use prompt::render_prompt;
