// Library exports for uterm
// This allows the modules to be imported in tests and external code

pub mod assistant;
pub mod config;
pub mod context;
pub mod repl;
pub mod session;
pub mod shell;
pub mod utils;
