//! Integration tests for uterm
//!
//! These tests drive the dispatch engine end to end against a real `sh`,
//! talk to a mocked assistant API, and run the compiled binary.

// Test utilities and common setup
mod common;

mod cli_tests;
mod engine_tests;

// Re-export common utilities for use by test modules
pub use common::*;
