use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"```([^\n`]*)\r?\n([\s\S]*?)```").unwrap();
}

/// Fence tags treated as runnable shell; an untagged fence counts too
const SHELL_LANGS: &[&str] = &["", "bash", "sh", "zsh", "shell"];

/// Extract runnable shell snippets from an assistant response, in order.
///
/// Blocks tagged with another language (python, json, ...) are skipped, as
/// are empty blocks.
pub fn extract_shell_snippets(response: &str) -> Vec<String> {
    FENCED_BLOCK
        .captures_iter(response)
        .filter(|caps| SHELL_LANGS.contains(&fence_language(&caps[1]).as_str()))
        .map(|caps| caps[2].trim().to_string())
        .filter(|code| !code.is_empty())
        .collect()
}

/// First word of a fence's info string, lowercased
fn fence_language(info: &str) -> String {
    info.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}
