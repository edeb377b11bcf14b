use crate::shell::ShellEnvironment;
use crate::utils::abbreviate_home;

/// Build the prompt: the cwd (with HOME shown as `~`) followed by a status
/// marker that turns red after a failed command.
pub fn render_prompt(env: &ShellEnvironment, last_exit_code: i32) -> String {
    let location = abbreviate_home(env.cwd(), env.var("HOME"));

    let status_indicator = if last_exit_code == 0 {
        "\x1b[1;32m$\x1b[0m" // Green
    } else {
        "\x1b[1;31m$\x1b[0m" // Red
    };

    format!("\x1b[36m{}\x1b[0m {} ", location, status_indicator)
}
