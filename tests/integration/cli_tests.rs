use anyhow::Result;
use serial_test::serial;

use crate::common::*;

#[tokio::test]
#[serial]
async fn test_cli_help() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run_uterm(&["--help"], "").await?;

    assert!(output.status.success());
    let stdout = output_to_string(&output);
    assert_contains(&stdout, "uterm");
    assert_contains(&stdout, "--shell-only");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_config_roundtrip() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .run_uterm(&["config", "--model", "claude-test-model"], "")
        .await?;
    assert!(output.status.success(), "{}", stderr_to_string(&output));
    assert_contains(&output_to_string(&output), "Model updated");

    let output = env.run_uterm(&["config", "--show"], "").await?;
    assert!(output.status.success());
    assert_contains(&output_to_string(&output), "model = \"claude-test-model\"");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_environment_api_key_is_never_saved() -> Result<()> {
    let env = TestEnvironment::new()?;
    let secret = "sk-ant-from-environment";

    let output = env
        .run_uterm_with_env(
            &["config", "--model", "claude-test-model"],
            "",
            &[("ANTHROPIC_API_KEY", secret)],
        )
        .await?;
    assert!(output.status.success(), "{}", stderr_to_string(&output));

    let saved = std::fs::read_to_string(env.config_file())?;
    assert_contains(&saved, "model = \"claude-test-model\"");
    assert!(!saved.contains(secret));
    assert!(!saved.contains("api_key"));

    let output = env
        .run_uterm_with_env(&["config", "--show"], "", &[("ANTHROPIC_API_KEY", secret)])
        .await?;
    assert!(!output_to_string(&output).contains(secret));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_session_runs_commands_until_exit() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env
        .run_uterm(
            &["--shell-only"],
            "echo integration-marker\nexport UTERM_TEST=42\necho \"v=$UTERM_TEST\"\nexit\necho never\n",
        )
        .await?;

    assert!(output.status.success(), "{}", stderr_to_string(&output));
    let stdout = output_to_string(&output);
    assert_contains(&stdout, "integration-marker");
    assert_contains(&stdout, "v=42");
    assert!(!stdout.contains("never"));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_end_of_input_ends_session() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run_uterm(&["--shell-only"], "").await?;

    assert_eq!(output.status.code(), Some(0));
    assert_contains(&output_to_string(&output), "Goodbye!");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_start_directory() -> Result<()> {
    let env = TestEnvironment::new()?;
    std::fs::create_dir(env.project_path.join("start-here"))?;

    let output = env
        .run_uterm(&["--shell-only", "--path", "start-here"], "pwd\n")
        .await?;

    assert!(output.status.success(), "{}", stderr_to_string(&output));
    assert_contains(
        &output_to_string(&output),
        &env.project_path.join("start-here").display().to_string(),
    );

    Ok(())
}
