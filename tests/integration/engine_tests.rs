use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serial_test::serial;
use uterm::context::ContextEntry;
use uterm::session::Flow;

use crate::common::*;

fn inputs(engine: &uterm::session::Engine) -> Vec<String> {
    engine
        .context()
        .entries()
        .map(|e| e.input().to_string())
        .collect()
}

fn last_output(engine: &uterm::session::Engine) -> Option<String> {
    engine
        .context()
        .entries()
        .last()
        .and_then(|e| e.output().map(str::to_string))
}

#[tokio::test]
#[serial]
async fn test_ls_tmp_is_captured() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut engine = env.engine();

    let flow = engine.dispatch("ls -la /tmp", &mut ScriptedAnswers::new(&[])).await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(engine.last_exit_code(), 0);
    match engine.context().entries().last() {
        Some(ContextEntry::Command {
            input,
            output,
            exit_code,
            cwd,
            ..
        }) => {
            assert_eq!(input, "ls -la /tmp");
            assert!(output.as_deref().is_some_and(|o| !o.is_empty()));
            assert_eq!(*exit_code, Some(0));
            assert_eq!(cwd, &env.project_path);
        }
        other => panic!("Expected a command entry, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_cd_and_back() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.temp_dir.child("sub/inner").create_dir_all()?;
    let mut engine = env.engine();
    let mut answers = ScriptedAnswers::new(&[]);

    engine.dispatch("cd sub/inner", &mut answers).await;
    assert_eq!(engine.env().cwd(), env.project_path.join("sub/inner"));

    engine.dispatch("cd -", &mut answers).await;
    assert_eq!(engine.env().cwd(), env.project_path);

    // Children run where the session is
    engine.dispatch("cd sub", &mut answers).await;
    engine.dispatch("pwd", &mut answers).await;
    assert_eq!(
        last_output(&engine).map(|o| o.trim().to_string()),
        Some(env.project_path.join("sub").display().to_string())
    );

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_cd_failure_is_recorded() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut engine = env.engine();

    engine
        .dispatch("cd /nonexistent", &mut ScriptedAnswers::new(&[]))
        .await;

    assert_eq!(engine.last_exit_code(), 1);
    assert_eq!(engine.env().cwd(), env.project_path);
    assert!(last_output(&engine).is_some_and(|o| o.starts_with("cd: ")));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_exported_variables_reach_children() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut engine = env.engine();
    let mut answers = ScriptedAnswers::new(&[]);

    engine.dispatch("export GREETING=\"hello there\"", &mut answers).await;
    engine.dispatch("echo \"$GREETING\"", &mut answers).await;
    assert_eq!(last_output(&engine).as_deref(), Some("hello there\n"));

    engine.dispatch("unset GREETING", &mut answers).await;
    engine.dispatch("echo \"[$GREETING]\"", &mut answers).await;
    assert_eq!(last_output(&engine).as_deref(), Some("[]\n"));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_accepted_snippet_runs_and_is_recorded() -> Result<()> {
    let env = TestEnvironment::new()?;
    let assistant = ScriptedAssistant::replying(
        "Sure:\n```bash\necho snippet-ran > out.txt\n```\nIn Python:\n```python\nprint(1)\n```\n",
    );
    let mut engine = env.engine().with_assistant(Box::new(assistant.clone()));
    let mut answers = ScriptedAnswers::new(&[true]);

    let flow = engine.dispatch("please write a file", &mut answers).await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(answers.asked.len(), 1);
    assert_contains(&answers.asked[0], "echo snippet-ran > out.txt");
    assert_contains(&answers.asked[0], "Run? [Y/n]");
    env.temp_dir
        .child("out.txt")
        .assert(predicate::str::contains("snippet-ran"));
    assert_eq!(
        inputs(&engine),
        vec!["please write a file", "echo snippet-ran > out.txt"]
    );
    assert_eq!(*assistant.prompts.lock().unwrap(), vec!["please write a file"]);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_snippet_builtins_change_session_state() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.temp_dir.child("project").create_dir_all()?;
    let assistant = ScriptedAssistant::replying("```sh\ncd project\n```\n```\nexit\n```");
    let mut engine = env.engine().with_assistant(Box::new(assistant));

    // Accept the cd, then input ends before the exit snippet is confirmed
    let flow = engine
        .dispatch("switch to the project folder", &mut ScriptedAnswers::new(&[true]))
        .await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(engine.env().cwd(), env.project_path.join("project"));

    let flow = engine
        .dispatch("switch to the project folder", &mut ScriptedAnswers::new(&[false, true]))
        .await;
    assert_eq!(flow, Flow::Exit);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_assistant_sees_recent_activity() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.temp_dir.child("notes.txt").write_str("remember the milk\n")?;
    let assistant = ScriptedAssistant::replying("It is a shopping note.");
    let mut engine = env.engine().with_assistant(Box::new(assistant.clone()));
    let mut answers = ScriptedAnswers::new(&[]);

    engine.dispatch("cat notes.txt", &mut answers).await;
    engine.dispatch("what is this file about", &mut answers).await;

    let snapshots = assistant.snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].cwd, env.project_path);
    assert_contains(&snapshots[0].activity, "$ cat notes.txt\nremember the milk");
    assert_eq!(
        inputs(&engine),
        vec!["cat notes.txt", "what is this file about"]
    );

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_auto_help_after_failure() -> Result<()> {
    let env = TestEnvironment::new()?;
    let assistant = ScriptedAssistant::replying("`false` always fails.");
    let mut engine = env.engine().with_assistant(Box::new(assistant.clone()));

    engine.dispatch("false", &mut ScriptedAnswers::new(&[])).await;

    assert_eq!(engine.last_exit_code(), 1);
    assert_eq!(*assistant.prompts.lock().unwrap(), vec!["help: false"]);
    // The failed command is already in the context the assistant saw
    assert_contains(
        &assistant.snapshots.lock().unwrap()[0].activity,
        "$ false\n(exit code: 1)",
    );
    assert_eq!(inputs(&engine), vec!["false", "auto-help for: false"]);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_interrupted_command_skips_auto_help() -> Result<()> {
    let env = TestEnvironment::new()?;
    let assistant = ScriptedAssistant::replying("unused");
    let mut engine = env.engine().with_assistant(Box::new(assistant.clone()));

    engine.dispatch("kill -INT $$", &mut ScriptedAnswers::new(&[])).await;

    assert_eq!(engine.last_exit_code(), 130);
    assert!(assistant.prompts.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_empty_reply_is_not_recorded() -> Result<()> {
    let env = TestEnvironment::new()?;
    let assistant = ScriptedAssistant::replying("");
    let mut engine = env.engine().with_assistant(Box::new(assistant.clone()));

    engine
        .dispatch("how do I find large files", &mut ScriptedAnswers::new(&[]))
        .await;

    assert_eq!(assistant.prompts.lock().unwrap().len(), 1);
    assert!(engine.context().is_empty());

    Ok(())
}
