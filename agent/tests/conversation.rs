//! End-to-end turn scenarios.
//!
//! These drive `run_turn` with a scripted model and approver against a real
//! temporary working directory, covering the user-visible cycles: answer,
//! command + summary, file creation, and the bounded fix loop.

use std::fs;

use pretty_assertions::assert_eq;

use ollama_agent::chat::{MAX_RETRIES, RETRY_PROMPT, Session, TurnEvent, run_turn};
use ollama_agent::core::types::{Role, TurnOutcome};
use ollama_agent::executor::{ActionExecutor, ExecutorConfig};
use ollama_agent::io::approvals::ApprovalStore;
use ollama_agent::io::cancel::CancelToken;
use ollama_agent::io::console::ApprovalAnswer;
use ollama_agent::test_support::{
    ScriptedApprover, ScriptedModel, ScriptedShell, failed_output, ok_output,
};

fn session() -> Session {
    Session::new("llama3", "http://localhost:11434", "en", true)
}

/// Prompt "list files": the command is approved, runs, and the model is
/// asked for a summary, which ends the turn.
#[test]
fn command_is_approved_run_and_summarized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = ScriptedModel::new(vec![
        "I'll list the files.\n@@COMMAND@@\nls\n@@COMMAND@@",
        "There are two files: a.txt and b.txt.",
    ]);
    let shell = ScriptedShell::new(vec![ok_output("a.txt\nb.txt\n")]);
    let approver = ScriptedApprover::new(vec![ApprovalAnswer::Once]);
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::in_memory(),
        ExecutorConfig::new(temp.path()),
    );
    let mut session = session();

    let outcome = run_turn(
        &mut session,
        "list files",
        &model,
        &mut executor,
        &CancelToken::new(),
        |_| {},
    )
    .expect("turn");

    assert_eq!(
        outcome,
        TurnOutcome::Answered {
            text: "There are two files: a.txt and b.txt.".to_string()
        }
    );
    assert_eq!(shell.commands(), vec!["ls".to_string()]);
    assert_eq!(approver.asked_about(), vec!["ls".to_string()]);
    assert_eq!(model.request_count(), 2);

    let follow_up = &model.requests()[1];
    let roles: Vec<Role> = follow_up.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::User]
    );
    let tool: serde_json::Value =
        serde_json::from_str(&follow_up[3].content).expect("tool message is json");
    assert_eq!(tool["success"], true);
    assert_eq!(tool["stdout"], "a.txt\nb.txt\n");
    assert!(follow_up[4].content.contains("Please summarize this output"));
    assert_eq!(session.retry_count(), 0);
}

/// Prompt "create hello.txt with content A": an empty OLD block creates the file.
#[test]
fn replace_block_with_empty_old_creates_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = ScriptedModel::new(vec![
        "Creating the file.\n@@REPLACE_FILE@@\nhello.txt\n---OLD---\n---NEW---\nA\n@@REPLACE_FILE@@",
        "Created hello.txt.",
    ]);
    let shell = ScriptedShell::new(Vec::new());
    let approver = ScriptedApprover::new(vec![ApprovalAnswer::Once]);
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::in_memory(),
        ExecutorConfig::new(temp.path()),
    );
    let mut session = session();
    let mut retries = 0;

    let outcome = run_turn(
        &mut session,
        "create hello.txt with content A",
        &model,
        &mut executor,
        &CancelToken::new(),
        |event| {
            if matches!(event, TurnEvent::Retrying { .. }) {
                retries += 1;
            }
        },
    )
    .expect("turn");

    assert!(outcome.is_success());
    assert_eq!(retries, 0);
    assert_eq!(
        fs::read_to_string(temp.path().join("hello.txt")).expect("read created file"),
        "A"
    );
    let tool: serde_json::Value =
        serde_json::from_str(&model.requests()[1][3].content).expect("tool json");
    assert_eq!(tool["message"], "File hello.txt has been created.");
}

/// A conversational reply ends the turn with no tool use.
#[test]
fn conversational_reply_appends_only_two_messages() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = ScriptedModel::new(vec!["Rust is a systems programming language."]);
    let shell = ScriptedShell::new(Vec::new());
    let approver = ScriptedApprover::new(Vec::new());
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::in_memory(),
        ExecutorConfig::new(temp.path()),
    );
    let mut session = session();

    let outcome = run_turn(
        &mut session,
        "what is rust?",
        &model,
        &mut executor,
        &CancelToken::new(),
        |_| {},
    )
    .expect("turn");

    assert!(outcome.is_success());
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[2].content, "Rust is a systems programming language.");
    assert!(shell.commands().is_empty());
    assert_eq!(approver.asked(), 0);
}

/// Three failures in a row end the turn without a fourth model request.
#[test]
fn retry_budget_stops_after_three_failures() {
    let temp = tempfile::tempdir().expect("tempdir");
    let model = ScriptedModel::new(vec![
        "@@COMMAND@@\nmake\n@@COMMAND@@",
        "@@COMMAND@@\nmake all\n@@COMMAND@@",
        "@@COMMAND@@\nmake build\n@@COMMAND@@",
        "this reply must never be requested",
    ]);
    let shell = ScriptedShell::new(vec![
        failed_output(2, "", "no rule"),
        failed_output(2, "", "no rule"),
        failed_output(2, "", "no rule to make target 'build'"),
    ]);
    let approver = ScriptedApprover::new(vec![ApprovalAnswer::Once]);
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::in_memory(),
        ExecutorConfig::new(temp.path()),
    );
    let mut session = session();
    let mut retry_events = Vec::new();

    let outcome = run_turn(
        &mut session,
        "build it",
        &model,
        &mut executor,
        &CancelToken::new(),
        |event| {
            if let TurnEvent::Retrying { attempt, .. } = event {
                retry_events.push(*attempt);
            }
        },
    )
    .expect("turn");

    match outcome {
        TurnOutcome::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, MAX_RETRIES);
            assert!(last_error.contains("make build"));
        }
        other => panic!("expected retries exhausted, got {other:?}"),
    }
    assert_eq!(model.request_count(), 3);
    assert_eq!(retry_events, vec![1, 2]);
    assert_eq!(shell.commands().len(), 3);
    // Only the first command prompted; the fixes ran in correction mode.
    assert_eq!(approver.asked(), 1);
    let last_request = &model.requests()[2];
    assert_eq!(
        last_request.last().map(|m| m.content.as_str()),
        Some(RETRY_PROMPT)
    );
}

/// Missing old content is a recoverable failure: the model gets a fix request
/// and the file stays untouched.
#[test]
fn failed_replacement_is_fed_back_and_file_is_unchanged() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("config.txt"), "port = 80\n").expect("seed file");
    let model = ScriptedModel::new(vec![
        "@@REPLACE_FILE@@\nconfig.txt\n---OLD---\nport = 8080\n---NEW---\nport = 9090\n@@REPLACE_FILE@@",
        "@@REPLACE_FILE@@\nconfig.txt\n---OLD---\nport = 80\n---NEW---\nport = 9090\n@@REPLACE_FILE@@",
        "Updated the port.",
    ]);
    let shell = ScriptedShell::new(Vec::new());
    let approver = ScriptedApprover::new(vec![ApprovalAnswer::Once]);
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::in_memory(),
        ExecutorConfig::new(temp.path()),
    );
    let mut session = session();

    let outcome = run_turn(
        &mut session,
        "change the port to 9090",
        &model,
        &mut executor,
        &CancelToken::new(),
        |_| {},
    )
    .expect("turn");

    assert!(outcome.is_success());
    let failure: serde_json::Value =
        serde_json::from_str(&model.requests()[1][3].content).expect("tool json");
    assert_eq!(
        failure["error"],
        "Old content not found in config.txt. Cannot perform replacement."
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("config.txt")).expect("read"),
        "port = 9090\n"
    );
}

/// An "always" grant is stored on disk and honoured by a later process.
#[test]
fn always_grant_survives_restart() {
    let temp = tempfile::tempdir().expect("tempdir");
    let approvals = temp.path().join("approvals.json");
    let shell = ScriptedShell::new(vec![ok_output("clean"), ok_output("clean")]);

    {
        let model = ScriptedModel::new(vec!["@@COMMAND@@\ngit status\n@@COMMAND@@", "Clean."]);
        let approver = ScriptedApprover::new(vec![ApprovalAnswer::Always]);
        let mut executor = ActionExecutor::new(
            &shell,
            &approver,
            ApprovalStore::new(&approvals),
            ExecutorConfig::new(temp.path()),
        );
        run_turn(
            &mut session(),
            "status?",
            &model,
            &mut executor,
            &CancelToken::new(),
            |_| {},
        )
        .expect("first turn");
        assert_eq!(approver.asked(), 1);
    }

    let model = ScriptedModel::new(vec!["@@COMMAND@@\ngit diff\n@@COMMAND@@", "No changes."]);
    let approver = ScriptedApprover::new(Vec::new());
    let mut executor = ActionExecutor::new(
        &shell,
        &approver,
        ApprovalStore::new(&approvals),
        ExecutorConfig::new(temp.path()),
    );
    let outcome = run_turn(
        &mut session(),
        "diff?",
        &model,
        &mut executor,
        &CancelToken::new(),
        |_| {},
    )
    .expect("second turn");

    assert!(outcome.is_success());
    assert_eq!(approver.asked(), 0);
    assert_eq!(
        shell.commands(),
        vec!["git status".to_string(), "git diff".to_string()]
    );
}
