//! Contract Tests for the Process Session Lifecycle
//!
//! Created -> Running -> {Succeeded, Failed, Killed}, driven directly
//! through `Session` without the supervisor.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;

use promptbridge::collector::{AnswerCollector, ScriptedReply, ScriptedResponder};
use promptbridge::config::{EnvironmentConfig, SessionConfig};
use promptbridge::display::MemoryDisplay;
use promptbridge::models::SessionState;
use promptbridge::prompt::PromptClassifier;
use promptbridge::session::{EnvironmentSpec, Session, SessionOutcome, SessionSpec};
use promptbridge::Error;
use tokio_test::{assert_err, assert_ok};

fn build(program: &str, script: &str, replies: Vec<ScriptedReply>) -> (Session, MemoryDisplay) {
    let display = MemoryDisplay::new();
    let spec = SessionSpec {
        program: PathBuf::from(program),
        args: vec!["-c".to_string(), script.to_string()],
        working_directory: std::env::temp_dir(),
        environment: EnvironmentSpec::from_current_process(&EnvironmentConfig::default(), None),
    };
    let config = SessionConfig {
        kill_grace_ms: 200,
        read_buffer_size: 16,
        ..SessionConfig::default()
    };
    let session = Session::new(
        spec,
        Arc::new(display.clone()),
        Arc::new(PromptClassifier::new()),
        AnswerCollector::new(Arc::new(ScriptedResponder::new(replies))),
        config,
    );
    (session, display)
}

#[tokio::test]
async fn test_new_session_is_created() {
    let (session, _) = build("/bin/sh", "true", vec![]);
    assert_eq!(session.state(), SessionState::Created);
    assert!(session.record().pid.is_none());
    assert!(session.record().exit_code.is_none());
    assert_eq!(session.stdout(), "");
}

#[tokio::test]
async fn test_success_path() {
    let (mut session, _) = build("/bin/sh", "echo done", vec![]);
    let outcome = assert_ok!(session.run().await);

    assert_eq!(outcome, SessionOutcome::Succeeded);
    assert_eq!(session.state(), SessionState::Succeeded);
    assert_eq!(session.record().exit_code, Some(0));
    assert!(session.record().pid.is_some());
    assert!(session.record().execution_duration().is_some());
}

#[tokio::test]
async fn test_failure_path_keeps_code() {
    let (mut session, _) = build("/bin/sh", "exit 42", vec![]);
    let outcome = assert_ok!(session.run().await);

    assert_eq!(outcome, SessionOutcome::Failed { code: 42 });
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.record().exit_code, Some(42));
}

#[tokio::test]
async fn test_spawn_error_goes_to_killed() {
    let (mut session, display) = build("/nonexistent/sh", "true", vec![]);
    let outcome = assert_ok!(session.run().await);

    assert!(matches!(outcome, SessionOutcome::SpawnFailed { .. }));
    assert_eq!(session.state(), SessionState::Killed);
    assert!(session.record().exit_code.is_none());
    assert!(!display.transcript().is_empty());
}

#[tokio::test]
async fn test_cancel_goes_to_killed() {
    let (mut session, _) = build(
        "/bin/sh",
        "printf 'Apply patch? [y/n]: '; read a; sleep 30",
        vec![ScriptedReply::Dismiss],
    );
    let outcome = assert_ok!(session.run().await);

    assert!(matches!(outcome, SessionOutcome::Cancelled { .. }));
    assert_eq!(session.state(), SessionState::Killed);
    assert!(session.record().exit_code.is_none());
}

#[tokio::test]
async fn test_terminal_state_cannot_rerun() {
    let (mut session, _) = build("/bin/sh", "true", vec![]);
    assert_ok!(session.run().await);
    let err = assert_err!(session.run().await);
    assert!(matches!(err, Error::InvalidSessionState { .. }));
}

#[tokio::test]
async fn test_pending_cleared_after_answer() {
    let (mut session, _) = build(
        "/bin/sh",
        "printf 'Name? '; read n; printf 'hello %s' \"$n\"",
        vec![ScriptedReply::text("ada")],
    );
    assert_ok!(session.run().await);

    // The space after the prompt is held until more output arrives
    assert_eq!(session.pending(), " hello ada");
    assert!(session.stdout().starts_with("Name?"));
    assert_eq!(session.record().prompts_answered, 1);
}

#[tokio::test]
async fn test_multibyte_output_survives_small_reads() {
    let (mut session, display) = build("/bin/sh", "printf 'héllo wörld ✓\\n'", vec![]);
    assert_ok!(session.run().await);

    assert_eq!(session.stdout(), "héllo wörld ✓\n");
    assert!(!display.transcript().contains('\u{FFFD}'));
}
