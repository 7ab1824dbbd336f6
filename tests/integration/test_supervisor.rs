//! Integration Tests for the Invocation Supervisor
//!
//! Precondition ordering, outcome mapping and the one-notification rule.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use promptbridge::collector::{ScriptedReply, ScriptedResponder};
use promptbridge::display::{MemoryDisplay, NotificationLevel, OutputChannel};
use promptbridge::error::Precondition;
use promptbridge::session::SessionEvent;
use promptbridge::{Error, Invocation, SessionEventBus, Supervisor};
use test_utils::{fast_config, write_script, Harness, SHELL};
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(20);

#[tokio::test]
async fn test_missing_working_directory() {
    let h = Harness::new(vec![]);
    let script = write_script(h.dir.path(), "tool.sh", "touch spawned");
    let inv = Invocation::new(&script, SHELL, ["status"]);

    let err = h.supervisor.invoke(inv).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PreconditionMissing {
            precondition: Precondition::WorkingDirectory,
            ..
        }
    ));
    assert!(!h.dir.path().join("spawned").exists());
    assert_eq!(h.display.notifications().len(), 1);
    assert_eq!(h.display.transcript(), "");
}

#[tokio::test]
async fn test_missing_interpreter_reported_with_path() {
    let h = Harness::new(vec![]);
    let script = write_script(h.dir.path(), "tool.sh", "touch spawned");
    let inv = Invocation::new(&script, "/nonexistent/python3", ["status"])
        .in_directory(h.dir.path());

    let err = h.supervisor.invoke(inv).await.unwrap_err();
    match &err {
        Error::PreconditionMissing {
            precondition,
            path,
            suggestion,
        } => {
            assert_eq!(*precondition, Precondition::Interpreter);
            assert_eq!(path.as_deref(), Some(std::path::Path::new("/nonexistent/python3")));
            assert!(!suggestion.is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!h.dir.path().join("spawned").exists());

    let notes = h.display.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert!(notes[0].message.contains("/nonexistent/python3"));
}

#[tokio::test]
async fn test_missing_executable() {
    let h = Harness::new(vec![]);
    let inv = Invocation::new(h.dir.path().join("missing.sh"), SHELL, ["status"])
        .in_directory(h.dir.path());

    let err = h.supervisor.invoke(inv).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PreconditionMissing {
            precondition: Precondition::Executable,
            ..
        }
    ));
    assert!(err.is_precondition());
}

#[tokio::test]
async fn test_nonzero_exit_carries_code() {
    let h = Harness::new(vec![]);
    let inv = h.invocation("echo 'merge conflict' >&2; exit 3", &["merge"]);

    let err = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
    assert!(h.display.transcript().contains("merge conflict"));

    let notes = h.display.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert!(notes[0].message.contains('3'));
}

#[tokio::test]
async fn test_interpreter_that_cannot_start() {
    let h = Harness::new(vec![]);
    // Exists, but is not executable
    let interpreter = write_script(h.dir.path(), "not-a-program", "");
    let script = write_script(h.dir.path(), "tool.sh", "true");
    let inv = Invocation::new(&script, &interpreter, ["status"]).in_directory(h.dir.path());

    let err = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::SpawnFailed { .. }));
    assert_eq!(h.display.notifications().len(), 1);
    assert!(h.display.transcript().contains("not-a-program"));
}

#[tokio::test]
async fn test_every_outcome_notifies_once() {
    let h = Harness::new(vec![ScriptedReply::choice("Yes"), ScriptedReply::Dismiss]);

    let ok = h.invocation("printf 'Go? [y/n]: '; read a", &["one"]);
    h.supervisor.invoke(ok).await.unwrap();
    let cancelled = h.invocation("printf 'Go? [y/n]: '; read a; sleep 30", &["two"]);
    timeout(LIMIT, h.supervisor.invoke(cancelled))
        .await
        .unwrap()
        .unwrap_err();
    let failed = h.invocation("exit 1", &["three"]);
    h.supervisor.invoke(failed).await.unwrap_err();

    let notes = h.display.notifications();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].level, NotificationLevel::Info);
    assert_eq!(notes[1].level, NotificationLevel::Error);
    assert_eq!(notes[2].level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_event_bus_sees_lifecycle() {
    let display = MemoryDisplay::new();
    let responder = Arc::new(ScriptedResponder::new([ScriptedReply::choice("Yes")]));
    let bus = SessionEventBus::new(64);
    let mut events = bus.subscribe();
    let supervisor = Supervisor::new(
        OutputChannel::open("test", Arc::new(display)),
        responder,
        fast_config(),
    )
    .unwrap()
    .with_event_bus(bus);

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "tool.sh", "printf 'Go? [y/n]: '; read a; exit 0");
    let inv = Invocation::new(&script, SHELL, ["go"]).in_directory(dir.path());
    supervisor.invoke(inv).await.unwrap();

    let seen = events.drain();
    assert!(matches!(seen.first(), Some(SessionEvent::Started { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::PromptDetected { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::Answered { cancelled: false, .. })));
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::Exited {
            exit_code: Some(0),
            ..
        })
    ));

    let id = seen[0].session_id().to_string();
    assert!(seen.iter().all(|e| e.session_id() == id));
}

#[tokio::test]
async fn test_closed_channel_drops_output() {
    let h = Harness::new(vec![]);
    h.supervisor.display().close();
    let inv = h.invocation("echo hidden", &["status"]);

    let report = h.supervisor.invoke(inv).await.unwrap();
    assert_eq!(report.stdout, "hidden\n");
    assert_eq!(h.display.transcript(), "");
    assert!(h.display.notifications().is_empty());
}
