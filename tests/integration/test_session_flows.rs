//! Integration Tests for Interactive Session Flows
//!
//! Each test runs a small shell script through the supervisor and answers
//! its prompts from a scripted responder, then checks what the script saw
//! on stdin and what reached the display.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::time::Duration;

use promptbridge::collector::ScriptedReply;
use promptbridge::display::NotificationLevel;
use promptbridge::Error;
use test_utils::Harness;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(20);

#[tokio::test]
async fn test_plain_status_run() {
    let h = Harness::new(vec![]);
    let inv = h.invocation("echo 'Up to date.'", &["status"]);

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .expect("invocation timed out")
        .expect("status should succeed");

    assert_eq!(report.subcommand, "status");
    assert_eq!(report.exit_code, 0);
    assert_eq!(report.stdout, "Up to date.\n");
    assert_eq!(report.prompts_answered, 0);
    assert!(h.display.transcript().contains("Up to date."));

    let notes = h.display.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Info);
    assert!(notes[0].message.contains("status"));
}

#[tokio::test]
async fn test_yes_no_prompt_answered_yes() {
    let h = Harness::new(vec![ScriptedReply::choice("Yes")]);
    let inv = h.invocation(
        "printf 'Delete branch foo? [y/n]: '; read answer; echo \"answer=$answer\"",
        &["prune"],
    );

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();

    assert!(report.stdout.contains("answer=yes"));
    assert_eq!(report.prompts_answered, 1);

    let asked = h.responder.choice_requests();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].prompt, "Delete branch foo");
    assert_eq!(asked[0].options, vec!["Yes", "No"]);
}

#[tokio::test]
async fn test_yes_no_prompt_answered_no() {
    let h = Harness::new(vec![ScriptedReply::choice("No")]);
    let inv = h.invocation(
        "printf 'Proceed with push? (yes/no) '; read answer; echo \"answer=$answer\"",
        &["push"],
    );

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stdout.contains("answer=no"));
}

#[tokio::test]
async fn test_free_text_accepts_default() {
    let h = Harness::new(vec![ScriptedReply::AcceptDefault]);
    let inv = h.invocation(
        "printf 'Branch name?\\nDefault: main\\n'; read b; echo \"branch=$b\"",
        &["checkout"],
    );

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stdout.contains("branch=main"));

    let asked = h.responder.text_requests();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].prompt, "Branch name?");
    assert_eq!(asked[0].value, "main");
    assert_eq!(asked[0].placeholder, "main");
}

#[tokio::test]
async fn test_free_text_empty_submission_is_not_cancel() {
    let h = Harness::new(vec![ScriptedReply::text("")]);
    let inv = h.invocation(
        "printf 'Commit message? '; read msg; echo \"msg=[$msg]\"",
        &["commit"],
    );

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stdout.contains("msg=[]"));
}

#[tokio::test]
async fn test_free_text_dismissal_kills_without_writing() {
    let h = Harness::new(vec![ScriptedReply::Dismiss]);
    let inv = h.invocation(
        "printf 'Tag name? '; read t; echo \"tag=$t\"; sleep 30",
        &["tag"],
    );

    let err = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .expect("dismissal must not wait for the script")
        .unwrap_err();

    assert!(matches!(err, Error::PromptCancelled { ref question } if question == "Tag name?"));
    assert!(!h.display.transcript().contains("tag="));

    let notes = h.display.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_binary_dismissal_kills() {
    let h = Harness::new(vec![ScriptedReply::Dismiss]);
    let inv = h.invocation(
        "printf 'Continue? [y/n]: '; read a; sleep 30",
        &["sync"],
    );

    let err = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .expect("dismissal must not wait for the script")
        .unwrap_err();
    assert!(matches!(err, Error::PromptCancelled { ref question } if question == "Continue"));
}

#[tokio::test]
async fn test_binary_dismissal_still_sends_no_before_kill() {
    let mut config = test_utils::fast_config();
    config.session.kill_grace_ms = 1000;
    let h = Harness::with_config(vec![ScriptedReply::Dismiss], config);
    // SIGTERM is ignored so the script can record its answer before SIGKILL
    let inv = h.invocation(
        "trap '' TERM; printf 'Continue? [y/n]: '; read a; echo \"got=$a\" > answer.txt; sleep 30",
        &["sync"],
    );

    let err = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .expect("dismissal must not wait for the script")
        .unwrap_err();
    assert!(matches!(err, Error::PromptCancelled { .. }));

    let seen = std::fs::read_to_string(h.dir.path().join("answer.txt")).unwrap();
    assert_eq!(seen, "got=no\n");
    assert_eq!(h.display.notifications().len(), 1);
}

#[tokio::test]
async fn test_several_prompts_in_sequence() {
    let h = Harness::new(vec![
        ScriptedReply::choice("Yes"),
        ScriptedReply::text("v1.2.0"),
        ScriptedReply::choice("No"),
    ]);
    let script = r#"
printf 'Create release? [y/n]: '; read a
printf 'Version? '; read v
printf 'Publish now? [y/n]: '; read p
echo "a=$a v=$v p=$p"
"#;
    let inv = h.invocation(script, &["release"]);

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stdout.contains("a=yes v=v1.2.0 p=no"));
    assert_eq!(report.prompts_answered, 3);
    assert_eq!(h.responder.remaining(), 0);
}

#[tokio::test]
async fn test_prompt_split_across_chunks() {
    let h = Harness::new(vec![ScriptedReply::choice("Yes")]);
    let inv = h.invocation(
        "printf 'Overwrite local changes'; sleep 0.2; printf '? [y/n]: '; read a; echo \"a=$a\"",
        &["reset"],
    );

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stdout.contains("a=yes"));
    assert_eq!(
        h.responder.choice_requests()[0].prompt,
        "Overwrite local changes"
    );
}

#[tokio::test]
async fn test_color_codes_stripped_from_display() {
    let h = Harness::new(vec![]);
    let inv = h.invocation(r"printf '\033[32mclean\033[0m   \n'", &["status"]);

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.stdout, "clean\n");
    assert!(!h.display.transcript().contains('\x1b'));
}

#[tokio::test]
async fn test_stderr_is_never_classified() {
    let h = Harness::new(vec![]);
    let inv = h.invocation("printf 'Really? [y/n]: ' >&2", &["status"]);

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert!(report.stderr.contains("Really? [y/n]:"));
    assert!(h.responder.choice_requests().is_empty());
    assert!(h.display.transcript().contains("Really?"));
}

#[tokio::test]
async fn test_environment_overlay_reaches_tool() {
    let h = Harness::new(vec![]);
    let inv = h
        .invocation(
            "echo \"$NONINTERACTIVE/$GIT_TERMINAL_PROMPT/$PYTHONUNBUFFERED/$SSH_AUTH_SOCK\"",
            &["env"],
        )
        .with_agent_socket("/tmp/agent.sock");

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.stdout, "1/0/1//tmp/agent.sock\n");
}

#[tokio::test]
async fn test_arguments_and_working_directory() {
    let h = Harness::new(vec![]);
    let inv = h.invocation("echo \"$@\"; pwd", &["sync", "--all"]);
    let expected_dir = h.dir.path().canonicalize().unwrap();

    let report = timeout(LIMIT, h.supervisor.invoke(inv))
        .await
        .unwrap()
        .unwrap();
    let mut lines = report.stdout.lines();
    assert_eq!(lines.next(), Some("sync --all"));
    let pwd = std::path::PathBuf::from(lines.next().unwrap());
    assert_eq!(pwd.canonicalize().unwrap(), expected_dir);
}
