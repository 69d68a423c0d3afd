use sandwallet_sandbox::{spawn_sandbox, MockChain, SandboxError, SandboxOptions};
use sandwallet_types::{AccountRequest, Action, ActionEnvelope, SandboxMessage, Statement};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const SCRIPT: &str = "window.sandbox = { dispatch(action, meta) {} };";

async fn next_message(envelopes: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> SandboxMessage {
    let json = timeout(Duration::from_secs(5), envelopes.recv())
        .await
        .expect("sandbox should answer")
        .expect("channel open");
    SandboxMessage::from_json(&json).unwrap()
}

async fn next_action(envelopes: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> ActionEnvelope {
    loop {
        if let SandboxMessage::Action(envelope) = next_message(envelopes).await {
            return envelope;
        }
    }
}

#[tokio::test]
async fn test_script_without_entry_point_is_rejected() {
    let result = spawn_sandbox(
        "console.log('no entry')",
        Arc::new(MockChain::new()),
        SandboxOptions::default(),
    );
    assert!(matches!(result, Err(SandboxError::MissingEntryPoint { .. })));
}

#[tokio::test]
async fn test_statement_answered_with_envelope() {
    let mut sandbox =
        spawn_sandbox(SCRIPT, Arc::new(MockChain::new()), SandboxOptions::default()).unwrap();
    let statement = Statement::new(Action::connect("localnet"), 1).render().unwrap();
    sandbox.statements.send(statement).unwrap();

    let envelope = next_action(&mut sandbox.envelopes).await;
    assert_eq!(envelope.action, Action::ConnectSuccess);
    assert_eq!(envelope.epoch, Some(1));
}

#[tokio::test]
async fn test_console_group_wraps_handler() {
    let mut sandbox =
        spawn_sandbox(SCRIPT, Arc::new(MockChain::new()), SandboxOptions::default()).unwrap();
    let statement = Statement::new(Action::connect("devnet"), 1).render().unwrap();
    sandbox.statements.send(statement).unwrap();

    match next_message(&mut sandbox.envelopes).await {
        SandboxMessage::Console(console) => assert_eq!(console.group, Some(vec![json!("CONNECT #1")])),
        other => panic!("expected console group, got {other:?}"),
    }
    let mut group_end = None;
    for _ in 0..4 {
        if let SandboxMessage::Console(console) = next_message(&mut sandbox.envelopes).await {
            if console.group_end.is_some() {
                group_end = console.group_end;
                break;
            }
        }
    }
    assert_eq!(group_end, Some(vec![json!("CONNECT #1")]));
}

#[tokio::test]
async fn test_concurrent_handlers_close_their_own_groups() {
    let chain = MockChain::new().with_latency(Duration::from_millis(20));
    let mut sandbox = spawn_sandbox(SCRIPT, Arc::new(chain), SandboxOptions::default()).unwrap();
    for (seq, action) in [
        (1, Action::connect("devnet")),
        (2, Action::AccountGet(AccountRequest::default())),
        (3, Action::TokenList),
    ] {
        sandbox
            .statements
            .send(Statement::new(action, seq).render().unwrap())
            .unwrap();
    }

    let mut opened = Vec::new();
    let mut closed = Vec::new();
    while closed.len() < 3 {
        if let SandboxMessage::Console(console) = next_message(&mut sandbox.envelopes).await {
            opened.extend(console.group.unwrap_or_default());
            closed.extend(console.group_end.unwrap_or_default());
        }
    }
    opened.sort_by_key(|label| label.to_string());
    closed.sort_by_key(|label| label.to_string());
    assert_eq!(opened, closed);
    assert_eq!(closed.len(), 3);
}

#[tokio::test]
async fn test_malformed_statement_relayed_as_console_error() {
    let mut sandbox =
        spawn_sandbox(SCRIPT, Arc::new(MockChain::new()), SandboxOptions::default()).unwrap();
    sandbox.statements.send("alert('x')".to_string()).unwrap();

    match next_message(&mut sandbox.envelopes).await {
        SandboxMessage::Console(console) => {
            let args = console.error.expect("console error");
            let text = args[0].as_str().unwrap();
            assert!(text.starts_with("Bridge message rejected"), "{text}");
        }
        other => panic!("expected console error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sandbox_stops_when_host_hangs_up() {
    let sandbox =
        spawn_sandbox(SCRIPT, Arc::new(MockChain::new()), SandboxOptions::default()).unwrap();
    drop(sandbox.statements);
    timeout(Duration::from_secs(5), sandbox.task)
        .await
        .expect("sandbox task should finish")
        .unwrap();
}
