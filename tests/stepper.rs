mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use stepflow::graphs::{FnRouter, GraphBuilder};
use stepflow::node::NodePartial;
use stepflow::runtimes::{InMemoryCheckpointer, RunConfig, RunOutcome, StepError, Stepper, ThreadInit};
use stepflow::state::ThreadState;
use stepflow::types::NodeKind;
use stepflow::workflow::Workflow;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

fn linear_workflow() -> Workflow {
    GraphBuilder::new()
        .add_node(custom("greet"), SimpleMessageNode::new("hello"))
        .add_node(custom("close"), SimpleMessageNode::new("goodbye"))
        .add_edge(NodeKind::Start, custom("greet"))
        .add_edge(custom("greet"), custom("close"))
        .add_edge(custom("close"), NodeKind::End)
        .compile()
        .unwrap()
}

/// Triage routes on an extra key written upstream; routing must see the
/// snapshot taken after the triage delta was merged.
fn triage_workflow() -> Workflow {
    let router = Arc::new(FnRouter::new(vec!["billing", "general"], |snap| {
        if snap.extra.contains_key("invoice_id") {
            "billing".to_string()
        } else {
            "general".to_string()
        }
    }));
    GraphBuilder::new()
        .add_node(custom("triage"), SetExtraNode {
            key: "invoice_id",
            value: json!("inv-42"),
        })
        .add_node(custom("billing"), SimpleMessageNode::new("billing desk"))
        .add_node(custom("general"), SimpleMessageNode::new("general desk"))
        .add_edge(NodeKind::Start, custom("triage"))
        .add_conditional_edge(
            custom("triage"),
            router,
            [("billing", custom("billing")), ("general", custom("general"))],
        )
        .add_edge(custom("billing"), NodeKind::End)
        .add_edge(custom("general"), NodeKind::End)
        .compile()
        .unwrap()
}

#[tokio::test]
async fn test_linear_run_to_completion() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    let init = stepper
        .create_thread(
            "t1",
            RunConfig::new("t1"),
            ThreadState::new_with_user_message("hi"),
        )
        .await
        .unwrap();
    assert!(matches!(init, ThreadInit::Fresh));

    let outcome = stepper.run("t1", NodePartial::new()).await.unwrap();
    let RunOutcome::Completed { state } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(
        transcript(&state),
        vec![
            ("user".to_string(), "hi".to_string()),
            ("assistant".to_string(), "hello".to_string()),
            ("assistant".to_string(), "goodbye".to_string()),
        ]
    );

    let session = stepper.thread("t1").unwrap();
    assert_eq!(session.step, 2);
    assert!(session.next_node.is_end());
}

#[tokio::test]
async fn test_conditional_routing_sees_merged_snapshot() {
    let mut stepper = Stepper::new(triage_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();

    let outcome = stepper.run("t1", NodePartial::new()).await.unwrap();
    let RunOutcome::Completed { state } = outcome else {
        panic!("expected completion");
    };
    // triage wrote invoice_id in this same run, so billing must be chosen.
    assert_eq!(
        state.last_message().map(|m| m.content.as_str()),
        Some("billing desk")
    );
    assert_eq!(state.extra.get("invoice_id"), Some(&json!("inv-42")));
}

#[tokio::test]
async fn test_completed_thread_accepts_another_turn() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();

    stepper.send_user_message("t1", "first turn").await.unwrap();
    let outcome = stepper.send_user_message("t1", "second turn").await.unwrap();

    let RunOutcome::Completed { state } = outcome else {
        panic!("expected completion");
    };
    // Both turns accumulate in the same thread state.
    let roles: Vec<_> = transcript(&state);
    assert_eq!(roles.len(), 6);
    assert_eq!(roles[0].1, "first turn");
    assert_eq!(roles[3].1, "second turn");
}

#[tokio::test]
async fn test_run_on_unknown_thread_fails() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    let err = stepper.run("nope", NodePartial::new()).await.unwrap_err();
    assert!(matches!(err, StepError::ThreadNotFound { thread_id } if thread_id == "nope"));
}

#[tokio::test]
async fn test_create_thread_twice_reuses_session() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();
    stepper.run("t1", NodePartial::new()).await.unwrap();

    let init = stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();
    assert!(matches!(init, ThreadInit::Resumed { checkpoint_step: 2 }));
}

#[tokio::test]
async fn test_threads_are_independent() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread(
            "a",
            RunConfig::new("a"),
            ThreadState::new_with_user_message("from a"),
        )
        .await
        .unwrap();
    stepper
        .create_thread(
            "b",
            RunConfig::new("b"),
            ThreadState::new_with_user_message("from b"),
        )
        .await
        .unwrap();

    let RunOutcome::Completed { state: state_a } =
        stepper.run("a", NodePartial::new()).await.unwrap()
    else {
        panic!("expected completion");
    };
    let RunOutcome::Completed { state: state_b } =
        stepper.run("b", NodePartial::new()).await.unwrap()
    else {
        panic!("expected completion");
    };

    assert_eq!(transcript(&state_a)[0].1, "from a");
    assert_eq!(transcript(&state_b)[0].1, "from b");
}

#[tokio::test]
async fn test_goto_overrides_static_wiring() {
    // EndNode routes to End even though its static edge points elsewhere.
    let workflow = GraphBuilder::new()
        .add_node(custom("short"), EndNode)
        .add_node(custom("never"), SimpleMessageNode::new("unreachable"))
        .add_edge(NodeKind::Start, custom("short"))
        .add_edge(custom("short"), custom("never"))
        .add_edge(custom("never"), NodeKind::End)
        .compile()
        .unwrap();

    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();
    let RunOutcome::Completed { state } = stepper.run("t1", NodePartial::new()).await.unwrap()
    else {
        panic!("expected completion");
    };
    assert!(state.messages.is_empty());
    assert_eq!(stepper.thread("t1").unwrap().step, 1);
}

#[tokio::test]
async fn test_duplicate_message_ids_merge_once() {
    let mut stepper = Stepper::new(linear_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();

    let msg = stepflow::message::Message::user("hi");
    let input = NodePartial::new().with_messages(vec![msg.clone(), msg]);
    let RunOutcome::Completed { state } = stepper.run("t1", input).await.unwrap() else {
        panic!("expected completion");
    };
    let users: Vec<_> = state
        .messages
        .iter()
        .filter(|m| m.has_role(stepflow::message::Message::USER))
        .collect();
    assert_eq!(users.len(), 1);
}
