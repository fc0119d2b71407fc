mod common;

use common::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use stepflow::graphs::{FnRouter, GraphBuilder};
use stepflow::node::NodePartial;
use stepflow::runtimes::{InMemoryCheckpointer, RunConfig, RunOutcome, Stepper};
use stepflow::state::{StateSnapshot, ThreadState};
use stepflow::types::NodeKind;
use stepflow::workflow::Workflow;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// Classifies on the user's words, then answers from the matching desk.
fn triage_workflow() -> Workflow {
    let router = Arc::new(FnRouter::new(vec!["billing", "general"], |snap| {
        let billing = snap
            .messages
            .iter()
            .any(|m| m.content.contains("invoice"));
        if billing { "billing" } else { "general" }.to_string()
    }));
    GraphBuilder::new()
        .add_node(custom("triage"), SetExtraNode {
            key: "triaged",
            value: json!(true),
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

async fn run_turns(turns: &[String]) -> StateSnapshot {
    let mut stepper = Stepper::new(triage_workflow(), Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t", RunConfig::new("t"), ThreadState::default())
        .await
        .unwrap();
    let mut last = None;
    for turn in turns {
        let outcome = stepper.send_user_message("t", turn).await.unwrap();
        let RunOutcome::Completed { state } = outcome else {
            panic!("expected completion");
        };
        last = Some(state);
    }
    last.unwrap_or_else(empty_snapshot)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Same inputs, same transcript: execution has no hidden nondeterminism
    // beyond message ids.
    #[test]
    fn prop_identical_inputs_produce_identical_transcripts(
        turns in prop::collection::vec("[a-z ]{0,20}(invoice)?[a-z ]{0,20}", 1..4)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (a, b) = rt.block_on(async {
            (run_turns(&turns).await, run_turns(&turns).await)
        });
        prop_assert_eq!(transcript(&a), transcript(&b));
        prop_assert_eq!(a.extra.clone(), b.extra.clone());
        prop_assert_eq!(a.messages_version, b.messages_version);
        prop_assert_eq!(a.extra_version, b.extra_version);
    }

    // Every turn yields exactly one desk reply after the user message, and
    // the desk matches the keyword rule.
    #[test]
    fn prop_routing_follows_the_keyword_rule(
        turns in prop::collection::vec("[a-z ]{0,20}(invoice)?[a-z ]{0,20}", 1..4)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let snapshot = rt.block_on(run_turns(&turns));
        let pairs = transcript(&snapshot);
        prop_assert_eq!(pairs.len(), turns.len() * 2);

        // Once any turn mentions an invoice, the thread stays with billing.
        let mut billing_seen = false;
        for (i, turn) in turns.iter().enumerate() {
            billing_seen = billing_seen || turn.contains("invoice");
            let expected = if billing_seen { "billing desk" } else { "general desk" };
            prop_assert_eq!(&pairs[i * 2].1, turn);
            prop_assert_eq!(&pairs[i * 2 + 1].1, expected);
        }
    }
}
