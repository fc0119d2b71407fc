mod common;

use common::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stepflow::graphs::GraphBuilder;
use stepflow::message::{Message, ToolCall};
use stepflow::node::{NodeError, NodePartial};
use stepflow::retry::RetryPolicy;
use stepflow::runtimes::{InMemoryCheckpointer, RunConfig, RunOutcome, StepError, Stepper};
use stepflow::state::ThreadState;
use stepflow::tools::{Tool, ToolError, ToolRunner};
use stepflow::types::NodeKind;

use async_trait::async_trait;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// Looks up an order, reading the authenticated customer from RunConfig.
struct OrderStatus;

#[async_trait]
impl Tool for OrderStatus {
    async fn call(&self, args: Value, config: &RunConfig) -> Result<Value, ToolError> {
        let customer = config
            .get("customer_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::fatal("no authenticated customer"))?;
        let order = args["order_id"].as_str().unwrap_or_default();
        Ok(json!({ "customer": customer, "order": order, "status": "shipped" }))
    }
}

/// Fails with a retryable error until the given call count is reached.
struct FlakyLookup {
    succeed_on_call: u32,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Tool for FlakyLookup {
    async fn call(&self, _args: Value, _config: &RunConfig) -> Result<Value, ToolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call < self.succeed_on_call {
            return Err(ToolError::retryable(format!("upstream timeout #{call}")));
        }
        Ok(json!({ "ok": true }))
    }
}

fn state_with_tool_call(name: &str, args: Value) -> (ThreadState, String) {
    let call = ToolCall::new(name, args);
    let call_id = call.id.clone();
    let state = ThreadState::builder()
        .with_message(Message::assistant("let me check").with_tool_calls(vec![call]))
        .build();
    (state, call_id)
}

#[tokio::test]
async fn test_tool_results_flow_into_the_transcript() {
    let runner = ToolRunner::new().register("order_status", Arc::new(OrderStatus));
    let workflow = GraphBuilder::new()
        .add_node(custom("tools"), runner)
        .add_edge(NodeKind::Start, custom("tools"))
        .add_edge(custom("tools"), NodeKind::End)
        .compile()
        .unwrap();

    let (state, call_id) = state_with_tool_call("order_status", json!({"order_id": "ord-7"}));
    let config = RunConfig::new("t1").with_value("customer_id", json!("cust-1"));

    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper.create_thread("t1", config, state).await.unwrap();

    let RunOutcome::Completed { state } = stepper.run("t1", NodePartial::new()).await.unwrap()
    else {
        panic!("expected completion");
    };

    let tool_msg = state.last_message_with_role(Message::TOOL).unwrap();
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some(call_id.as_str()));
    let result: Value = serde_json::from_str(&tool_msg.content).unwrap();
    assert_eq!(result["customer"], json!("cust-1"));
    assert_eq!(result["status"], json!("shipped"));
}

#[tokio::test]
async fn test_retry_policy_recovers_transient_tool_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let runner = ToolRunner::new().register(
        "lookup",
        Arc::new(FlakyLookup {
            succeed_on_call: 3,
            calls: Arc::clone(&calls),
        }),
    );
    let workflow = GraphBuilder::new()
        .add_node_with_retry(
            custom("tools"),
            runner,
            RetryPolicy::fixed(3, Duration::ZERO),
        )
        .add_edge(NodeKind::Start, custom("tools"))
        .add_edge(custom("tools"), NodeKind::End)
        .compile()
        .unwrap();

    let (state, _) = state_with_tool_call("lookup", json!({}));
    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), state)
        .await
        .unwrap();

    let RunOutcome::Completed { state } = stepper.run("t1", NodePartial::new()).await.unwrap()
    else {
        panic!("expected completion");
    };
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(state.last_message_with_role(Message::TOOL).is_some());
}

#[tokio::test]
async fn test_retries_exhausted_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let workflow = GraphBuilder::new()
        .add_node_with_retry(
            custom("flaky"),
            AlwaysRetryNode {
                calls: Arc::clone(&calls),
            },
            RetryPolicy::fixed(3, Duration::ZERO),
        )
        .add_edge(NodeKind::Start, custom("flaky"))
        .add_edge(custom("flaky"), NodeKind::End)
        .compile()
        .unwrap();

    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();

    let err = stepper.run("t1", NodePartial::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StepError::NodeFailed {
            source: NodeError::RetriesExhausted { attempts: 3, .. },
            ..
        }
    ));
    // Exactly max_attempts invocations, not one more.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_node_without_policy_fails_on_first_retryable_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let workflow = GraphBuilder::new()
        .add_node(
            custom("flaky"),
            AlwaysRetryNode {
                calls: Arc::clone(&calls),
            },
        )
        .add_edge(NodeKind::Start, custom("flaky"))
        .add_edge(custom("flaky"), NodeKind::End)
        .compile()
        .unwrap();

    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), ThreadState::default())
        .await
        .unwrap();

    let err = stepper.run("t1", NodePartial::new()).await.unwrap_err();
    assert!(matches!(err, StepError::NodeFailed { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_flaky_node_recovers_within_policy() {
    let calls = Arc::new(AtomicU32::new(0));
    let workflow = GraphBuilder::new()
        .add_node_with_retry(
            custom("flaky"),
            FlakyNode {
                succeed_on_call: 2,
                calls: Arc::clone(&calls),
            },
            RetryPolicy::fixed(3, Duration::ZERO),
        )
        .add_edge(NodeKind::Start, custom("flaky"))
        .add_edge(custom("flaky"), NodeKind::End)
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
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        state.last_message().map(|m| m.content.as_str()),
        Some("recovered")
    );

    // The failed first attempt left no trace in state: one message only.
    assert_eq!(state.messages.len(), 1);
}

#[tokio::test]
async fn test_fatal_tool_failure_is_not_retried() {
    struct AlwaysFatal {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for AlwaysFatal {
        async fn call(&self, _: Value, _: &RunConfig) -> Result<Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ToolError::fatal("invalid arguments"))
        }
    }

    let calls = Arc::new(AtomicU32::new(0));
    let runner = ToolRunner::new().register(
        "broken",
        Arc::new(AlwaysFatal {
            calls: Arc::clone(&calls),
        }),
    );
    let workflow = GraphBuilder::new()
        .add_node_with_retry(
            custom("tools"),
            runner,
            RetryPolicy::fixed(3, Duration::ZERO),
        )
        .add_edge(NodeKind::Start, custom("tools"))
        .add_edge(custom("tools"), NodeKind::End)
        .compile()
        .unwrap();

    let (state, _) = state_with_tool_call("broken", json!({}));
    let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
    stepper
        .create_thread("t1", RunConfig::new("t1"), state)
        .await
        .unwrap();

    let err = stepper.run("t1", NodePartial::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StepError::NodeFailed {
            source: NodeError::ValidationFailed(_),
            ..
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
