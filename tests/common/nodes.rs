use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use stepflow::interrupts::InterruptRequest;
use stepflow::message::Message;
use stepflow::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
use stepflow::state::StateSnapshot;
use stepflow::types::NodeKind;
use stepflow::utils::collections::new_extra_map;

/// Emits one fixed assistant message and defers to the wiring.
#[derive(Debug, Clone)]
pub struct SimpleMessageNode {
    pub msg: &'static str,
}

impl SimpleMessageNode {
    pub fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

#[async_trait]
impl Node for SimpleMessageNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::wired(
            NodePartial::new().with_messages(vec![Message::assistant(self.msg)]),
        ))
    }
}

/// Changes nothing and defers to the wiring.
#[derive(Debug, Clone)]
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::wired(NodePartial::default()))
    }
}

/// Writes one extra key and defers to the wiring.
pub struct SetExtraNode {
    pub key: &'static str,
    pub value: serde_json::Value,
}

#[async_trait]
impl Node for SetExtraNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut extra = new_extra_map();
        extra.insert(self.key.to_string(), self.value.clone());
        Ok(NodeOutput::wired(NodePartial::new().with_extra(extra)))
    }
}

/// Asks for one confirmation, then reports the decision.
pub struct ConfirmNode;

#[async_trait]
impl Node for ConfirmNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let answer = ctx.request_input(InterruptRequest::confirm(
            "Approve change",
            "Apply the requested change?",
        ))?;
        let text = if answer == json!("yes") {
            "change approved"
        } else {
            "change declined"
        };
        Ok(NodeOutput::wired(
            NodePartial::new().with_messages(vec![Message::assistant(text)]),
        ))
    }
}

/// Counts executions before asking for confirmation, to make replay
/// observable.
pub struct CountingConfirmNode {
    pub runs: Arc<AtomicU32>,
}

#[async_trait]
impl Node for CountingConfirmNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        // Side effect before the interrupt: replays on resume.
        self.runs.fetch_add(1, Ordering::SeqCst);
        let _answer = ctx.request_input(InterruptRequest::confirm(
            "Approve change",
            "Apply the requested change?",
        ))?;
        Ok(NodeOutput::wired(
            NodePartial::new().with_messages(vec![Message::assistant("done")]),
        ))
    }
}

/// Asks two questions in sequence within one execution.
pub struct TwoStepInputNode;

#[async_trait]
impl Node for TwoStepInputNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let first = ctx.request_input(InterruptRequest::input("first", "First value?"))?;
        let second = ctx.request_input(InterruptRequest::input("second", "Second value?"))?;
        let mut extra = new_extra_map();
        extra.insert("first".to_string(), first);
        extra.insert("second".to_string(), second);
        Ok(NodeOutput::wired(NodePartial::new().with_extra(extra)))
    }
}

/// Email-change style flow: one interrupt per execution, driven through
/// stages by state, re-entering itself via goto between stages.
pub struct EmailChangeNode;

impl EmailChangeNode {
    pub const KIND: &'static str = "email_change";
}

#[async_trait]
impl Node for EmailChangeNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let stage = snapshot
            .extra
            .get("email_stage")
            .and_then(|v| v.as_str())
            .unwrap_or("collect");

        match stage {
            "collect" => {
                let address = ctx.request_input(InterruptRequest::input(
                    "New address",
                    "Enter the new email address",
                ))?;
                let mut extra = new_extra_map();
                extra.insert("email_stage".to_string(), json!("verify"));
                extra.insert("new_email".to_string(), address);
                Ok(NodeOutput::goto(
                    NodePartial::new().with_extra(extra),
                    NodeKind::Custom(Self::KIND.into()),
                ))
            }
            _ => {
                let _code = ctx.request_input(InterruptRequest::input(
                    "Verification code",
                    "Enter the code we sent to the new address",
                ))?;
                let mut extra = new_extra_map();
                extra.insert("email_stage".to_string(), json!("done"));
                Ok(NodeOutput::wired(
                    NodePartial::new()
                        .with_messages(vec![Message::assistant("email updated")])
                        .with_extra(extra),
                ))
            }
        }
    }

    fn goto_targets(&self) -> Vec<NodeKind> {
        vec![NodeKind::Custom(Self::KIND.into())]
    }
}

/// Fails with a retryable error until `succeed_on_call`, then emits a
/// message.
pub struct FlakyNode {
    pub succeed_on_call: u32,
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl Node for FlakyNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call < self.succeed_on_call {
            return Err(NodeError::retryable(format!("transient failure #{call}")));
        }
        Ok(NodeOutput::wired(
            NodePartial::new().with_messages(vec![Message::assistant("recovered")]),
        ))
    }
}

/// Always fails with a retryable error, counting invocations.
pub struct AlwaysRetryNode {
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl Node for AlwaysRetryNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NodeError::retryable("still broken"))
    }
}

/// Routes straight to End, ignoring any wiring.
pub struct EndNode;

#[async_trait]
impl Node for EndNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::end(NodePartial::default()))
    }
}
