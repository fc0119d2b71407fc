//! Tool execution.
//!
//! Assistant messages can carry [`ToolCall`]s; the [`ToolRunner`] node reads
//! the newest assistant message's calls, executes each registered [`Tool`] in
//! order, and emits one `tool`-role message per call, correlated by call id.
//! Transient tool failures surface as retryable node failures so the runner's
//! retry policy governs re-execution.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::control::Route;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
use crate::runtimes::RunConfig;
use crate::state::StateSnapshot;

/// Failures a tool can report.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    /// Transient failure; the runner node's retry policy governs retries.
    #[error("retryable tool failure: {message}")]
    #[diagnostic(code(stepflow::tool::retryable))]
    Retryable { message: String },

    /// Permanent failure; aborts the super-step.
    #[error("tool failed: {message}")]
    #[diagnostic(code(stepflow::tool::fatal))]
    Fatal { message: String },
}

impl ToolError {
    /// Creates a [`ToolError::Retryable`] from any displayable cause.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        ToolError::Retryable {
            message: message.into(),
        }
    }

    /// Creates a [`ToolError::Fatal`] from any displayable cause.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        ToolError::Fatal {
            message: message.into(),
        }
    }
}

/// An external capability invocable from the conversation.
///
/// Tools receive the call's JSON arguments and the thread's host-supplied
/// [`RunConfig`], so a tool can read trusted values like an authenticated
/// customer id without trusting user-controlled message content.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Executes the tool and returns its JSON result.
    async fn call(&self, args: Value, config: &RunConfig) -> Result<Value, ToolError>;
}

/// Node that executes the tool calls on the newest assistant message.
///
/// Executes each call in order and returns one `tool`-role message per call,
/// carrying the tool's JSON result and the originating call id. Routing
/// defers to the graph wiring.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use stepflow::runtimes::RunConfig;
/// use stepflow::tools::{Tool, ToolError, ToolRunner};
///
/// struct OrderLookup;
///
/// #[async_trait]
/// impl Tool for OrderLookup {
///     async fn call(&self, args: Value, config: &RunConfig) -> Result<Value, ToolError> {
///         let customer = config
///             .get("customer_id")
///             .and_then(|v| v.as_str())
///             .ok_or_else(|| ToolError::fatal("no authenticated customer"))?;
///         let order = args["order_id"].as_str().unwrap_or_default();
///         Ok(json!({ "customer": customer, "order": order, "status": "shipped" }))
///     }
/// }
///
/// let runner = ToolRunner::new().register("order_lookup", Arc::new(OrderLookup));
/// ```
pub struct ToolRunner {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRunner {
    /// Creates a runner with no registered tools.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: FxHashMap::default(),
        }
    }

    /// Registers a tool under the given name (builder style).
    #[must_use]
    pub fn register(mut self, name: &str, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(name.to_string(), tool);
        self
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ToolRunner {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let assistant = snapshot
            .last_message_with_role(Message::ASSISTANT)
            .filter(|m| !m.tool_calls.is_empty())
            .ok_or(NodeError::MissingInput {
                what: "assistant message with tool calls",
            })?;

        let mut results = Vec::with_capacity(assistant.tool_calls.len());
        for call in &assistant.tool_calls {
            let tool = self
                .tools
                .get(&call.name)
                .ok_or_else(|| NodeError::UnknownTool {
                    name: call.name.clone(),
                })?;
            tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");
            let value = tool
                .call(call.args.clone(), &ctx.config)
                .await
                .map_err(|err| match err {
                    ToolError::Retryable { message } => NodeError::Retryable { message },
                    ToolError::Fatal { message } => NodeError::ValidationFailed(message),
                })?;
            results.push(Message::tool(&value.to_string(), &call.id));
        }

        Ok(NodeOutput {
            update: NodePartial::new().with_messages(results),
            route: Route::Wired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use crate::state::ThreadState;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        async fn call(&self, args: Value, _config: &RunConfig) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    fn snapshot_with_call(call: ToolCall) -> StateSnapshot {
        ThreadState::builder()
            .with_message(Message::assistant("running tools").with_tool_calls(vec![call]))
            .build()
            .snapshot()
    }

    #[tokio::test]
    async fn test_results_correlate_to_call_ids() {
        let call = ToolCall::new("echo", json!({"n": 1}));
        let call_id = call.id.clone();
        let runner = ToolRunner::new().register("echo", Arc::new(Echo));
        let ctx = NodeContext::new("tools", 0, RunConfig::new("t"));

        let output = runner.run(snapshot_with_call(call), ctx).await.unwrap();
        let messages = output.update.messages.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Message::TOOL);
        assert_eq!(messages[0].tool_call_id.as_deref(), Some(call_id.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let runner = ToolRunner::new();
        let ctx = NodeContext::new("tools", 0, RunConfig::new("t"));
        let err = runner
            .run(snapshot_with_call(ToolCall::new("missing", json!({}))), ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::UnknownTool { name } if name == "missing"));
    }

    #[tokio::test]
    async fn test_retryable_tool_failure_maps_to_retryable_node_error() {
        struct Flaky;

        #[async_trait]
        impl Tool for Flaky {
            async fn call(&self, _: Value, _: &RunConfig) -> Result<Value, ToolError> {
                Err(ToolError::retryable("upstream timeout"))
            }
        }

        let runner = ToolRunner::new().register("flaky", Arc::new(Flaky));
        let ctx = NodeContext::new("tools", 0, RunConfig::new("t"));
        let err = runner
            .run(snapshot_with_call(ToolCall::new("flaky", json!({}))), ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Retryable { .. }));
    }
}
