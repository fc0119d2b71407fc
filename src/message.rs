use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::ids;

/// A message in a conversational thread, containing a role, text content,
/// and optionally a set of tool invocations.
///
/// Messages are the primary data structure flowing through a workflow. Each
/// message carries a stable unique `id`: the append-unique merge reducer and
/// the stream deduplication filter both key on it, so a message that
/// re-surfaces (for example when a node re-executes after an interrupt)
/// is recognized and skipped instead of duplicated.
///
/// # Examples
///
/// ```
/// use stepflow::message::Message;
///
/// let user_msg = Message::user("What is the weather?");
/// let assistant_msg = Message::assistant("It's sunny today!");
/// let system_msg = Message::system("You are a helpful assistant.");
///
/// assert!(user_msg.has_role(Message::USER));
/// assert_ne!(user_msg.id, assistant_msg.id);
/// ```
///
/// # Serialization
///
/// Messages implement `Serialize` and `Deserialize` so checkpoints can store
/// them as plain JSON:
/// ```
/// use stepflow::message::Message;
///
/// let msg = Message::user("test");
/// let json = serde_json::to_string(&msg).unwrap();
/// let parsed: Message = serde_json::from_str(&json).unwrap();
/// assert_eq!(msg, parsed);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Stable unique identity of this message. Generated at construction;
    /// append-unique merging and stream dedup both key on it.
    pub id: String,
    /// The role of the message sender (e.g., "user", "assistant", "system", "tool").
    ///
    /// Use the constants on [`Message`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// Tool invocations requested by an assistant message, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `tool`-role messages, the id of the [`ToolCall`] this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool execution result message role.
    pub const TOOL: &'static str = "tool";

    /// Creates a new message with the specified role and content.
    ///
    /// A fresh unique id is generated for the message.
    ///
    /// # Examples
    /// ```
    /// use stepflow::message::Message;
    ///
    /// let msg = Message::new(Message::USER, "Hello!");
    /// assert_eq!(msg.role, "user");
    /// assert_eq!(msg.content, "Hello!");
    /// assert!(!msg.id.is_empty());
    /// ```
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            id: ids::new_message_id(),
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates a tool-result message answering the tool call with the given id.
    ///
    /// # Examples
    /// ```
    /// use stepflow::message::Message;
    ///
    /// let msg = Message::tool("{\"ok\":true}", "tool-123");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("tool-123"));
    /// ```
    #[must_use]
    pub fn tool(content: &str, tool_call_id: &str) -> Self {
        let mut msg = Self::new(Self::TOOL, content);
        msg.tool_call_id = Some(tool_call_id.to_string());
        msg
    }

    /// Attaches tool calls to this message (builder style).
    ///
    /// Typically used on assistant messages that request tool execution.
    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// A tool invocation carried on an assistant message.
///
/// The `id` correlates the invocation with the `tool`-role message produced
/// when the tool runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique id of this invocation; echoed back as `tool_call_id` on the result message.
    pub id: String,
    /// Registered name of the tool to invoke.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub args: Value,
}

impl ToolCall {
    /// Creates a tool call with a fresh unique id.
    #[must_use]
    pub fn new(name: &str, args: Value) -> Self {
        Self {
            id: ids::new_tool_call_id(),
            name: name.to_string(),
            args,
        }
    }
}
