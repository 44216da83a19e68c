//! JSON-RPC 2.0 envelopes and MCP tool payloads

use multillm_core::MessagePart;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Outgoing request; `id` is unique per connection
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> Request<'a> {
    pub const fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// One-way message, no response expected
#[derive(Debug, Serialize)]
pub struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
}

impl<'a> Notification<'a> {
    pub const fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
        }
    }
}

/// Incoming message as far as request correlation cares
///
/// Server-initiated requests and notifications deserialize here too and are
/// told apart by their `id`.
#[derive(Debug, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Response {
    /// Whether this message answers the request with `id`
    pub fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }
}

/// Tool advertised by a server through `tools/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Outcome of a `tools/call`
///
/// `result` is the raw `result` member of the response; `is_error` mirrors
/// the server's `isError` flag, which reports a tool-level failure that is
/// still a successful JSON-RPC exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolResult {
    pub tool_name: String,
    pub result: Value,
    pub is_error: bool,
}

impl McpToolResult {
    pub(crate) fn from_result(tool_name: &str, result: Value) -> Self {
        let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);

        Self {
            tool_name: tool_name.to_owned(),
            result,
            is_error,
        }
    }

    /// Concatenated text of the `content` items of type `text`
    pub fn text(&self) -> String {
        self.result
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Feed this result back into a conversation as the answer to `call_id`
    pub fn into_tool_result_part(self, call_id: impl Into<String>) -> MessagePart {
        MessagePart::tool_result(call_id, self.result, self.is_error)
    }
}

/// Parse `tools/list` result; a missing `tools` member means no tools
pub(crate) fn parse_tools(result: &Value) -> Result<Vec<McpToolDescriptor>, serde_json::Error> {
    match result.get("tools") {
        Some(tools) => Vec::<McpToolDescriptor>::deserialize(tools),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_envelope_shape() {
        let request = Request::new(7, METHOD_TOOLS_LIST, json!({}));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list", "params": {}})
        );

        let note = Notification::new(METHOD_INITIALIZED);
        assert_eq!(
            serde_json::to_value(&note).unwrap(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
    }

    #[test]
    fn response_matching_requires_numeric_id() {
        let parse = |v: Value| serde_json::from_value::<Response>(v).unwrap();
        assert!(parse(json!({"id": 3, "result": {}})).answers(3));
        assert!(!parse(json!({"id": 4, "result": {}})).answers(3));
        assert!(!parse(json!({"id": "3", "result": {}})).answers(3));
        assert!(!parse(json!({"method": "notifications/progress"})).answers(3));
    }

    #[test]
    fn descriptors_default_missing_fields() {
        let tools = parse_tools(&json!({"tools": [{"name": "a"}, {"name": "b", "description": "B", "inputSchema": {"type": "object"}}]})).unwrap();
        assert_eq!(tools[0].description, "");
        assert_eq!(tools[0].input_schema, json!({}));
        assert_eq!(tools[1].input_schema, json!({"type": "object"}));
        assert!(parse_tools(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn tool_result_text_and_part() {
        let result = McpToolResult::from_result(
            "say_hello",
            json!({"content": [{"type": "text", "text": "Hello"}, {"type": "image"}], "isError": true}),
        );
        assert!(result.is_error);
        assert_eq!(result.text(), "Hello");

        match result.into_tool_result_part("call-1") {
            MessagePart::ToolResult { call_id, is_error, .. } => {
                assert_eq!(call_id, "call-1");
                assert!(is_error);
            }
            other => panic!("unexpected part {other:?}"),
        }
    }
}
