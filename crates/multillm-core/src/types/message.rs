use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// Developer guidance, below system priority
    Developer,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool/function result
    Tool,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Ordered content parts
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Create a message from a role and its parts
    pub const fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self { role, parts }
    }

    /// Single-part text message
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![MessagePart::text(text)])
    }

    /// Single-part user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Single-part assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Concatenated text of all text parts
    pub fn as_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Individual part within a multipart message
///
/// Binary payloads are reference-counted so a request can be replayed across
/// retry attempts without copying.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    /// Text content block
    Text {
        /// The text string
        text: String,
    },
    /// Inline image
    Image {
        /// MIME type, e.g. `image/png`
        mime_type: String,
        /// Raw image bytes
        #[serde_as(as = "Base64")]
        data: Bytes,
        /// Optional original file name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    /// File attachment
    File {
        /// MIME type of the attachment
        mime_type: String,
        /// File name presented to the backend
        file_name: String,
        /// Raw file contents
        #[serde_as(as = "Base64")]
        data: Bytes,
    },
    /// Tool invocation requested by the assistant
    ToolCall {
        /// Name of the tool to invoke
        name: String,
        /// JSON arguments
        arguments: serde_json::Value,
        /// Identifier correlating the call with its result
        call_id: String,
    },
    /// Result of a tool invocation
    ToolResult {
        /// Identifier of the call this result answers
        call_id: String,
        /// JSON result payload
        result: serde_json::Value,
        /// Whether the tool reported a failure
        #[serde(default)]
        is_error: bool,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value, call_id: impl Into<String>) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    pub fn tool_result(call_id: impl Into<String>, result: serde_json::Value, is_error: bool) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            result,
            is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_bytes_serialize_as_base64() {
        let part = MessagePart::Image {
            mime_type: "image/png".into(),
            data: Bytes::from_static(b"png"),
            file_name: None,
        };

        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["data"], "cG5n");
        assert!(json.get("file_name").is_none());
    }

    #[test]
    fn as_text_skips_non_text_parts() {
        let message = Message::new(
            Role::Assistant,
            vec![
                MessagePart::text("a"),
                MessagePart::tool_call("lookup", serde_json::json!({}), "c1"),
                MessagePart::text("b"),
            ],
        );
        assert_eq!(message.as_text(), "ab");
    }
}
