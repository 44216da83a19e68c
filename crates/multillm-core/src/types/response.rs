use serde::{Deserialize, Serialize};

use super::message::Message;

/// Token accounting reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Complete response to a chat request
///
/// The identity fields are stamped by the client after the provider returns,
/// so providers may leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Id of the provider that answered
    pub provider_id: String,
    /// Bare model id the provider was asked for
    pub model: String,
    /// Assistant message
    pub message: Message,
    /// Identifier of the logical request
    pub request_id: String,
    /// Correlation identifier of the logical request
    pub correlation_id: String,
    /// Token usage, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
}

impl ChatResponse {
    /// Response carrying only a message, identity left for the client to stamp
    pub fn from_message(message: Message) -> Self {
        Self {
            provider_id: String::new(),
            model: String::new(),
            message,
            request_id: String::new(),
            correlation_id: String::new(),
            usage: None,
        }
    }

    #[must_use]
    pub const fn with_usage(mut self, usage: UsageStats) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// One incremental fragment of a streamed response
///
/// A stream ends with exactly one delta whose `is_final` flag is set and
/// whose text is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelta {
    /// Id of the provider producing the stream
    pub provider_id: String,
    /// Bare model id
    pub model: String,
    /// Incremental text
    pub delta: String,
    /// Terminal marker
    pub is_final: bool,
    /// Identifier of the logical request
    pub request_id: String,
    /// Correlation identifier of the logical request
    pub correlation_id: String,
}

impl ChatDelta {
    /// Non-terminal text fragment
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            provider_id: String::new(),
            model: String::new(),
            delta: text.into(),
            is_final: false,
            request_id: String::new(),
            correlation_id: String::new(),
        }
    }

    /// Terminal, empty delta
    pub fn terminal() -> Self {
        Self {
            is_final: true,
            ..Self::fragment(String::new())
        }
    }
}
