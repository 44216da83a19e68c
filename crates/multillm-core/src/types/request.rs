use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

/// Chat request as supplied by the caller
///
/// `model` is `provider/model` on the way in; the dispatcher rewrites it to
/// the bare model id and fills in both ids before any provider sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Layered instructions merged into `messages` during dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<InstructionLayers>,
    /// Identifier of this logical request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Identifier threading related requests together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            instructions: None,
            request_id: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: InstructionLayers) -> Self {
        self.instructions = Some(instructions);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Named instruction tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionLayer {
    System,
    Developer,
    Session,
    Request,
}

impl InstructionLayer {
    /// Tag used when the layer is rendered into a message
    pub const fn tag(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Developer => "developer",
            Self::Session => "session",
            Self::Request => "request",
        }
    }

    /// Role of the message synthesized for this layer
    pub const fn role(self) -> Role {
        match self {
            Self::System => Role::System,
            Self::Developer | Self::Session | Self::Request => Role::Developer,
        }
    }
}

impl fmt::Display for InstructionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Four optional instruction tiers supplied alongside a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionLayers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
}

impl InstructionLayers {
    /// Trim every layer, dropping the ones left blank
    #[must_use]
    pub fn normalize(&self) -> Self {
        fn clean(layer: Option<&String>) -> Option<String> {
            layer.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_owned)
        }

        Self {
            system: clean(self.system.as_ref()),
            developer: clean(self.developer.as_ref()),
            session: clean(self.session.as_ref()),
            request: clean(self.request.as_ref()),
        }
    }

    /// Whether no layer carries non-blank text
    pub fn is_empty(&self) -> bool {
        self.ordered_by_priority().next().is_none()
    }

    /// Non-blank layers, highest priority first: request, session, developer, system
    pub fn ordered_by_priority(&self) -> impl Iterator<Item = (InstructionLayer, &str)> {
        [
            (InstructionLayer::Request, self.request.as_deref()),
            (InstructionLayer::Session, self.session.as_deref()),
            (InstructionLayer::Developer, self.developer.as_deref()),
            (InstructionLayer::System, self.system.as_deref()),
        ]
        .into_iter()
        .filter_map(|(layer, text)| text.filter(|t| !t.trim().is_empty()).map(|t| (layer, t)))
    }
}
