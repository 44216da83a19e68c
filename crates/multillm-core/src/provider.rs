//! Provider trait implemented by each backend adapter

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::LlmError;
use crate::types::{ChatDelta, ChatRequest, ChatResponse};

/// Finite, non-restartable sequence of deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<ChatDelta, LlmError>> + Send>>;

/// Capabilities advertised by a provider
///
/// Informational only; the client does not reject requests a provider
/// claims not to support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub streaming: bool,
    pub images: bool,
    pub tools: bool,
    pub file_attachments: bool,
}

/// Trait implemented by each LLM backend
///
/// Requests arrive routed: `model` is the bare model id and both request
/// and correlation ids are set.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider id, matched case-insensitively during routing
    fn id(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send a request and wait for the complete response
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Start a streaming response
    ///
    /// The stream must end with exactly one terminal, empty delta. Dropping
    /// the stream abandons the underlying call.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<DeltaStream, LlmError>;
}
