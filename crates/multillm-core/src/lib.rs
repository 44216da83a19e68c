//! Multi-provider LLM client core
//!
//! Routes `provider/model` requests to registered [`Provider`]s, merges
//! layered instructions into the conversation, and runs every call through a
//! resilience executor (retries with backoff, admission control, request
//! pacing, per-attempt deadlines) with lifecycle hooks and secret redaction.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod auth;
pub mod client;
pub mod error;
pub mod hooks;
pub mod instructions;
pub mod provider;
pub mod redact;
pub mod resilience;
pub mod routing;
pub mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use error::LlmError;
pub use hooks::{CallContext, EventHook, HookNotifier, TracingHook};
pub use provider::{DeltaStream, Provider, ProviderCapabilities};
pub use redact::{RegexRedactor, SecretRedactor};
pub use resilience::{ResilienceExecutor, ResilienceOptions};
pub use routing::ProviderRegistry;
pub use types::{ChatDelta, ChatRequest, ChatResponse, InstructionLayers, Message, MessagePart, Role, UsageStats};
