//! Lifecycle observation for logical calls

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::redact::{RegexRedactor, SecretRedactor};

/// Identity of one logical call, shared by all of its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub request_id: String,
    pub correlation_id: String,
    pub provider_id: String,
    pub model: String,
}

/// Observer notified once per logical call
///
/// `on_start` fires before the first attempt; exactly one of `on_end` or
/// `on_error` follows. Retries are not reported.
#[async_trait]
pub trait EventHook: Send + Sync {
    async fn on_start(&self, ctx: &CallContext);

    async fn on_end(&self, ctx: &CallContext);

    /// Receives the error after secret redaction
    async fn on_error(&self, ctx: &CallContext, error: &LlmError);
}

/// Hook that writes the call lifecycle to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

#[async_trait]
impl EventHook for TracingHook {
    async fn on_start(&self, ctx: &CallContext) {
        tracing::debug!(
            request_id = %ctx.request_id,
            correlation_id = %ctx.correlation_id,
            provider = %ctx.provider_id,
            model = %ctx.model,
            "llm call started"
        );
    }

    async fn on_end(&self, ctx: &CallContext) {
        tracing::debug!(
            request_id = %ctx.request_id,
            correlation_id = %ctx.correlation_id,
            provider = %ctx.provider_id,
            "llm call completed"
        );
    }

    async fn on_error(&self, ctx: &CallContext, error: &LlmError) {
        tracing::warn!(
            request_id = %ctx.request_id,
            correlation_id = %ctx.correlation_id,
            provider = %ctx.provider_id,
            kind = error.kind(),
            error = %error,
            "llm call failed"
        );
    }
}

/// Fans lifecycle events out to the registered hooks in order
pub struct HookNotifier {
    hooks: Vec<Arc<dyn EventHook>>,
    redactor: Arc<dyn SecretRedactor>,
}

impl Default for HookNotifier {
    fn default() -> Self {
        Self::new(Vec::new(), Arc::new(RegexRedactor))
    }
}

impl HookNotifier {
    pub fn new(hooks: Vec<Arc<dyn EventHook>>, redactor: Arc<dyn SecretRedactor>) -> Self {
        Self { hooks, redactor }
    }

    pub async fn start(&self, ctx: &CallContext) {
        for hook in &self.hooks {
            hook.on_start(ctx).await;
        }
    }

    pub async fn end(&self, ctx: &CallContext) {
        for hook in &self.hooks {
            hook.on_end(ctx).await;
        }
    }

    pub async fn error(&self, ctx: &CallContext, error: &LlmError) {
        if self.hooks.is_empty() {
            return;
        }

        let redacted = self.redactor.redact_error(error);
        for hook in &self.hooks {
            hook.on_error(ctx, &redacted).await;
        }
    }
}
