//! Client facade: routing, instruction merging and resilient dispatch

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::hooks::{CallContext, EventHook, HookNotifier};
use crate::provider::{DeltaStream, Provider};
use crate::redact::{RegexRedactor, SecretRedactor};
use crate::resilience::{ResilienceExecutor, ResilienceOptions};
use crate::routing::ProviderRegistry;
use crate::types::{ChatDelta, ChatRequest, ChatResponse};

/// Multi-provider chat client
///
/// Requests name their target as `provider/model`. Every call runs through
/// one shared [`ResilienceExecutor`], so concurrency limits and request
/// pacing apply across all providers of the client.
pub struct LlmClient {
    registry: ProviderRegistry,
    executor: ResilienceExecutor,
}

impl LlmClient {
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::default()
    }

    /// Registered provider ids
    pub fn providers(&self) -> Vec<&str> {
        self.registry.ids()
    }

    /// Send a request and wait for the full response
    ///
    /// Routing errors are returned before any hook fires or provider runs.
    pub async fn chat(&self, request: ChatRequest, cancel: &CancellationToken) -> Result<ChatResponse, LlmError> {
        let (provider, routed) = self.registry.route(request)?;
        let ctx = call_context(provider.as_ref(), &routed);

        let response = self
            .executor
            .execute(&ctx, cancel, || provider.chat(&routed))
            .await?;

        Ok(stamp_response(response, &ctx))
    }

    /// Start a streaming request
    ///
    /// Failures before the first delta are retried and, if final, returned
    /// as `Err`. Once deltas flow, a failure arrives as the last item of the
    /// stream. Every delta carries the call's provider, model and ids.
    pub async fn chat_stream(&self, request: ChatRequest, cancel: &CancellationToken) -> Result<DeltaStream, LlmError> {
        let (provider, routed) = self.registry.route(request)?;
        let ctx = call_context(provider.as_ref(), &routed);

        let stream = self
            .executor
            .execute_stream(ctx.clone(), cancel.clone(), || provider.chat_stream(&routed))
            .await?;

        Ok(Box::pin(
            stream.map(move |item| item.map(|delta| stamp_delta(delta, &ctx))),
        ))
    }
}

fn call_context(provider: &dyn Provider, routed: &ChatRequest) -> CallContext {
    CallContext {
        request_id: routed.request_id.clone().unwrap_or_default(),
        correlation_id: routed.correlation_id.clone().unwrap_or_default(),
        provider_id: provider.id().to_owned(),
        model: routed.model.clone(),
    }
}

fn stamp_response(mut response: ChatResponse, ctx: &CallContext) -> ChatResponse {
    response.provider_id.clone_from(&ctx.provider_id);
    response.model.clone_from(&ctx.model);
    response.request_id.clone_from(&ctx.request_id);
    response.correlation_id.clone_from(&ctx.correlation_id);
    response
}

fn stamp_delta(mut delta: ChatDelta, ctx: &CallContext) -> ChatDelta {
    delta.provider_id.clone_from(&ctx.provider_id);
    delta.model.clone_from(&ctx.model);
    delta.request_id.clone_from(&ctx.request_id);
    delta.correlation_id.clone_from(&ctx.correlation_id);
    delta
}

/// Collects providers, hooks and policies for an [`LlmClient`]
#[derive(Default)]
pub struct LlmClientBuilder {
    providers: Vec<Arc<dyn Provider>>,
    hooks: Vec<Arc<dyn EventHook>>,
    resilience: ResilienceOptions,
    redactor: Option<Arc<dyn SecretRedactor>>,
}

impl LlmClientBuilder {
    #[must_use]
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn shared_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn EventHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn resilience(mut self, options: ResilienceOptions) -> Self {
        self.resilience = options;
        self
    }

    /// Redactor applied to errors before they reach hooks
    #[must_use]
    pub fn redactor(mut self, redactor: Arc<dyn SecretRedactor>) -> Self {
        self.redactor = Some(redactor);
        self
    }

    pub fn build(self) -> Result<LlmClient, LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::Configuration(
                "at least one provider must be configured before build()".to_owned(),
            ));
        }

        let registry = ProviderRegistry::new(self.providers)?;
        let redactor = self.redactor.unwrap_or_else(|| Arc::new(RegexRedactor));
        let notifier = Arc::new(HookNotifier::new(self.hooks, redactor));

        tracing::debug!(providers = ?registry.ids(), "llm client built");

        Ok(LlmClient {
            registry,
            executor: ResilienceExecutor::new(self.resilience, notifier),
        })
    }
}
