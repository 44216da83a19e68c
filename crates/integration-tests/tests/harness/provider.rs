//! Scripted provider standing in for a remote LLM backend

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use multillm_core::{
    ChatDelta, ChatRequest, ChatResponse, DeltaStream, LlmError, Message, Provider, ProviderCapabilities,
};

/// One scripted reaction to a call
#[derive(Clone)]
pub enum Step {
    /// Answer after `delay`
    Reply { text: String, delay: Duration },
    Fail(LlmError),
    /// Stream these items
    Stream(Vec<Result<ChatDelta, LlmError>>),
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Self::Reply {
            text: text.to_owned(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow_reply(text: &str, delay: Duration) -> Self {
        Self::Reply {
            text: text.to_owned(),
            delay,
        }
    }

    pub fn words(text: &str) -> Self {
        let mut items: Vec<_> = text.split(' ').map(|w| Ok(ChatDelta::fragment(w))).collect();
        items.push(Ok(ChatDelta::terminal()));
        Self::Stream(items)
    }
}

/// Provider that replays a script; once exhausted it keeps replaying the
/// last step
pub struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(id: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            id: id.to_owned(),
            script: Mutex::new(steps.into_iter().collect()),
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn next_step(&self, request: &ChatRequest) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().expect("script is not empty")
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tools: true,
            ..ProviderCapabilities::default()
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        match self.next_step(request) {
            Step::Reply { text, delay } => {
                tokio::time::sleep(delay).await;
                Ok(ChatResponse::from_message(Message::assistant(text)))
            }
            Step::Fail(error) => Err(error),
            Step::Stream(_) => Err(LlmError::InvalidRequest("scripted a stream for chat".to_owned())),
        }
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<DeltaStream, LlmError> {
        match self.next_step(request) {
            Step::Stream(items) => Ok(Box::pin(stream::iter(items))),
            Step::Fail(error) => Err(error),
            Step::Reply { text, delay } => {
                tokio::time::sleep(delay).await;
                Ok(Box::pin(stream::iter([Ok(ChatDelta::fragment(text)), Ok(ChatDelta::terminal())])))
            }
        }
    }
}
