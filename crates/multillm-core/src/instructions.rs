//! Merges layered instructions into the message history

use crate::types::{ChatRequest, InstructionLayers, Message};

/// Merge a request's instruction layers into its messages
///
/// Each present layer becomes one message tagged `[layer]`, prepended in the
/// order request, session, developer, system. Applying this to an already
/// normalized request leaves the messages untouched.
pub fn normalize(mut request: ChatRequest) -> ChatRequest {
    let Some(layers) = request.instructions.as_ref().map(InstructionLayers::normalize) else {
        return request;
    };

    let synthesized = instruction_messages(&layers);
    request.instructions = Some(layers);

    if synthesized.is_empty() || request.messages.starts_with(&synthesized) {
        return request;
    }

    let mut messages = synthesized;
    messages.append(&mut request.messages);
    request.messages = messages;
    request
}

fn instruction_messages(layers: &InstructionLayers) -> Vec<Message> {
    layers
        .ordered_by_priority()
        .map(|(layer, text)| Message::text(layer.role(), format!("[{layer}]\n{text}")))
        .collect()
}
