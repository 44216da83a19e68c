//! Provider-agnostic request/response contracts

pub mod message;
pub mod request;
pub mod response;

pub use message::{Message, MessagePart, Role};
pub use request::{ChatRequest, InstructionLayer, InstructionLayers};
pub use response::{ChatDelta, ChatResponse, UsageStats};
