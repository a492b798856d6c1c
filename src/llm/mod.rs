//! LLM client and prompt templates.

pub mod client;
pub mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role};
pub use prompts::Prompts;
