//! # LLM Infrastructure
//!
//! A small wrapper over the Anthropic and OpenAI-compatible chat APIs.
//! [`Client`] routes a prompt to a configured agent and implements
//! [`LlmProvider`](crate::domain::traits::LlmProvider), reporting an estimated cost.

mod client;
pub mod providers;
mod types;

pub use client::Client;

pub use types::{Context, Error, Message, MessageRole, Provider, Response, TokenUsage};
