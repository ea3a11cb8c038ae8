//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (e.g., ChatProvider, LlmProvider).

pub mod agent;
pub mod console;
pub mod llm;
pub mod tools;
pub mod trust;
