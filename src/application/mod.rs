//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes intent resolution, the PRD executor, command routing and execution state.

pub mod intent;
pub mod learning;
pub mod plan_store;
pub mod prd;
pub mod project;
pub mod router;
pub mod state;
pub mod utils;
