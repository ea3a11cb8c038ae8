//! # Tools Module
//!
//! In-process command execution and file writes, sandboxed to the projects directory.

pub mod executor;
