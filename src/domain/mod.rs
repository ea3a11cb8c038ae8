//! # Domain Layer
//!
//! The intent vocabulary, configuration, data paths and the collaborator traits
//! the application layer is written against.

pub mod config;
pub mod paths;
pub mod traits;
pub mod types;
