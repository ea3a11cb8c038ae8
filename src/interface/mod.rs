//! # Interface Layer
//!
//! Command handlers invoked by the router, one module per command family.

pub mod commands;
