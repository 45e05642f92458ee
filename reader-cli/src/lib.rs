//! Reader CLI - Interactive command layer for trace-reader
//!
//! This crate wires a [`trace_reader::TraceReader`] to a line-oriented
//! command loop: configuration, command parsing, and the session that runs
//! commands and formats their output.

pub mod command;
pub mod config;
pub mod session;

pub use command::{Command, CommandError, Window};
pub use config::ReaderConfig;
pub use session::Session;

/// Result type for reader CLI operations
pub type Result<T> = anyhow::Result<T>;
