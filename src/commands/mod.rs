//! Command implementations for the CLI
//!
//! - start: Run the bot
//! - translate: One-off lookup through the cache
//! - stats: Print translation statistics
//! - test: Test configuration validity
//! - config: Configuration display

pub mod config;
pub mod start;
pub mod stats;
pub mod translate;
