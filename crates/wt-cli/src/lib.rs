//! Work-time tracker CLI library.
//!
//! This crate provides the CLI interface for the work-time tracker.

mod app;
mod cli;
pub mod commands;
mod config;

pub use app::{App, exit_code};
pub use cli::{CategoryAction, Cli, Commands, StartArgs, StatsArgs};
pub use config::Config;
