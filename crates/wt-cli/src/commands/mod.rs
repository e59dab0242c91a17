//! CLI subcommand implementations.

pub mod category;
pub mod log;
pub mod stats;
pub mod status;
pub mod track;
pub mod util;
