//! CLI subcommands.

pub mod events;
pub mod migrate;
pub mod shell;
