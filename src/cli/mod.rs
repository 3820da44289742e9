//! CLI module for batwatch - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
