//! Application Layer
//!
//! Command line and TOML configuration of the `testflow` binary.

pub mod cli;
pub mod config;

pub use cli::Cli;
pub use config::Config;
