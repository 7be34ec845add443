//! CLI argument model, mode validation and resolved settings for the Potato
//! project manager binary.

pub mod cli_args;
pub mod manager_config;
pub mod validation;

pub use cli_args::Cli;
pub use manager_config::*;
pub use validation::*;
