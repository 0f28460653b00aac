//! Hosts that put the wizard in front of a user.

pub mod cli;
pub mod command;
pub mod decor;

pub use cli::CliChannel;
pub use command::ChatCommand;
