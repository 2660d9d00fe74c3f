//! Subcommand implementations.

pub mod init;
pub mod secret;
pub mod serve;
