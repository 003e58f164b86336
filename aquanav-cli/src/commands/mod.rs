//! CLI command implementations.

pub mod common;
pub mod init;
pub mod route;
pub mod simulate;
pub mod watch;
