//! Command implementations shared by the CLI and library callers.

pub mod init;
