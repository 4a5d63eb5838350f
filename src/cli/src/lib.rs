//! Container Factory CLI - command-line and HTTP front-ends.

pub mod commands;
pub mod output;
pub mod server;
