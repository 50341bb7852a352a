//! Console front end: stdin commands in, log lines out

pub mod commands;
pub mod display;

pub use commands::{spawn_stdin_reader, ConsoleCommand};
pub use display::LogRenderer;
