//! Library side of the `modx` command-line tool.

pub mod commands;
pub mod logging;
pub mod output;

pub use commands::*;
pub use output::ConsoleNotifier;
