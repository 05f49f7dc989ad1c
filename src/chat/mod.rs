//! Terminal chat front end.
//!
//! The `hookchat` binary is a REPL over a [`ChatWidget`](crate::ChatWidget)
//! mounted on a [`TerminalView`](crate::TerminalView).  This module holds the
//! pieces that are worth testing without a terminal:
//!
//! - [`config`]: CLI argument parsing and option layering
//! - [`commands`]: slash command parsing

mod commands;
mod config;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, TERMINAL_TARGET};
