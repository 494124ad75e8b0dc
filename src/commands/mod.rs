//! `!quiet` and `!travel`, the chat commands that flip the shared toggles.

pub mod handlers;
pub mod parser;
pub mod types;

pub use handlers::{CommandRouter, Route, handle_command, is_authorized};
pub use parser::parse_command;
pub use types::{Command, CommandReply, ToggleAction};
