//! Bot module for handling Telegram interactions
//!
//! - `controller`: transport-agnostic decisions (commands, photo pipeline, replies)
//! - `message_handler`: turns Telegram updates into controller calls and sends replies
//! - `ui_builder`: formats messages
//! - `command`: parses `/commands`

pub mod command;
pub mod controller;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler function for use in main.rs
pub use message_handler::message_handler;

pub use command::Command;
pub use controller::{BotController, InboundPhoto};
pub use message_handler::{download_file, send_reply};
