pub mod client;
pub mod polling;

pub use client::{split_message, TelegramClient, MAX_MESSAGE_CHARS};
