//! # tgui-telegram
//!
//! Telegram transport for tgui.
//!
//! - **Outbound**: [`TelegramMessenger`] implements the `Messenger`
//!   capability over the Bot API (prompts, inline keyboards, callback answers)
//! - **Inbound**: [`run_polling`] long-polls `getUpdates` and hands messages and
//!   button presses to a [`FormBot`]
//!
//! ## Key Components
//!
//! - [`FormBot`]: starts the configured form on `/start` and reports answers
//! - [`commands`]: bot command parsing
//! - [`TelegramError`]: startup, token and polling failures

mod bot;
pub mod commands;
mod error;
mod poller;
mod service;

pub use bot::{TelegramMessenger, escape_html, format_error};
pub use error::{TelegramError, TelegramResult};
pub use poller::{inbound_message, run_polling};
pub use service::{FormBot, TOKEN_ENV_VAR, mask_token, resolve_bot_token};
