//! # tgui-proto
//!
//! Shared types, error definitions, and capability traits for tgui.
//!
//! This crate provides the vocabulary every other tgui crate speaks:
//! - [`Destination`] and the inbound events bound to it
//! - Outbound keyboards and message handles
//! - [`FieldValue`], the data a resolved prompt commits
//! - The [`Messenger`] and [`FaultSink`] capabilities the core consumes

mod error;
pub mod event;
pub mod keyboard;
pub mod messenger;
pub mod value;

pub use error::{ProtoError, ProtoResult};
pub use event::{ButtonPress, Destination, InboundEvent, InboundMessage, MessageEntity};
pub use keyboard::{Keyboard, KeyboardButton, MessageHandle};
pub use messenger::{FaultSink, Messenger};
pub use value::{FieldValue, Toggle};
