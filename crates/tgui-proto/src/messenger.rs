//! Capabilities the core consumes from its collaborators.
//!
//! The core never talks to a transport directly. A [`Messenger`] delivers
//! prompts, errors, and acknowledgements; a [`FaultSink`] records internal
//! faults caught by the validator pipeline.

use async_trait::async_trait;

use crate::error::ProtoResult;
use crate::event::Destination;
use crate::keyboard::{Keyboard, MessageHandle};

/// Messaging capability.
///
/// Production code uses the Telegram implementation; tests provide a
/// recording mock.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a prompt, optionally with an inline keyboard.
    async fn send_prompt(
        &self,
        destination: Destination,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> ProtoResult<MessageHandle>;

    /// Deliver a validation error back to the conversation.
    async fn send_error(&self, destination: Destination, text: &str) -> ProtoResult<MessageHandle>;

    /// Replace the keyboard attached to a previously sent prompt.
    async fn edit_keyboard(
        &self,
        destination: Destination,
        handle: MessageHandle,
        keyboard: &Keyboard,
    ) -> ProtoResult<()>;

    /// Remove the keyboard attached to a previously sent prompt.
    async fn clear_keyboard(&self, destination: Destination, handle: MessageHandle)
    -> ProtoResult<()>;

    /// Acknowledge a button press, optionally showing a short answer.
    async fn acknowledge(&self, callback_id: &str, text: Option<&str>) -> ProtoResult<()>;
}

/// Log sink for faults raised inside validator bodies.
pub trait FaultSink: Send + Sync {
    fn record_fault(&self, fault: &str, context: &str);
}
