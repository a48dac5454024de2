//! Test doubles for the collaborator capabilities.
//!
//! [`MockMessenger`] records every outbound call; [`RecordingFaultSink`]
//! records every fault the validator pipeline catches.

use std::sync::Mutex;

use async_trait::async_trait;
use tgui_proto::{
    Destination, FaultSink, InboundEvent, InboundMessage, Keyboard, MessageHandle, Messenger,
    ProtoError, ProtoResult,
};

/// One outbound call captured by [`MockMessenger`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Prompt {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Error {
        chat_id: i64,
        text: String,
    },
    EditKeyboard {
        chat_id: i64,
        message_id: i32,
        keyboard: Keyboard,
    },
    ClearKeyboard {
        chat_id: i64,
        message_id: i32,
    },
    Acknowledge {
        callback_id: String,
        text: Option<String>,
    },
}

/// A [`Messenger`] that records calls instead of delivering them.
#[derive(Debug, Default)]
pub struct MockMessenger {
    sent: Mutex<Vec<Sent>>,
    next_id: Mutex<i32>,
    last_prompt: Mutex<Option<MessageHandle>>,
    should_fail: bool,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A messenger whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        lock(&self.sent).clone()
    }

    /// Texts of every prompt sent so far.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter_map(|sent| match sent {
                Sent::Prompt { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of every error sent so far.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter_map(|sent| match sent {
                Sent::Error { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Keyboard of the most recent prompt or keyboard edit.
    pub fn last_keyboard(&self) -> Option<Keyboard> {
        lock(&self.sent).iter().rev().find_map(|sent| match sent {
            Sent::Prompt { keyboard, .. } => keyboard.clone(),
            Sent::EditKeyboard { keyboard, .. } => Some(keyboard.clone()),
            _ => None,
        })
    }

    /// Payload of the button titled `title` on the most recent keyboard.
    pub fn payload_of(&self, title: &str) -> Option<String> {
        self.last_keyboard()?
            .buttons()
            .find(|button| button.title == title)
            .map(|button| button.payload.clone())
    }

    pub fn last_prompt_handle(&self) -> Option<MessageHandle> {
        *lock(&self.last_prompt)
    }

    /// Reserves the next message id of the chat, as Telegram numbers user
    /// and bot messages from one sequence.
    pub fn next_message_id(&self) -> i32 {
        self.next_handle().message_id
    }

    /// A text message from the user, sent after everything recorded so far.
    pub fn user_message(&self, text: impl Into<String>) -> InboundMessage {
        InboundMessage::text(self.next_message_id(), text)
    }

    pub fn user_text(&self, text: impl Into<String>) -> InboundEvent {
        InboundEvent::Message(self.user_message(text))
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
    }

    fn record(&self, chat_id: i64, sent: Sent) -> ProtoResult<()> {
        if self.should_fail {
            return Err(ProtoError::Delivery {
                chat_id,
                reason: "mock failure".to_string(),
            });
        }
        lock(&self.sent).push(sent);
        Ok(())
    }

    fn next_handle(&self) -> MessageHandle {
        let mut id = lock(&self.next_id);
        *id += 1;
        MessageHandle { message_id: *id }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_prompt(
        &self,
        destination: Destination,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> ProtoResult<MessageHandle> {
        self.record(
            destination.chat_id,
            Sent::Prompt {
                chat_id: destination.chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            },
        )?;
        let handle = self.next_handle();
        *lock(&self.last_prompt) = Some(handle);
        Ok(handle)
    }

    async fn send_error(&self, destination: Destination, text: &str) -> ProtoResult<MessageHandle> {
        self.record(
            destination.chat_id,
            Sent::Error {
                chat_id: destination.chat_id,
                text: text.to_string(),
            },
        )?;
        Ok(self.next_handle())
    }

    async fn edit_keyboard(
        &self,
        destination: Destination,
        handle: MessageHandle,
        keyboard: &Keyboard,
    ) -> ProtoResult<()> {
        self.record(
            destination.chat_id,
            Sent::EditKeyboard {
                chat_id: destination.chat_id,
                message_id: handle.message_id,
                keyboard: keyboard.clone(),
            },
        )
    }

    async fn clear_keyboard(
        &self,
        destination: Destination,
        handle: MessageHandle,
    ) -> ProtoResult<()> {
        self.record(
            destination.chat_id,
            Sent::ClearKeyboard {
                chat_id: destination.chat_id,
                message_id: handle.message_id,
            },
        )
    }

    async fn acknowledge(&self, callback_id: &str, text: Option<&str>) -> ProtoResult<()> {
        if self.should_fail {
            return Err(ProtoError::Acknowledge {
                callback_id: callback_id.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        lock(&self.sent).push(Sent::Acknowledge {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}

/// A [`FaultSink`] that keeps every `(fault, context)` pair.
#[derive(Debug, Default)]
pub struct RecordingFaultSink {
    faults: Mutex<Vec<(String, String)>>,
}

impl RecordingFaultSink {
    pub fn faults(&self) -> Vec<(String, String)> {
        lock(&self.faults).clone()
    }
}

impl FaultSink for RecordingFaultSink {
    fn record_fault(&self, fault: &str, context: &str) {
        lock(&self.faults).push((fault.to_string(), context.to_string()));
    }
}
