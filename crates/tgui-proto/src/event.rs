//! Inbound events and the conversation they belong to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a single ongoing conversation.
///
/// At most one prompt may be armed per destination at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub chat_id: i64,
}

impl Destination {
    pub fn new(chat_id: i64) -> Self {
        Self { chat_id }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat:{}", self.chat_id)
    }
}

/// A rich-text span attached to a message text or caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    pub kind: String,
    pub offset: usize,
    pub length: usize,
}

/// A free-text (or media with caption) message sent by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<MessageEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_entities: Option<Vec<MessageEntity>>,
}

impl InboundMessage {
    /// A plain text message.
    pub fn text(message_id: i32, text: impl Into<String>) -> Self {
        Self {
            message_id,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A media message carrying only a caption.
    pub fn captioned(message_id: i32, caption: impl Into<String>) -> Self {
        Self {
            message_id,
            caption: Some(caption.into()),
            ..Self::default()
        }
    }
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    /// Collaborator-side identifier used to acknowledge the press.
    pub callback_id: String,
    /// The payload that was attached to the pressed button.
    pub payload: String,
}

impl ButtonPress {
    pub fn new(callback_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            callback_id: callback_id.into(),
            payload: payload.into(),
        }
    }
}

/// Anything a user can do to an armed prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(InboundMessage),
    ButtonPress(ButtonPress),
}

impl InboundEvent {
    pub fn text(message_id: i32, text: impl Into<String>) -> Self {
        Self::Message(InboundMessage::text(message_id, text))
    }

    pub fn press(callback_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::ButtonPress(ButtonPress::new(callback_id, payload))
    }
}
