//! Values committed by resolved prompts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::InboundMessage;

/// Current state of one multiple-choice button at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toggle {
    pub value: serde_json::Value,
    pub is_on: bool,
}

/// Data extracted from a validated reply or a button press.
///
/// Serializes untagged, so a resolved form renders as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// The whole inbound message, for prompts that accept media with captions.
    Message(InboundMessage),
    /// The value bound to a pressed button.
    Choice(serde_json::Value),
    /// Every multiple-choice button with its final on/off state.
    Toggles(Vec<Toggle>),
    /// Collected form data keyed by element key.
    Form(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Form(entries) => Some(entries),
            _ => None,
        }
    }

    /// Converts into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
