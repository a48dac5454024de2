//! Prompt state shared by every kind of field.
//!
//! A [`Field`] is a synchronous state machine. The owning
//! [`Session`](crate::Session) feeds it events under its lock and performs
//! the [`Effect`]s it returns; fields never touch the messenger themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tgui_proto::{FieldValue, InboundEvent, Keyboard, KeyboardButton};

use crate::validator::{Validator, ValidatorObject};

/// Outbound side effects requested by a transition.
///
/// Keyboard edits target the most recent prompt sent in the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SendPrompt {
        text: String,
        keyboard: Option<Keyboard>,
    },
    SendError {
        text: String,
    },
    EditKeyboard {
        keyboard: Keyboard,
    },
    ClearKeyboard,
    Acknowledge {
        callback_id: String,
        text: Option<String>,
    },
}

/// Result of feeding one event to an armed field.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The event is not meant for this field; nothing happens.
    Ignored,
    /// The event refers to a prompt that is no longer armed.
    Stale,
    /// Validation failed; the field stays armed.
    Rejected(Vec<Effect>),
    /// Internal state changed without resolving (multiple-choice toggles).
    Updated(Vec<Effect>),
    /// A form committed one element and armed the next.
    Advanced(Vec<Effect>),
    /// The field committed its data and is no longer armed.
    Resolved {
        value: FieldValue,
        effects: Vec<Effect>,
    },
}

/// Counter issuing button tokens.
///
/// Every activation of a primitive prompt takes a fresh token, so presses on
/// keyboards of earlier prompts never match the current one. Sessions of one
/// router share the counter, so a session opened again for the same chat
/// never reissues a token an old keyboard still carries.
#[derive(Debug, Default)]
pub struct ArmContext {
    issued: Arc<AtomicU64>,
}

impl ArmContext {
    /// A context drawing tokens from a shared counter.
    pub fn sharing(issued: Arc<AtomicU64>) -> Self {
        Self { issued }
    }

    pub fn issue_token(&mut self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// One unit of awaiting-input state.
pub trait Field: Send {
    /// Arms the field and returns the effects that present it.
    fn activate(&mut self, ctx: &mut ArmContext) -> Vec<Effect>;

    /// Feeds one inbound event to the armed field.
    fn handle(&mut self, event: &InboundEvent, ctx: &mut ArmContext) -> Transition;
}

/// Builds the payload carried by a rendered button.
pub fn button_payload(token: u64, index: usize) -> String {
    format!("{token}:{index}")
}

/// Splits a button payload into its token and flat button index.
pub fn parse_payload(payload: &str) -> Option<(u64, usize)> {
    let (token, index) = payload.split_once(':')?;
    Some((token.parse().ok()?, index.parse().ok()?))
}

/// Resolves a press against the field's token, returning the button index.
pub(crate) fn pressed_index(payload: &str, token: u64) -> Option<usize> {
    parse_payload(payload)
        .filter(|(pressed, _)| *pressed == token)
        .map(|(_, index)| index)
}

/// A button that resolves its prompt with `value` when pressed.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub title: String,
    pub value: serde_json::Value,
    /// Short acknowledgement shown to the user on press.
    pub answer: Option<String>,
}

impl Button {
    pub fn new(title: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            title: title.into(),
            value,
            answer: None,
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }
}

/// A prompt judged by a validator, optionally offering buttons.
#[derive(Debug)]
pub struct InputField {
    greeting: String,
    validator: Validator,
    buttons: Vec<Vec<Button>>,
    ignore_message_input: bool,
    token: Option<u64>,
}

impl InputField {
    pub fn new(validator: Validator) -> Self {
        Self {
            greeting: String::new(),
            validator,
            buttons: Vec::new(),
            ignore_message_input: false,
            token: None,
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Discard text messages silently instead of validating them.
    pub fn ignore_message_input(mut self, ignore: bool) -> Self {
        self.ignore_message_input = ignore;
        self
    }

    pub fn is_armed(&self) -> bool {
        self.token.is_some()
    }

    fn has_buttons(&self) -> bool {
        self.buttons.iter().any(|row| !row.is_empty())
    }

    fn keyboard(&self, token: u64) -> Keyboard {
        let mut index = 0;
        let rows = self
            .buttons
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        let rendered = KeyboardButton::new(&button.title, button_payload(token, index));
                        index += 1;
                        rendered
                    })
                    .collect()
            })
            .collect();
        Keyboard::new(rows)
    }

    fn button_at(&self, index: usize) -> Option<&Button> {
        self.buttons.iter().flatten().nth(index)
    }

    fn resolve(&mut self, value: FieldValue, mut effects: Vec<Effect>) -> Transition {
        self.token = None;
        if self.has_buttons() {
            effects.push(Effect::ClearKeyboard);
        }
        Transition::Resolved { value, effects }
    }
}

impl Field for InputField {
    fn activate(&mut self, ctx: &mut ArmContext) -> Vec<Effect> {
        let token = ctx.issue_token();
        self.token = Some(token);
        let keyboard = self.has_buttons().then(|| self.keyboard(token));
        vec![Effect::SendPrompt {
            text: self.greeting.clone(),
            keyboard,
        }]
    }

    fn handle(&mut self, event: &InboundEvent, _ctx: &mut ArmContext) -> Transition {
        let Some(token) = self.token else {
            return Transition::Stale;
        };

        match event {
            InboundEvent::Message(message) => {
                if self.ignore_message_input {
                    return Transition::Ignored;
                }
                let checked = self.validator.validate(ValidatorObject::new(message.clone()));
                match checked.into_outcome() {
                    Ok(value) => self.resolve(value, Vec::new()),
                    Err(text) => Transition::Rejected(vec![Effect::SendError { text }]),
                }
            }
            InboundEvent::ButtonPress(press) => {
                let Some(button) =
                    pressed_index(&press.payload, token).and_then(|index| self.button_at(index))
                else {
                    return Transition::Stale;
                };
                let value = FieldValue::Choice(button.value.clone());
                let acknowledge = Effect::Acknowledge {
                    callback_id: press.callback_id.clone(),
                    text: button.answer.clone(),
                };
                self.resolve(value, vec![acknowledge])
            }
        }
    }
}
