use tgui_proto::{FieldValue, InboundEvent, Keyboard, KeyboardButton, Toggle};

use crate::field::{ArmContext, Effect, Field, Transition, button_payload, pressed_index};

/// A toggle button of a [`MultipleChoice`] prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleChoiceButton {
    pub title_on: String,
    /// Label while off; falls back to `title_on`.
    pub title_off: Option<String>,
    pub value: serde_json::Value,
    pub answer: Option<String>,
    pub is_on_initial: bool,
    /// Pressing this button submits the current selection.
    pub is_end_button: bool,
}

impl MultipleChoiceButton {
    pub fn toggle(title_on: impl Into<String>, title_off: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            title_on: title_on.into(),
            title_off: Some(title_off.into()),
            value,
            answer: None,
            is_on_initial: false,
            is_end_button: false,
        }
    }

    pub fn end(title: impl Into<String>) -> Self {
        Self {
            title_on: title.into(),
            title_off: None,
            value: serde_json::Value::Null,
            answer: None,
            is_on_initial: false,
            is_end_button: true,
        }
    }

    fn title(&self, is_on: bool) -> &str {
        if is_on {
            &self.title_on
        } else {
            self.title_off.as_deref().unwrap_or(&self.title_on)
        }
    }
}

/// A prompt whose buttons toggle independently until an end button is pressed.
///
/// Resolves with one [`Toggle`] per non-end button, in row order. Text
/// messages are ignored.
#[derive(Debug)]
pub struct MultipleChoice {
    greeting: String,
    buttons: Vec<Vec<MultipleChoiceButton>>,
    states: Vec<bool>,
    token: Option<u64>,
}

impl MultipleChoice {
    pub fn new(buttons: Vec<Vec<MultipleChoiceButton>>) -> Self {
        let states = buttons.iter().flatten().map(|b| b.is_on_initial).collect();
        Self {
            greeting: String::new(),
            buttons,
            states,
            token: None,
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Current on/off state of each button, in row order.
    pub fn states(&self) -> &[bool] {
        &self.states
    }

    fn keyboard(&self, token: u64) -> Keyboard {
        let mut index = 0;
        let rows = self
            .buttons
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        let title = button.title(self.states[index]);
                        let rendered = KeyboardButton::new(title, button_payload(token, index));
                        index += 1;
                        rendered
                    })
                    .collect()
            })
            .collect();
        Keyboard::new(rows)
    }

    fn selection(&self) -> Vec<Toggle> {
        self.buttons
            .iter()
            .flatten()
            .zip(&self.states)
            .filter(|(button, _)| !button.is_end_button)
            .map(|(button, is_on)| Toggle {
                value: button.value.clone(),
                is_on: *is_on,
            })
            .collect()
    }
}

impl Field for MultipleChoice {
    fn activate(&mut self, ctx: &mut ArmContext) -> Vec<Effect> {
        let token = ctx.issue_token();
        self.token = Some(token);
        self.states = self.buttons.iter().flatten().map(|b| b.is_on_initial).collect();
        vec![Effect::SendPrompt {
            text: self.greeting.clone(),
            keyboard: Some(self.keyboard(token)),
        }]
    }

    fn handle(&mut self, event: &InboundEvent, _ctx: &mut ArmContext) -> Transition {
        let Some(token) = self.token else {
            return Transition::Stale;
        };
        let InboundEvent::ButtonPress(press) = event else {
            return Transition::Ignored;
        };
        let Some((index, button)) = pressed_index(&press.payload, token)
            .and_then(|index| Some((index, self.buttons.iter().flatten().nth(index)?)))
        else {
            return Transition::Stale;
        };

        let acknowledge = Effect::Acknowledge {
            callback_id: press.callback_id.clone(),
            text: button.answer.clone(),
        };

        if button.is_end_button {
            self.token = None;
            return Transition::Resolved {
                value: FieldValue::Toggles(self.selection()),
                effects: vec![acknowledge, Effect::ClearKeyboard],
            };
        }

        self.states[index] = !self.states[index];
        Transition::Updated(vec![
            acknowledge,
            Effect::EditKeyboard {
                keyboard: self.keyboard(token),
            },
        ])
    }
}
