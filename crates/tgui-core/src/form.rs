use std::collections::{BTreeMap, HashSet};

use tgui_proto::{FieldValue, InboundEvent};
use tracing::debug;

use crate::error::{TguiError, TguiResult};
use crate::field::{ArmContext, Effect, Field, Transition};

/// A keyed element of a [`FormState`].
pub struct FormElement {
    pub key: String,
    pub field: Box<dyn Field>,
}

impl FormElement {
    pub fn new(key: impl Into<String>, field: impl Field + 'static) -> Self {
        Self {
            key: key.into(),
            field: Box::new(field),
        }
    }
}

/// Sequences fields (or nested forms) into one ordered interaction.
///
/// From its parent's point of view a form is just another [`Field`]: it
/// arms its first element on activation, advances on every element
/// resolution, and resolves with all collected values keyed by element key
/// once the last element resolves.
pub struct FormState {
    key: String,
    elements: Vec<FormElement>,
    cursor: usize,
    collected: BTreeMap<String, FieldValue>,
}

impl FormState {
    pub fn new(key: impl Into<String>, elements: Vec<FormElement>) -> TguiResult<Self> {
        let key = key.into();
        if elements.is_empty() {
            return Err(TguiError::EmptyForm(key));
        }
        let mut seen = HashSet::new();
        for element in &elements {
            if !seen.insert(element.key.as_str()) {
                return Err(TguiError::DuplicateKey {
                    form: key,
                    key: element.key.clone(),
                });
            }
        }
        Ok(Self {
            key,
            elements,
            cursor: 0,
            collected: BTreeMap::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Index of the element currently awaiting input.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Field for FormState {
    fn activate(&mut self, ctx: &mut ArmContext) -> Vec<Effect> {
        self.cursor = 0;
        self.collected.clear();
        debug!(form = %self.key, "Starting form");
        self.elements[0].field.activate(ctx)
    }

    fn handle(&mut self, event: &InboundEvent, ctx: &mut ArmContext) -> Transition {
        let Some(current) = self.elements.get_mut(self.cursor) else {
            return Transition::Stale;
        };

        let (value, mut effects) = match current.field.handle(event, ctx) {
            Transition::Resolved { value, effects } => (value, effects),
            other => return other,
        };

        debug!(form = %self.key, element = %current.key, "Form element resolved");
        self.collected.insert(current.key.clone(), value);
        self.cursor += 1;

        match self.elements.get_mut(self.cursor) {
            Some(next) => {
                effects.extend(next.field.activate(ctx));
                Transition::Advanced(effects)
            }
            None => {
                debug!(form = %self.key, "Form resolved");
                Transition::Resolved {
                    value: FieldValue::Form(std::mem::take(&mut self.collected)),
                    effects,
                }
            }
        }
    }
}
