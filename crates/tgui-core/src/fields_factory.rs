//! Builds prompts and forms from item descriptions.

use std::sync::Arc;

use serde_json::Value;
use tgui_proto::FaultSink;

use crate::description::{
    ChoiceButton, ChoiceItem, FormItem, ItemDescription, MultipleChoiceItem, ValidatedItem,
    YesNoItem,
};
use crate::error::TguiResult;
use crate::field::{Button, Field, InputField};
use crate::form::{FormElement, FormState};
use crate::multiple_choice::{MultipleChoice, MultipleChoiceButton};
use crate::validators_factory::ValidatorsFactory;

/// Turns declarative items into configured, not yet armed, fields.
#[derive(Clone, Default)]
pub struct FieldsFactory {
    validators: ValidatorsFactory,
}

impl FieldsFactory {
    pub fn new(validators: ValidatorsFactory) -> Self {
        Self { validators }
    }

    pub fn with_fault_sink(sink: Arc<dyn FaultSink>) -> Self {
        Self::new(ValidatorsFactory::new(sink))
    }

    pub fn validators(&self) -> &ValidatorsFactory {
        &self.validators
    }

    pub fn get(&self, item: &ItemDescription) -> TguiResult<Box<dyn Field>> {
        Ok(match item {
            ItemDescription::Field(item) => Box::new(self.field(item)),
            ItemDescription::YesNo(item) => Box::new(self.yes_no(item)),
            ItemDescription::Choice(item) => Box::new(self.choice(item)),
            ItemDescription::MultipleChoice(item) => Box::new(self.multiple_choice(item)),
            ItemDescription::Form(item) => Box::new(self.form(item)?),
        })
    }

    pub fn field(&self, item: &ValidatedItem) -> InputField {
        InputField::new(self.validators.get(&item.validator, &item.error_message))
            .with_buttons(map_rows(&item.buttons, input_button))
            .with_greeting(&item.greeting)
    }

    /// Yes/No buttons; typed text is answered with the item's error message.
    pub fn yes_no(&self, item: &YesNoItem) -> InputField {
        let yes = Button {
            title: item.yes_title.clone(),
            value: Value::Bool(true),
            answer: item.yes_answer.clone(),
        };
        let no = Button {
            title: item.no_title.clone(),
            value: Value::Bool(false),
            answer: item.no_answer.clone(),
        };
        InputField::new(self.validators.always_error(&item.error_message))
            .with_buttons(vec![vec![yes, no]])
            .ignore_message_input(false)
            .with_greeting(&item.greeting)
    }

    pub fn choice(&self, item: &ChoiceItem) -> InputField {
        InputField::new(self.validators.always_error(&item.error_message))
            .with_buttons(map_rows(&item.buttons, input_button))
            .ignore_message_input(!item.error_on_input)
            .with_greeting(&item.greeting)
    }

    pub fn multiple_choice(&self, item: &MultipleChoiceItem) -> MultipleChoice {
        MultipleChoice::new(map_rows(&item.buttons, multiple_choice_button))
            .with_greeting(&item.greeting)
    }

    /// Builds a form, recursively building every element.
    pub fn form(&self, item: &FormItem) -> TguiResult<FormState> {
        let elements = item
            .elements
            .iter()
            .map(|element| {
                Ok(FormElement {
                    key: element.key().to_string(),
                    field: self.get(element)?,
                })
            })
            .collect::<TguiResult<Vec<_>>>()?;
        FormState::new(&item.key, elements)
    }
}

fn map_rows<T>(rows: &[Vec<ChoiceButton>], convert: fn(&ChoiceButton) -> T) -> Vec<Vec<T>> {
    rows.iter()
        .map(|row| row.iter().map(convert).collect())
        .collect()
}

fn input_button(button: &ChoiceButton) -> Button {
    Button {
        title: button.title.clone(),
        value: button.value.clone(),
        answer: button.answer.clone(),
    }
}

fn multiple_choice_button(button: &ChoiceButton) -> MultipleChoiceButton {
    MultipleChoiceButton {
        title_on: button.title.clone(),
        title_off: button.off_title.clone(),
        value: button.value.clone(),
        answer: button.answer.clone(),
        is_on_initial: button.is_on_initial,
        is_end_button: button.is_end_button,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TguiError;
    use crate::field::{ArmContext, Effect, Transition};
    use serde_json::json;
    use tgui_proto::{FieldValue, InboundEvent};

    fn parse(yaml: &str) -> ItemDescription {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn keyboard_titles(effects: &[Effect]) -> Vec<String> {
        match effects.first() {
            Some(Effect::SendPrompt {
                keyboard: Some(keyboard),
                ..
            }) => keyboard.buttons().map(|b| b.title.clone()).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn yes_no_answers_text_with_error() {
        let item = parse(
            "{type: yes_no, key: agree, greeting: Agree?, error_message: Tap a button, yes_title: Sure}",
        );
        let mut ctx = ArmContext::default();
        let mut field = FieldsFactory::default().get(&item).unwrap();

        assert_eq!(keyboard_titles(&field.activate(&mut ctx)), ["Sure", "No"]);
        assert_eq!(
            field.handle(&InboundEvent::text(1, "yes"), &mut ctx),
            Transition::Rejected(vec![Effect::SendError {
                text: "Tap a button".into()
            }])
        );
        let Transition::Resolved { value, .. } =
            field.handle(&InboundEvent::press("cb", "1:1"), &mut ctx)
        else {
            panic!("expected resolution");
        };
        assert_eq!(value, FieldValue::Choice(json!(false)));
    }

    #[test]
    fn choice_ignores_text_unless_error_on_input() {
        let quiet = parse(
            "{type: choice, key: size, greeting: Size?, error_message: Pick one, buttons: [[{title: S, value: s}, {title: L, value: l}]]}",
        );
        let loud = parse(
            "{type: choice, key: size, greeting: Size?, error_message: Pick one, error_on_input: true, buttons: [[{title: S, value: s}]]}",
        );
        let factory = FieldsFactory::default();
        let mut ctx = ArmContext::default();

        let mut field = factory.get(&quiet).unwrap();
        field.activate(&mut ctx);
        assert_eq!(
            field.handle(&InboundEvent::text(1, "L"), &mut ctx),
            Transition::Ignored
        );

        let mut field = factory.get(&loud).unwrap();
        field.activate(&mut ctx);
        assert!(matches!(
            field.handle(&InboundEvent::text(1, "L"), &mut ctx),
            Transition::Rejected(_)
        ));
    }

    #[test]
    fn validated_field_offers_shortcut_buttons() {
        let item = parse(
            "{type: field, key: age, greeting: Age?, error_message: Number please, validator: {type: INTEGER, min: 0}, buttons: [[{title: Skip, value: null}]]}",
        );
        let mut ctx = ArmContext::default();
        let mut field = FieldsFactory::default().get(&item).unwrap();
        assert_eq!(keyboard_titles(&field.activate(&mut ctx)), ["Skip"]);
        assert!(matches!(
            field.handle(&InboundEvent::text(1, "-1"), &mut ctx),
            Transition::Rejected(_)
        ));
        let Transition::Resolved { value, effects } =
            field.handle(&InboundEvent::text(2, "7"), &mut ctx)
        else {
            panic!("expected resolution");
        };
        assert_eq!(value, FieldValue::Integer(7));
        assert_eq!(effects, vec![Effect::ClearKeyboard]);
    }

    #[test]
    fn multiple_choice_uses_off_titles() {
        let item = parse(
            "{type: multiple_choice, key: extras, greeting: Extras?, buttons: [[{title: '+ Ice', off_title: Ice, value: ice, is_on_initial: true}, {title: '+ Lime', off_title: Lime, value: lime}], [{title: Done, is_end_button: true}]]}",
        );
        let mut ctx = ArmContext::default();
        let mut field = FieldsFactory::default().get(&item).unwrap();
        assert_eq!(
            keyboard_titles(&field.activate(&mut ctx)),
            ["+ Ice", "Lime", "Done"]
        );
    }

    #[test]
    fn form_with_duplicate_keys_fails_to_build() {
        let item = parse(
            "{type: form, key: f, elements: [{type: yes_no, key: a, greeting: A, error_message: e}, {type: yes_no, key: a, greeting: B, error_message: e}]}",
        );
        let err = FieldsFactory::default().get(&item).err().unwrap();
        assert!(matches!(err, TguiError::DuplicateKey { .. }));
    }

    #[test]
    fn nested_empty_form_fails_to_build() {
        let item = parse("{type: form, key: outer, elements: [{type: form, key: inner, elements: []}]}");
        let err = FieldsFactory::default().get(&item).err().unwrap();
        assert!(matches!(err, TguiError::EmptyForm(ref key) if key == "inner"));
    }
}
