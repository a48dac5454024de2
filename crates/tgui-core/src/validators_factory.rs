//! Builds validators from descriptions.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tgui_proto::{FaultSink, FieldValue};

use crate::description::ValidatorDescription;
use crate::validator::{TracingFaultSink, Validator, ValidatorObject, guard};

static INTEGER_GRAMMAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("integer grammar is a valid regex"));
static FLOAT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("float grammar is a valid regex")
});

/// Selects and builds [`Validator`]s.
///
/// Every validator it returns is guarded: faults in the body are recorded to
/// the configured sink and shown to the user as a generic failure.
#[derive(Clone)]
pub struct ValidatorsFactory {
    sink: Arc<dyn FaultSink>,
}

impl Default for ValidatorsFactory {
    fn default() -> Self {
        Self::new(Arc::new(TracingFaultSink))
    }
}

impl ValidatorsFactory {
    pub fn new(sink: Arc<dyn FaultSink>) -> Self {
        Self { sink }
    }

    pub fn get(&self, description: &ValidatorDescription, error_message: &str) -> Validator {
        match description {
            ValidatorDescription::Error => self.always_error(error_message),
            ValidatorDescription::String {
                max_len,
                max_len_error,
            } => self.string(error_message, *max_len, max_len_error.as_deref()),
            ValidatorDescription::Integer { min, max } => self.integer(error_message, *min, *max),
            ValidatorDescription::Float { min, max } => self.floating(error_message, *min, *max),
            ValidatorDescription::MessageWithText => self.message_with_text(error_message),
        }
    }

    /// Rejects every message. Used by prompts that only accept buttons.
    pub fn always_error(&self, error_message: &str) -> Validator {
        let error_message = error_message.to_string();
        self.guarded(move |object| Ok(object.fail(error_message.as_str())))
    }

    pub fn string(
        &self,
        error_message: &str,
        max_len: Option<usize>,
        max_len_error: Option<&str>,
    ) -> Validator {
        let error_message = error_message.to_string();
        let max_len_error = max_len_error.map(str::to_string);
        self.guarded(move |object| {
            let text = object.text().to_string();
            if text.is_empty() {
                return Ok(object.fail(error_message.as_str()));
            }
            if let Some(max_len) = max_len
                && text.chars().count() > max_len
            {
                let error = max_len_error.as_deref().unwrap_or(&error_message);
                return Ok(object.fail(error));
            }
            Ok(object.with_data(FieldValue::Text(text)))
        })
    }

    pub fn integer(&self, error_message: &str, min: Option<i64>, max: Option<i64>) -> Validator {
        let error_message = error_message.to_string();
        self.guarded(move |object| {
            let raw = object.text().to_string();
            let object = object.with_data(FieldValue::Text(raw.clone()));
            if !INTEGER_GRAMMAR.is_match(&raw) {
                return Ok(object.fail(error_message.as_str()));
            }
            match raw.parse::<i64>() {
                Ok(value) if within(value, min, max) => {
                    Ok(object.with_data(FieldValue::Integer(value)))
                }
                // Out of range, including values that overflow i64.
                _ => Ok(object.fail(error_message.as_str())),
            }
        })
    }

    pub fn floating(&self, error_message: &str, min: Option<f64>, max: Option<f64>) -> Validator {
        let error_message = error_message.to_string();
        self.guarded(move |object| {
            let raw = object.text().to_string();
            let object = object.with_data(FieldValue::Text(raw.clone()));
            if !FLOAT_GRAMMAR.is_match(&raw) {
                return Ok(object.fail(error_message.as_str()));
            }
            let value: f64 = raw.parse()?;
            // Digit strings past f64::MAX parse as infinity.
            if value.is_finite() && within(value, min, max) {
                Ok(object.with_data(FieldValue::Float(value)))
            } else {
                Ok(object.fail(error_message.as_str()))
            }
        })
    }

    /// Accepts text, or a media message with a caption.
    ///
    /// Missing text and entities are backfilled from the caption, and the
    /// whole message becomes the committed data.
    pub fn message_with_text(&self, error_message: &str) -> Validator {
        let error_message = error_message.to_string();
        self.guarded(move |object| {
            if is_blank(object.message.text.as_deref()) && is_blank(object.message.caption.as_deref())
            {
                return Ok(object.fail(error_message.as_str()));
            }
            let mut message = object.message.clone();
            if is_blank(message.text.as_deref()) {
                message.text = message.caption.clone();
            }
            if message.entities.is_none() {
                message.entities = message.caption_entities.clone();
            }
            Ok(ValidatorObject {
                data: Some(FieldValue::Message(message.clone())),
                message,
                ..object
            })
        })
    }

    fn guarded<F>(&self, body: F) -> Validator
    where
        F: Fn(ValidatorObject) -> anyhow::Result<ValidatorObject> + Send + Sync + 'static,
    {
        guard(self.sink.clone(), body)
    }
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

fn is_blank(text: Option<&str>) -> bool {
    text.is_none_or(str::is_empty)
}
