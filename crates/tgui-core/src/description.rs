//! Declarative descriptions of validators and form items.
//!
//! Descriptions are closed sum types. Raw tags are checked once, when a
//! description is deserialized or parsed, so unknown kinds surface as
//! configuration faults before any prompt is built.

use serde::Deserialize;

use crate::error::{TguiError, TguiResult};

/// Selects the behavior of a validator built by the validators factory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawValidator")]
pub enum ValidatorDescription {
    /// Never accepts free text.
    Error,
    /// Any non-empty text, optionally bounded in characters.
    String {
        max_len: Option<usize>,
        max_len_error: Option<String>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Text, or a media message with a caption.
    MessageWithText,
}

impl ValidatorDescription {
    /// Builds a description from its raw tag and numeric bounds.
    pub fn parse(kind: &str, min: Option<f64>, max: Option<f64>) -> TguiResult<Self> {
        match kind.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Self::Error),
            "STRING" => Ok(Self::String {
                max_len: None,
                max_len_error: None,
            }),
            "INTEGER" => {
                let min = min.map(whole_bound).transpose()?;
                let max = max.map(whole_bound).transpose()?;
                check_order(min, max)?;
                Ok(Self::Integer { min, max })
            }
            "FLOAT" => {
                check_order(min, max)?;
                Ok(Self::Float { min, max })
            }
            "MESSAGE_WITH_TEXT" => Ok(Self::MessageWithText),
            _ => Err(TguiError::UnsupportedValidator(kind.to_string())),
        }
    }
}

fn whole_bound(bound: f64) -> TguiResult<i64> {
    if bound.fract() != 0.0 || !bound.is_finite() {
        return Err(TguiError::InvalidBounds(format!(
            "integer bound {bound} is not a whole number"
        )));
    }
    // i64::MAX as f64 rounds up to 2^63, which no i64 holds.
    if !(i64::MIN as f64..i64::MAX as f64).contains(&bound) {
        return Err(TguiError::InvalidBounds(format!(
            "integer bound {bound} is out of range"
        )));
    }
    Ok(bound as i64)
}

fn check_order<T: PartialOrd + std::fmt::Display>(min: Option<T>, max: Option<T>) -> TguiResult<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(TguiError::InvalidBounds(format!(
            "min {min} is greater than max {max}"
        ))),
        _ => Ok(()),
    }
}

#[derive(Deserialize)]
struct RawValidator {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    max_len: Option<usize>,
    #[serde(default)]
    max_len_error: Option<String>,
}

impl TryFrom<RawValidator> for ValidatorDescription {
    type Error = TguiError;

    fn try_from(raw: RawValidator) -> TguiResult<Self> {
        match ValidatorDescription::parse(&raw.kind, raw.min, raw.max)? {
            ValidatorDescription::String { .. } => Ok(ValidatorDescription::String {
                max_len: raw.max_len,
                max_len_error: raw.max_len_error,
            }),
            other => Ok(other),
        }
    }
}

/// A button as declared in a description.
///
/// `off_title`, `is_on_initial` and `is_end_button` only matter for
/// multiple-choice items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceButton {
    pub title: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub off_title: Option<String>,
    #[serde(default)]
    pub is_on_initial: bool,
    #[serde(default)]
    pub is_end_button: bool,
}

impl ChoiceButton {
    pub fn new(title: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            title: title.into(),
            value,
            answer: None,
            off_title: None,
            is_on_initial: false,
            is_end_button: false,
        }
    }
}

/// Free input judged by a validator, optionally with shortcut buttons.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatedItem {
    pub key: String,
    pub greeting: String,
    pub validator: ValidatorDescription,
    pub error_message: String,
    #[serde(default)]
    pub buttons: Vec<Vec<ChoiceButton>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YesNoItem {
    pub key: String,
    pub greeting: String,
    pub error_message: String,
    #[serde(default = "default_yes_title")]
    pub yes_title: String,
    #[serde(default = "default_no_title")]
    pub no_title: String,
    #[serde(default)]
    pub yes_answer: Option<String>,
    #[serde(default)]
    pub no_answer: Option<String>,
}

fn default_yes_title() -> String {
    "Yes".to_string()
}

fn default_no_title() -> String {
    "No".to_string()
}

/// Pick exactly one button.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceItem {
    pub key: String,
    pub greeting: String,
    pub error_message: String,
    pub buttons: Vec<Vec<ChoiceButton>>,
    /// Reply with `error_message` to typed text instead of ignoring it.
    #[serde(default)]
    pub error_on_input: bool,
}

/// Toggle any number of buttons, then press an end button.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultipleChoiceItem {
    pub key: String,
    pub greeting: String,
    pub buttons: Vec<Vec<ChoiceButton>>,
}

/// An ordered composition of items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormItem {
    pub key: String,
    pub elements: Vec<ItemDescription>,
}

/// One element of a form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_yaml::Value")]
pub enum ItemDescription {
    Field(ValidatedItem),
    YesNo(YesNoItem),
    Choice(ChoiceItem),
    MultipleChoice(MultipleChoiceItem),
    Form(FormItem),
}

impl ItemDescription {
    /// Identity of the item inside its parent form.
    pub fn key(&self) -> &str {
        match self {
            Self::Field(item) => &item.key,
            Self::YesNo(item) => &item.key,
            Self::Choice(item) => &item.key,
            Self::MultipleChoice(item) => &item.key,
            Self::Form(item) => &item.key,
        }
    }
}

impl TryFrom<serde_yaml::Value> for ItemDescription {
    type Error = TguiError;

    fn try_from(value: serde_yaml::Value) -> TguiResult<Self> {
        let kind = value
            .get("type")
            .and_then(serde_yaml::Value::as_str)
            .ok_or(TguiError::MissingItemType)?
            .to_string();

        let item = match kind.as_str() {
            "field" => Self::Field(serde_yaml::from_value(value)?),
            "yes_no" => Self::YesNo(serde_yaml::from_value(value)?),
            "choice" => Self::Choice(serde_yaml::from_value(value)?),
            "multiple_choice" => Self::MultipleChoice(serde_yaml::from_value(value)?),
            "form" => Self::Form(serde_yaml::from_value(value)?),
            _ => return Err(TguiError::UnknownItemType(kind)),
        };
        Ok(item)
    }
}
