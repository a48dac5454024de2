//! # tgui-core
//!
//! Validation and advancement state machine for chat prompts.
//!
//! This crate provides:
//! - The validator pipeline and the factory that builds validators
//! - Prompt state for validated input, yes/no, choice and multiple choice
//! - Forms composing prompts (and nested forms) into ordered flows
//! - The field factory turning declarative descriptions into prompts
//! - Per-conversation sessions and the router that feeds them events
//!
//! Transport, formatting and fault logging stay behind the capability
//! traits in `tgui-proto`.

mod config;
pub mod description;
mod error;
pub mod field;
mod fields_factory;
mod form;
mod multiple_choice;
mod router;
mod session;
pub mod testing;
pub mod validator;
mod validators_factory;

pub use config::BotConfig;
pub use description::{
    ChoiceButton, ChoiceItem, FormItem, ItemDescription, MultipleChoiceItem, ValidatedItem,
    ValidatorDescription, YesNoItem,
};
pub use error::{TguiError, TguiResult};
pub use field::{ArmContext, Button, Effect, Field, InputField, Transition};
pub use fields_factory::FieldsFactory;
pub use form::{FormElement, FormState};
pub use multiple_choice::{MultipleChoice, MultipleChoiceButton};
pub use router::Router;
pub use session::{DispatchOutcome, FieldOutcome, PendingField, Session};
pub use validator::{TracingFaultSink, Validator, ValidatorObject};
pub use validators_factory::ValidatorsFactory;
