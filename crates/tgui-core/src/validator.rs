//! Validator pipeline.
//!
//! A [`Validator`] judges one captured inbound message and returns a new
//! [`ValidatorObject`] carrying either extracted data or an error. Validators
//! are total: [`guard`] wraps every body so that errors and panics become a
//! generic recoverable failure, recorded once to the [`FaultSink`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tgui_proto::{FaultSink, FieldValue, InboundMessage};
use tracing::error;

/// Marker prepended to the generic fault message.
pub const FAULT_MARKER: &str = "❌";

/// Prefix of the message shown when a validator body faults.
pub const FAULT_PREFIX: &str = "Something went wrong while checking the value. Error text: ";

/// Error shown when a validator fails without supplying text.
const DEFAULT_ERROR: &str = "Invalid value";

/// One validation attempt.
///
/// Each stage consumes the object and returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorObject {
    pub message: InboundMessage,
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<FieldValue>,
}

impl ValidatorObject {
    pub fn new(message: InboundMessage) -> Self {
        Self {
            message,
            success: true,
            error: None,
            data: None,
        }
    }

    /// Marks the attempt as failed with the given error text.
    pub fn fail(self, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..self
        }
    }

    pub fn with_data(self, data: FieldValue) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }

    /// Message text, or empty when the message carries none.
    pub fn text(&self) -> &str {
        self.message.text.as_deref().unwrap_or_default()
    }

    /// Splits the attempt into committed data or the error to show.
    ///
    /// A successful attempt without extracted data commits the message itself.
    pub fn into_outcome(self) -> Result<FieldValue, String> {
        if self.success {
            Ok(self.data.unwrap_or(FieldValue::Message(self.message)))
        } else {
            Err(self.error.unwrap_or_else(|| DEFAULT_ERROR.to_string()))
        }
    }
}

type ValidateFn = dyn Fn(ValidatorObject) -> ValidatorObject + Send + Sync;

/// A total function from one attempt to its judged result.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<ValidateFn>,
}

impl Validator {
    pub fn new(f: impl Fn(ValidatorObject) -> ValidatorObject + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn validate(&self, object: ValidatorObject) -> ValidatorObject {
        (self.inner)(object)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

/// Wraps a fallible validator body into a total [`Validator`].
///
/// An `Err` or a panic inside `body` is recorded to `sink` and turned into a
/// failed attempt whose error is the generic fault message.
pub fn guard<F>(sink: Arc<dyn FaultSink>, body: F) -> Validator
where
    F: Fn(ValidatorObject) -> anyhow::Result<ValidatorObject> + Send + Sync + 'static,
{
    Validator::new(move |object: ValidatorObject| {
        let message = object.message.clone();
        let fault = match panic::catch_unwind(AssertUnwindSafe(|| body(object))) {
            Ok(Ok(checked)) => return checked,
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_text(payload.as_ref()),
        };
        sink.record_fault(&fault, "validator");
        ValidatorObject::new(message).fail(fault_message(&fault))
    })
}

/// The user-facing text for an internal fault.
pub fn fault_message(fault: &str) -> String {
    format!("{FAULT_MARKER} {FAULT_PREFIX}{fault}")
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "validator panicked".to_string()
    }
}

/// Default [`FaultSink`] that forwards faults to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn record_fault(&self, fault: &str, context: &str) {
        error!(context, fault, "Validator fault");
    }
}
