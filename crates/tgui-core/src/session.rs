//! Per-conversation session holding the single armed prompt.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tgui_proto::{Destination, FieldValue, InboundEvent, MessageHandle, Messenger};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::field::{ArmContext, Effect, Field, Transition};

/// How an armed field ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Resolved(FieldValue),
    Cancelled,
}

/// What a dispatched event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The armed field resolved and the slot is now empty.
    Resolved,
    /// A form committed an element and armed the next one.
    Advanced,
    /// Internal prompt state changed (multiple-choice toggle).
    Updated,
    /// Validation failed; an error was delivered.
    Rejected,
    /// The armed field discards this kind of event.
    Ignored,
    /// Nothing armed matches the event.
    Stale,
}

/// Resolution notification for a field handed to [`Session::arm`].
#[derive(Debug)]
pub struct PendingField {
    rx: oneshot::Receiver<FieldOutcome>,
}

impl PendingField {
    /// Waits until the field resolves or is cancelled.
    pub async fn wait(self) -> FieldOutcome {
        self.rx.await.unwrap_or(FieldOutcome::Cancelled)
    }
}

struct ArmedField {
    field: Box<dyn Field>,
    notify: oneshot::Sender<FieldOutcome>,
}

#[derive(Default)]
struct SessionState {
    armed: Option<ArmedField>,
    context: ArmContext,
    last_prompt: Option<MessageHandle>,
    keyboard_shown: bool,
    /// Set when a router drops this session; arming through the router then
    /// opens a new one.
    closed: bool,
}

impl SessionState {
    /// A reply numbered below the armed prompt was sent before the user saw it.
    fn predates_prompt(&self, event: &InboundEvent) -> bool {
        let InboundEvent::Message(message) = event else {
            return false;
        };
        self.armed.is_some()
            && self
                .last_prompt
                .is_some_and(|prompt| message.message_id < prompt.message_id)
    }
}

/// One conversation.
///
/// Owns a single slot for the armed field. All transitions happen under the
/// slot's lock, so concurrent events for the same destination are applied
/// one at a time. An event answering a prompt that is no longer armed is
/// stale: button presses carry the prompt's token, and text replies carry a
/// message id lower than the prompt that replaced it (chat message ids
/// increase).
pub struct Session {
    destination: Destination,
    messenger: Arc<dyn Messenger>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(destination: Destination, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            destination,
            messenger,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// A session drawing button tokens from a counter shared with other sessions.
    pub fn with_tokens(
        destination: Destination,
        messenger: Arc<dyn Messenger>,
        tokens: Arc<AtomicU64>,
    ) -> Self {
        let state = SessionState {
            context: ArmContext::sharing(tokens),
            ..SessionState::default()
        };
        Self {
            destination,
            messenger,
            state: Mutex::new(state),
        }
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub async fn is_armed(&self) -> bool {
        self.state.lock().await.armed.is_some()
    }

    /// Arms `field`, replacing (and cancelling) any field armed before.
    pub async fn arm(&self, field: impl Field + 'static) -> PendingField {
        self.arm_boxed(Box::new(field)).await
    }

    pub async fn arm_boxed(&self, field: Box<dyn Field>) -> PendingField {
        let mut state = self.state.lock().await;
        state.closed = false;
        self.arm_locked(&mut state, field).await
    }

    /// Arms `field` unless a router has closed this session, in which case
    /// the field is handed back.
    pub(crate) async fn try_arm(
        &self,
        field: Box<dyn Field>,
    ) -> Result<PendingField, Box<dyn Field>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(field);
        }
        Ok(self.arm_locked(&mut state, field).await)
    }

    /// Marks the session closed if nothing is armed and nobody holds it.
    pub(crate) fn close_if_idle(&self) -> bool {
        match self.state.try_lock() {
            Ok(mut state) if state.armed.is_none() => {
                state.closed = true;
                true
            }
            _ => false,
        }
    }

    async fn arm_locked(&self, state: &mut SessionState, mut field: Box<dyn Field>) -> PendingField {
        let (notify, rx) = oneshot::channel();

        let mut effects = Vec::new();
        if let Some(previous) = state.armed.take() {
            warn!(chat_id = self.destination.chat_id, "Replacing armed prompt");
            effects.push(Effect::ClearKeyboard);
            let _ = previous.notify.send(FieldOutcome::Cancelled);
        }

        effects.extend(field.activate(&mut state.context));
        state.armed = Some(ArmedField { field, notify });
        debug!(chat_id = self.destination.chat_id, "Prompt armed");
        self.apply(state, effects).await;

        PendingField { rx }
    }

    /// Tears down the armed field, if any. Returns whether one was armed.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        let Some(armed) = state.armed.take() else {
            return false;
        };
        debug!(chat_id = self.destination.chat_id, "Prompt cancelled");
        self.apply(&mut state, vec![Effect::ClearKeyboard]).await;
        let _ = armed.notify.send(FieldOutcome::Cancelled);
        true
    }

    /// Feeds one inbound event to the armed field.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let mut state = self.state.lock().await;
        let predates_prompt = state.predates_prompt(&event);
        let SessionState {
            armed, context, ..
        } = &mut *state;

        let transition = match armed.as_mut() {
            Some(_) if predates_prompt => Transition::Stale,
            Some(armed) => armed.field.handle(&event, context),
            None => Transition::Stale,
        };

        match transition {
            Transition::Resolved { value, effects } => {
                let armed = state.armed.take();
                self.apply(&mut state, effects).await;
                debug!(chat_id = self.destination.chat_id, "Prompt resolved");
                if let Some(armed) = armed {
                    let _ = armed.notify.send(FieldOutcome::Resolved(value));
                }
                DispatchOutcome::Resolved
            }
            Transition::Advanced(effects) => {
                self.apply(&mut state, effects).await;
                DispatchOutcome::Advanced
            }
            Transition::Updated(effects) => {
                self.apply(&mut state, effects).await;
                DispatchOutcome::Updated
            }
            Transition::Rejected(effects) => {
                self.apply(&mut state, effects).await;
                DispatchOutcome::Rejected
            }
            Transition::Ignored => DispatchOutcome::Ignored,
            Transition::Stale => {
                debug!(chat_id = self.destination.chat_id, "Stale event dropped");
                if let InboundEvent::ButtonPress(press) = event {
                    let acknowledge = Effect::Acknowledge {
                        callback_id: press.callback_id,
                        text: None,
                    };
                    self.apply(&mut state, vec![acknowledge]).await;
                }
                DispatchOutcome::Stale
            }
        }
    }

    async fn apply(&self, state: &mut SessionState, effects: Vec<Effect>) {
        let destination = self.destination;
        for effect in effects {
            let result = match effect {
                Effect::SendPrompt { text, keyboard } => self
                    .messenger
                    .send_prompt(destination, &text, keyboard.as_ref())
                    .await
                    .map(|handle| {
                        state.last_prompt = Some(handle);
                        state.keyboard_shown = keyboard.is_some();
                    }),
                Effect::SendError { text } => self
                    .messenger
                    .send_error(destination, &text)
                    .await
                    .map(|_| ()),
                Effect::EditKeyboard { keyboard } => match state.last_prompt {
                    Some(handle) => {
                        self.messenger
                            .edit_keyboard(destination, handle, &keyboard)
                            .await
                    }
                    None => Ok(()),
                },
                Effect::ClearKeyboard => match state.last_prompt {
                    Some(handle) if state.keyboard_shown => {
                        state.keyboard_shown = false;
                        self.messenger.clear_keyboard(destination, handle).await
                    }
                    _ => Ok(()),
                },
                Effect::Acknowledge { callback_id, text } => {
                    self.messenger
                        .acknowledge(&callback_id, text.as_deref())
                        .await
                }
            };

            if let Err(e) = result {
                warn!(chat_id = destination.chat_id, error = %e, "Failed to deliver prompt effect");
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Button, InputField};
    use crate::form::{FormElement, FormState};
    use crate::testing::{MockMessenger, Sent};
    use crate::validators_factory::ValidatorsFactory;
    use serde_json::json;

    fn session(messenger: &Arc<MockMessenger>) -> Session {
        Session::new(Destination::new(7), messenger.clone())
    }

    fn age_field() -> InputField {
        InputField::new(ValidatorsFactory::default().integer("numbers only", Some(0), Some(150)))
            .with_greeting("Age?")
    }

    fn pick_field() -> InputField {
        InputField::new(ValidatorsFactory::default().always_error("buttons only"))
            .with_greeting("Pick")
            .with_buttons(vec![vec![
                Button::new("A", json!("a")).with_answer("You chose A"),
                Button::new("B", json!("b")),
            ]])
    }

    #[tokio::test]
    async fn arm_sends_greeting() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let _pending = session.arm(age_field()).await;

        assert!(session.is_armed().await);
        assert_eq!(
            messenger.sent(),
            vec![Sent::Prompt {
                chat_id: 7,
                text: "Age?".into(),
                keyboard: None
            }]
        );
    }

    #[tokio::test]
    async fn rejection_sends_only_the_error() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let _pending = session.arm(age_field()).await;
        messenger.clear();

        let outcome = session.dispatch(InboundEvent::text(1, "200")).await;
        assert_eq!(outcome, DispatchOutcome::Rejected);
        assert_eq!(
            messenger.sent(),
            vec![Sent::Error {
                chat_id: 7,
                text: "numbers only".into()
            }]
        );
        assert!(session.is_armed().await);
    }

    #[tokio::test]
    async fn resolution_notifies_pending_and_empties_slot() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let pending = session.arm(age_field()).await;

        assert_eq!(
            session.dispatch(InboundEvent::text(1, "33")).await,
            DispatchOutcome::Resolved
        );
        assert_eq!(pending.wait().await, FieldOutcome::Resolved(FieldValue::Integer(33)));
        assert!(!session.is_armed().await);
        assert_eq!(
            session.dispatch(InboundEvent::text(2, "34")).await,
            DispatchOutcome::Stale
        );
    }

    #[tokio::test]
    async fn button_press_acknowledges_and_clears_keyboard() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let pending = session.arm(pick_field()).await;
        let handle = messenger.last_prompt_handle().unwrap();
        messenger.clear();

        let outcome = session.dispatch(InboundEvent::press("cb-9", "1:0")).await;
        assert_eq!(outcome, DispatchOutcome::Resolved);
        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Acknowledge {
                    callback_id: "cb-9".into(),
                    text: Some("You chose A".into())
                },
                Sent::ClearKeyboard {
                    chat_id: 7,
                    message_id: handle.message_id
                },
            ]
        );
        assert_eq!(
            pending.wait().await,
            FieldOutcome::Resolved(FieldValue::Choice(json!("a")))
        );
    }

    #[tokio::test]
    async fn stale_press_is_acknowledged_silently() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);

        assert_eq!(
            session.dispatch(InboundEvent::press("old", "99:0")).await,
            DispatchOutcome::Stale
        );
        assert_eq!(
            messenger.sent(),
            vec![Sent::Acknowledge {
                callback_id: "old".into(),
                text: None
            }]
        );
    }

    #[tokio::test]
    async fn arming_again_cancels_previous_prompt() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let first = session.arm(pick_field()).await;
        let second = session.arm(age_field()).await;

        assert_eq!(first.wait().await, FieldOutcome::Cancelled);
        assert!(
            messenger
                .sent()
                .iter()
                .any(|sent| matches!(sent, Sent::ClearKeyboard { .. }))
        );

        // The replaced prompt's buttons no longer resolve anything.
        assert_eq!(
            session.dispatch(InboundEvent::press("cb", "1:0")).await,
            DispatchOutcome::Stale
        );
        session.dispatch(messenger.user_text("20")).await;
        assert_eq!(second.wait().await, FieldOutcome::Resolved(FieldValue::Integer(20)));
    }

    #[tokio::test]
    async fn reply_sent_before_the_next_prompt_is_stale() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let text_field = |greeting: &str| {
            InputField::new(ValidatorsFactory::default().string("text", None, None))
                .with_greeting(greeting)
        };
        let form = FormState::new(
            "address",
            vec![
                FormElement::new("name", text_field("Name?")),
                FormElement::new("city", text_field("City?")),
            ],
        )
        .unwrap();
        let pending = session.arm(form).await;

        // Both typed while "Name?" was the newest prompt.
        let first = messenger.user_text("Ann");
        let second = messenger.user_text("Ann!");
        assert_eq!(session.dispatch(first).await, DispatchOutcome::Advanced);
        assert_eq!(session.dispatch(second).await, DispatchOutcome::Stale);
        assert!(messenger.errors().is_empty());

        assert_eq!(
            session.dispatch(messenger.user_text("Oslo")).await,
            DispatchOutcome::Resolved
        );
        let FieldOutcome::Resolved(value) = pending.wait().await else {
            panic!("cancelled");
        };
        assert_eq!(value.to_json(), json!({"name": "Ann", "city": "Oslo"}));
    }

    #[tokio::test]
    async fn closed_session_refuses_router_arming() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        assert!(session.close_if_idle());

        let refused = session.try_arm(Box::new(age_field())).await;
        assert!(refused.is_err());
        assert!(messenger.sent().is_empty());

        let _pending = session.arm(age_field()).await;
        assert!(session.is_armed().await);
        assert!(!session.close_if_idle());
    }

    #[tokio::test]
    async fn cancel_tears_down_armed_prompt() {
        let messenger = Arc::new(MockMessenger::new());
        let session = session(&messenger);
        let pending = session.arm(age_field()).await;

        assert!(session.cancel().await);
        assert!(!session.cancel().await);
        assert_eq!(pending.wait().await, FieldOutcome::Cancelled);
        assert_eq!(
            session.dispatch(InboundEvent::text(1, "20")).await,
            DispatchOutcome::Stale
        );
    }

    #[tokio::test]
    async fn delivery_failures_do_not_undo_transitions() {
        let messenger = Arc::new(MockMessenger::failing());
        let session = session(&messenger);
        let pending = session.arm(age_field()).await;

        assert_eq!(
            session.dispatch(InboundEvent::text(1, "x")).await,
            DispatchOutcome::Rejected
        );
        assert_eq!(
            session.dispatch(InboundEvent::text(2, "5")).await,
            DispatchOutcome::Resolved
        );
        assert_eq!(pending.wait().await, FieldOutcome::Resolved(FieldValue::Integer(5)));
    }
}
