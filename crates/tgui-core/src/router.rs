use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, PoisonError};

use tgui_proto::{Destination, InboundEvent, Messenger};
use tracing::{debug, warn};

use crate::field::Field;
use crate::session::{DispatchOutcome, PendingField, Session};

/// Delivers inbound events to the session of their destination.
///
/// Sessions are opened when a field is armed and dropped once their slot is
/// empty again, so chats without a running prompt hold no state. Events for
/// a chat without a session are stale.
pub struct Router {
    messenger: Arc<dyn Messenger>,
    sessions: Mutex<HashMap<Destination, Arc<Session>>>,
    tokens: Arc<AtomicU64>,
}

impl Router {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            sessions: Mutex::new(HashMap::new()),
            tokens: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Returns the session for `destination`, opening it if needed.
    ///
    /// Arm through [`Router::arm`]: a session handed out here may be dropped
    /// by the router once idle.
    pub fn session(&self, destination: Destination) -> Arc<Session> {
        self.lock()
            .entry(destination)
            .or_insert_with(|| {
                debug!(chat_id = destination.chat_id, "Opening session");
                Arc::new(Session::with_tokens(
                    destination,
                    self.messenger.clone(),
                    self.tokens.clone(),
                ))
            })
            .clone()
    }

    /// Arms `field` for `destination`, replacing any field armed there.
    pub async fn arm(&self, destination: Destination, field: impl Field + 'static) -> PendingField {
        let mut field: Box<dyn Field> = Box::new(field);
        loop {
            match self.session(destination).try_arm(field).await {
                Ok(pending) => return pending,
                // Closed between lookup and arming; the next lookup opens a new session.
                Err(returned) => field = returned,
            }
        }
    }

    pub async fn is_armed(&self, destination: Destination) -> bool {
        match self.existing(destination) {
            Some(session) => session.is_armed().await,
            None => false,
        }
    }

    pub async fn dispatch(&self, destination: Destination, event: InboundEvent) -> DispatchOutcome {
        let Some(session) = self.existing(destination) else {
            debug!(chat_id = destination.chat_id, "No session, event is stale");
            if let InboundEvent::ButtonPress(press) = event
                && let Err(e) = self.messenger.acknowledge(&press.callback_id, None).await
            {
                warn!(chat_id = destination.chat_id, error = %e, "Failed to acknowledge stale press");
            }
            return DispatchOutcome::Stale;
        };

        let outcome = session.dispatch(event).await;
        debug!(chat_id = destination.chat_id, ?outcome, "Event dispatched");
        self.close_if_idle(destination, &session);
        outcome
    }

    /// Aborts the flow running in `destination`. Returns whether one was armed.
    pub async fn cancel(&self, destination: Destination) -> bool {
        let Some(session) = self.existing(destination) else {
            return false;
        };
        let cancelled = session.cancel().await;
        self.close_if_idle(destination, &session);
        cancelled
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn existing(&self, destination: Destination) -> Option<Arc<Session>> {
        self.lock().get(&destination).cloned()
    }

    /// Drops `session` from the map if it is still the destination's session
    /// and nothing is armed in it.
    fn close_if_idle(&self, destination: Destination, session: &Arc<Session>) {
        let mut sessions = self.lock();
        let current = sessions
            .get(&destination)
            .is_some_and(|open| Arc::ptr_eq(open, session));
        if current && session.close_if_idle() {
            sessions.remove(&destination);
            debug!(chat_id = destination.chat_id, "Closing idle session");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Destination, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
