use std::fmt;
use std::sync::Arc;

use tgui_core::{BotConfig, DispatchOutcome, FieldOutcome, FieldsFactory, FormItem, Router};
use tgui_proto::{ButtonPress, Destination, FieldValue, InboundEvent, InboundMessage, Messenger};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::{BotCommand, help_text, parse_command};
use crate::error::{TelegramError, TelegramResult};

/// Environment variable consulted when no token is passed or configured.
pub const TOKEN_ENV_VAR: &str = "TGUI_TELEGRAM_BOT_TOKEN";

const START_HINT: &str = "Send /start to fill in the form.";
const CANCELLED: &str = "Form cancelled. Send /start to begin again.";
const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";

/// Resolve the bot token: explicit flag, then config, then environment.
///
/// Blank values are skipped.
pub fn resolve_bot_token(
    flag: Option<String>,
    configured: Option<String>,
) -> TelegramResult<String> {
    [flag, configured, std::env::var(TOKEN_ENV_VAR).ok()]
        .into_iter()
        .flatten()
        .find(|token| !token.trim().is_empty())
        .ok_or(TelegramError::MissingBotToken)
}

/// Mask a bot token for logging.
pub fn mask_token(token: &str) -> String {
    match (token.get(..4), token.get(token.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if token.len() > 8 => format!("{}...{}", head, tail),
        _ => "****".to_string(),
    }
}

/// Runs the configured form for every chat that sends `/start`.
///
/// Each chat gets its own session in the router; resolved answers are sent
/// back as pretty-printed JSON followed by the completion message.
pub struct FormBot {
    router: Router,
    factory: FieldsFactory,
    form: FormItem,
    completion_message: Option<String>,
}

impl FormBot {
    /// Create a bot for `config`, failing early on a form that cannot be built.
    pub fn new(messenger: Arc<dyn Messenger>, config: &BotConfig) -> TelegramResult<Self> {
        config.validate()?;
        Ok(Self {
            router: Router::new(messenger),
            factory: FieldsFactory::default(),
            form: config.form.clone(),
            completion_message: config.completion_message.clone(),
        })
    }

    /// Replace the field factory (e.g. to route validator faults elsewhere).
    #[must_use]
    pub fn with_factory(mut self, factory: FieldsFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Arm a fresh copy of the form for `destination`.
    ///
    /// The returned task finishes once the form resolves (after reporting the
    /// answers) or is cancelled.
    pub async fn start(&self, destination: Destination) -> TelegramResult<JoinHandle<()>> {
        let form = self.factory.form(&self.form)?;
        let pending = self.router.arm(destination, form).await;
        info!(chat_id = destination.chat_id, form = %self.form.key, "Form started");

        let messenger = Arc::clone(self.router.messenger());
        let completion = self.completion_message.clone();
        Ok(tokio::spawn(async move {
            match pending.wait().await {
                FieldOutcome::Resolved(value) => {
                    report(messenger.as_ref(), destination, &value, completion.as_deref()).await;
                }
                FieldOutcome::Cancelled => {
                    debug!(chat_id = destination.chat_id, "Form ended without answers");
                }
            }
        }))
    }

    /// Cancel the running form and tell the user.
    pub async fn cancel(&self, destination: Destination) -> bool {
        let cancelled = self.router.cancel(destination).await;
        let reply = if cancelled { CANCELLED } else { NOTHING_TO_CANCEL };
        self.reply(destination, reply).await;
        cancelled
    }

    /// Handle an incoming message: commands first, then answers.
    pub async fn handle_message(
        &self,
        destination: Destination,
        message: InboundMessage,
    ) -> TelegramResult<DispatchOutcome> {
        match message.text.as_deref().and_then(parse_command) {
            Some(BotCommand::Start) => {
                self.start(destination).await?;
                Ok(DispatchOutcome::Advanced)
            }
            Some(BotCommand::Cancel) => {
                self.cancel(destination).await;
                Ok(DispatchOutcome::Resolved)
            }
            Some(BotCommand::Help) => {
                self.reply(destination, &help_text()).await;
                Ok(DispatchOutcome::Ignored)
            }
            None => {
                let outcome = self
                    .router
                    .dispatch(destination, InboundEvent::Message(message))
                    .await;
                if outcome == DispatchOutcome::Stale && !self.router.is_armed(destination).await {
                    self.reply(destination, START_HINT).await;
                }
                Ok(outcome)
            }
        }
    }

    /// Handle an inline keyboard press.
    pub async fn handle_press(&self, destination: Destination, press: ButtonPress) -> DispatchOutcome {
        self.router
            .dispatch(destination, InboundEvent::ButtonPress(press))
            .await
    }

    async fn reply(&self, destination: Destination, text: &str) {
        if let Err(e) = self.router.messenger().send_prompt(destination, text, None).await {
            warn!(chat_id = destination.chat_id, error = %e, "Failed to send reply");
        }
    }
}

impl fmt::Debug for FormBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBot")
            .field("form", &self.form.key)
            .field("sessions", &self.router.session_count())
            .finish_non_exhaustive()
    }
}

/// Send the collected answers followed by the optional completion message.
async fn report(
    messenger: &dyn Messenger,
    destination: Destination,
    value: &FieldValue,
    completion: Option<&str>,
) {
    let json = value.to_json();
    let answers = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
    info!(chat_id = destination.chat_id, "Form resolved");

    for text in std::iter::once(answers.as_str()).chain(completion) {
        if let Err(e) = messenger.send_prompt(destination, text, None).await {
            warn!(chat_id = destination.chat_id, error = %e, "Failed to send form report");
            return;
        }
    }
}
