use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use teloxide::types::{CallbackQuery, Message, MessageEntityKind, UpdateKind};
use tgui_proto::{ButtonPress, Destination, InboundMessage, MessageEntity};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{TelegramError, TelegramResult};
use crate::service::FormBot;

const POLL_TIMEOUT_SECS: u32 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// An update the form bot cares about.
#[derive(Debug)]
enum Incoming {
    Message(Destination, InboundMessage),
    Press(Destination, ButtonPress),
}

/// Convert a Telegram message into the transport-neutral form.
pub fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        message_id: msg.id.0,
        text: msg.text().map(String::from),
        caption: msg.caption().map(String::from),
        entities: msg.entities().map(convert_entities),
        caption_entities: msg.caption_entities().map(convert_entities),
    }
}

fn convert_entities(entities: &[teloxide::types::MessageEntity]) -> Vec<MessageEntity> {
    entities
        .iter()
        .map(|entity| MessageEntity {
            kind: entity_kind(&entity.kind),
            offset: entity.offset,
            length: entity.length,
        })
        .collect()
}

/// Bot API name of an entity kind, e.g. `BotCommand` -> `bot_command`.
fn entity_kind(kind: &MessageEntityKind) -> String {
    let debug = format!("{:?}", kind);
    let name = debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default();

    let mut snake = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            snake.push('_');
        }
        snake.extend(c.to_lowercase());
    }
    snake
}

fn button_press(query: &CallbackQuery) -> Option<(Destination, ButtonPress)> {
    let chat = query.message.as_ref()?.chat();
    let payload = query.data.clone()?;
    Some((
        Destination::new(chat.id.0),
        ButtonPress::new(query.id.to_string(), payload),
    ))
}

impl Incoming {
    fn destination(&self) -> Destination {
        match self {
            Self::Message(destination, _) | Self::Press(destination, _) => *destination,
        }
    }
}

/// Group updates per chat, keeping arrival order within each chat.
fn by_destination(incoming: Vec<Incoming>) -> Vec<(Destination, Vec<Incoming>)> {
    let mut groups: Vec<(Destination, Vec<Incoming>)> = Vec::new();
    for event in incoming {
        let destination = event.destination();
        match groups.iter_mut().find(|(d, _)| *d == destination) {
            Some((_, events)) => events.push(event),
            None => groups.push((destination, vec![event])),
        }
    }
    groups
}

/// Per-chat chains of handler tasks.
///
/// Work pushed for a chat starts only after everything pushed for that chat
/// before it has finished, across polls. Chats never wait on each other.
#[derive(Debug, Default)]
struct ChatLanes {
    tails: HashMap<Destination, JoinHandle<()>>,
}

impl ChatLanes {
    fn push<F>(&mut self, destination: Destination, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.tails.remove(&destination);
        let tail = tokio::spawn(async move {
            if let Some(previous) = previous {
                // A panicked predecessor must not stall the chat.
                if let Err(e) = previous.await {
                    warn!(chat_id = destination.chat_id, error = %e, "Update handler failed");
                }
            }
            work.await;
        });
        self.tails.insert(destination, tail);
    }

    /// Forget chats whose work has drained.
    fn prune(&mut self) {
        self.tails.retain(|_, tail| !tail.is_finished());
    }

    fn len(&self) -> usize {
        self.tails.len()
    }
}

async fn handle(service: &FormBot, destination: Destination, event: Incoming) {
    match event {
        Incoming::Message(_, message) => {
            if let Err(e) = service.handle_message(destination, message).await {
                warn!(chat_id = destination.chat_id, error = %e, "Failed to handle message");
            }
        }
        Incoming::Press(_, press) => {
            let outcome = service.handle_press(destination, press).await;
            debug!(chat_id = destination.chat_id, ?outcome, "Button press handled");
        }
    }
}

/// Long-poll `getUpdates` using the teloxide Bot client.
async fn poll_updates(
    bot: &teloxide::Bot,
    offset: i32,
) -> TelegramResult<(Option<i32>, Vec<Incoming>)> {
    use teloxide::payloads::GetUpdatesSetters;
    use teloxide::requests::Requester;

    let updates = bot
        .get_updates()
        .offset(offset)
        .timeout(POLL_TIMEOUT_SECS)
        .await
        .map_err(|e| TelegramError::Receive(e.to_string()))?;

    let mut next_offset = None;
    let mut incoming = Vec::new();
    for update in updates {
        #[allow(clippy::cast_possible_wrap)]
        let id = update.id.0 as i32;
        next_offset = Some(id + 1);

        match update.kind {
            UpdateKind::Message(ref msg) => {
                incoming.push(Incoming::Message(
                    Destination::new(msg.chat.id.0),
                    inbound_message(msg),
                ));
            }
            UpdateKind::CallbackQuery(ref query) => match button_press(query) {
                Some((destination, press)) => incoming.push(Incoming::Press(destination, press)),
                None => debug!(update_id = id, "Skipping callback query without data"),
            },
            _ => debug!(update_id = id, "Skipping unsupported update"),
        }
    }

    Ok((next_offset, incoming))
}

fn install_shutdown_handlers() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            flag.store(true, Ordering::Relaxed);
        });
    }
    #[cfg(unix)]
    {
        let flag = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    flag.store(true, Ordering::Relaxed);
                }
                Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
            }
        });
    }
    shutdown
}

/// Serve the form bot until `SIGINT`/`SIGTERM`.
///
/// Updates are handled in arrival order per chat, including across polls,
/// while a slow chat never holds up the others.
pub async fn run_polling(service: Arc<FormBot>, bot: teloxide::Bot) -> TelegramResult<()> {
    use teloxide::requests::Requester;

    let me = bot
        .get_me()
        .await
        .map_err(|e| TelegramError::Startup(e.to_string()))?;
    info!(username = %me.username(), "Telegram bot online");

    let shutdown = install_shutdown_handlers();
    let mut offset: i32 = 0;
    let mut lanes = ChatLanes::default();

    while !shutdown.load(Ordering::Relaxed) {
        let (next_offset, incoming) = match poll_updates(&bot, offset).await {
            Ok(polled) => polled,
            Err(e) => {
                warn!(error = %e, "Telegram poll failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        if let Some(next) = next_offset {
            offset = next;
        }

        lanes.prune();
        for (destination, events) in by_destination(incoming) {
            let service = Arc::clone(&service);
            lanes.push(destination, async move {
                for event in events {
                    handle(&service, destination, event).await;
                }
            });
        }
        debug!(chats = lanes.len(), "Chats with pending updates");
    }

    info!("Shutting down");
    Ok(())
}
