use async_trait::async_trait;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use tgui_core::validator::FAULT_PREFIX;
use tgui_proto::{Destination, Keyboard, MessageHandle, Messenger, ProtoError, ProtoResult};

/// Wraps a `teloxide::Bot` as the messaging capability.
///
/// All text is HTML-escaped before sending; prompts and errors are plain
/// text from the bot's point of view.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: teloxide::Bot,
}

impl TelegramMessenger {
    /// Create a new messenger from a bot token.
    pub fn new(token: &str) -> Self {
        Self::from_bot(teloxide::Bot::new(token))
    }

    pub fn from_bot(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &teloxide::Bot {
        &self.bot
    }
}

/// Escape special HTML characters for Telegram's HTML parse mode.
///
/// Telegram requires `<`, `>`, and `&` to be escaped in HTML-formatted messages.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Format a validation error as Telegram HTML.
///
/// The fault text of an internal validator failure is rendered as code.
pub fn format_error(text: &str) -> String {
    match text.split_once(FAULT_PREFIX) {
        Some((marker, fault)) => format!(
            "{}{}<code>{}</code>",
            escape_html(marker),
            escape_html(FAULT_PREFIX),
            escape_html(fault)
        ),
        None => escape_html(text),
    }
}

fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(&button.title, &button.payload))
            .collect::<Vec<_>>()
    }))
}

fn delivery(destination: Destination, err: &teloxide::RequestError) -> ProtoError {
    ProtoError::Delivery {
        chat_id: destination.chat_id,
        reason: err.to_string(),
    }
}

impl TelegramMessenger {
    async fn send_html(
        &self,
        destination: Destination,
        html: String,
        keyboard: Option<&Keyboard>,
    ) -> ProtoResult<MessageHandle> {
        use teloxide::payloads::SendMessageSetters;
        use teloxide::prelude::*;
        use teloxide::types::ParseMode;

        let mut request = self
            .bot
            .send_message(ChatId(destination.chat_id), html)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(inline_keyboard(keyboard));
        }

        let sent = request.await.map_err(|e| delivery(destination, &e))?;
        Ok(MessageHandle {
            message_id: sent.id.0,
        })
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_prompt(
        &self,
        destination: Destination,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> ProtoResult<MessageHandle> {
        self.send_html(destination, escape_html(text), keyboard).await
    }

    async fn send_error(&self, destination: Destination, text: &str) -> ProtoResult<MessageHandle> {
        self.send_html(destination, format_error(text), None).await
    }

    async fn edit_keyboard(
        &self,
        destination: Destination,
        handle: MessageHandle,
        keyboard: &Keyboard,
    ) -> ProtoResult<()> {
        use teloxide::payloads::EditMessageReplyMarkupSetters;
        use teloxide::prelude::*;

        self.bot
            .edit_message_reply_markup(ChatId(destination.chat_id), MessageId(handle.message_id))
            .reply_markup(inline_keyboard(keyboard))
            .await
            .map_err(|e| delivery(destination, &e))?;
        Ok(())
    }

    async fn clear_keyboard(
        &self,
        destination: Destination,
        handle: MessageHandle,
    ) -> ProtoResult<()> {
        use teloxide::prelude::*;

        // Without a reply_markup the keyboard is removed.
        self.bot
            .edit_message_reply_markup(ChatId(destination.chat_id), MessageId(handle.message_id))
            .await
            .map_err(|e| delivery(destination, &e))?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str, text: Option<&str>) -> ProtoResult<()> {
        use teloxide::payloads::AnswerCallbackQuerySetters;
        use teloxide::prelude::*;

        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            request = request.text(text);
        }

        request.await.map_err(|e| ProtoError::Acknowledge {
            callback_id: callback_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
