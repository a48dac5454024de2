use thiserror::Error;

/// Result type alias for telegram operations.
pub type TelegramResult<T> = std::result::Result<T, TelegramError>;

/// Errors that can occur while running the form bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token is missing from flags, config and environment.
    #[error("telegram bot token not found: pass --token, set bot_token in the config, or set TGUI_TELEGRAM_BOT_TOKEN")]
    MissingBotToken,

    /// Failed to start the Telegram bot (network, auth, etc.).
    #[error("failed to start telegram bot: {0}")]
    Startup(String),

    /// Failed to receive updates.
    #[error("failed to receive telegram updates: {0}")]
    Receive(String),

    /// The form configuration could not be turned into prompts.
    #[error(transparent)]
    Config(#[from] tgui_core::TguiError),
}
