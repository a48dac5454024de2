/// Commands the form bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Arm the configured form, replacing a running one.
    Start,
    /// Tear down the running form.
    Cancel,
    Help,
}

/// Check if a message is a bot command (starts with `/`).
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Recognize a bot command.
///
/// Returns `None` for text that is not one of our commands, so the caller
/// can treat it as a regular answer.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    if !is_command(text) {
        return None;
    }
    match command_name(text) {
        "/start" => Some(BotCommand::Start),
        "/cancel" => Some(BotCommand::Cancel),
        "/help" => Some(BotCommand::Help),
        _ => None,
    }
}

/// Strip arguments and the `@bot` suffix: `/start@form_bot now` -> `/start`.
fn command_name(text: &str) -> &str {
    let first = text.split(char::is_whitespace).next().unwrap_or(text);
    first.split('@').next().unwrap_or(first)
}

/// Reply to `/help`.
pub fn help_text() -> String {
    [
        "Form Bot Commands",
        "",
        "/start — Fill in the form (restarts a running one)",
        "/cancel — Stop the current form",
        "/help — This message",
    ]
    .join("\n")
}
