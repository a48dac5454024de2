//! # tgui
//!
//! Runs a Telegram bot that walks each chat through the form described in
//! a YAML config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tgui_core::BotConfig;
use tgui_telegram::{FormBot, TelegramMessenger, mask_token, resolve_bot_token, run_polling};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tgui", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, default_value = "tgui.yml", global = true)]
    config: PathBuf,

    /// Bot token (overrides config and TGUI_TELEGRAM_BOT_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Serve the form bot (default if no subcommand given)
    Run,

    /// Validate the configuration without connecting to Telegram
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config, cli.token).await,
        Commands::Check => {
            let summary = check(&cli.config)?;
            println!("{summary}");
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<BotConfig> {
    let config = BotConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid form in {}", path.display()))?;
    Ok(config)
}

/// Validate the config and describe what would run.
fn check(path: &Path) -> Result<String> {
    let config = load(path)?;
    Ok(format!(
        "{}: form '{}' with {} element(s) is valid",
        path.display(),
        config.form.key,
        config.form.elements.len()
    ))
}

async fn run(path: &Path, token: Option<String>) -> Result<()> {
    let config = load(path)?;
    let token = resolve_bot_token(token, config.bot_token.clone())?;
    info!(token = %mask_token(&token), form = %config.form.key, "Starting form bot");

    let bot = teloxide::Bot::new(token);
    let messenger = Arc::new(TelegramMessenger::from_bot(bot.clone()));
    let service = Arc::new(FormBot::new(messenger, &config)?);

    run_polling(service, bot).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_to_run_with_tgui_yml() {
        let cli = Cli::try_parse_from(["tgui"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, PathBuf::from("tgui.yml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tgui", "check", "-c", "bot.yml", "--token", "t", "-v"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.config, PathBuf::from("bot.yml"));
        assert_eq!(cli.token.as_deref(), Some("t"));
        assert!(cli.verbose);
    }

    #[test]
    fn check_accepts_example_config() {
        let file = config_file(include_str!("../../../tgui.example.yml"));
        let summary = check(file.path()).unwrap();
        assert!(summary.contains("form 'order' with 5 element(s) is valid"));
    }

    #[test]
    fn check_reports_duplicate_keys() {
        let file = config_file(
            r#"
form:
  key: twice
  elements:
    - { type: field, key: a, greeting: A?, error_message: no, validator: { type: STRING } }
    - { type: field, key: a, greeting: A?, error_message: no, validator: { type: STRING } }
"#,
        );
        let err = check(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid form"));
    }

    #[test]
    fn check_reports_missing_file() {
        let err = check(Path::new("/nonexistent/tgui.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
