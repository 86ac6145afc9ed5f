//! Bot initialization and the command enum
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::admin::AdminCommandKind;
use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    /// Deep-link payloads are accepted and ignored
    #[command(description = "register and show the welcome message")]
    Start(String),
    #[command(description = "make a user admin: @user level")]
    MakeAdmin(String),
    #[command(description = "remove admin rights: @user")]
    UnmakeAdmin(String),
    #[command(description = "warn a user: @user [reason]")]
    Warn(String),
    #[command(description = "clear warnings: @user")]
    Unwarn(String),
    #[command(description = "list warnings: @user")]
    Warns(String),
    #[command(description = "ban a user: @user 1d|5h|permanent [reason]")]
    Ban(String),
    #[command(description = "lift a ban: @user [reason]")]
    Unban(String),
    /// Trailing words are ignored
    #[command(description = "show usage statistics")]
    Stats(String),
    #[command(description = "show a user's audit history: @user")]
    History(String),
    #[command(description = "broadcast a message to every user")]
    SendAll(String),
}

impl Command {
    /// Admin command kind and raw arguments; `None` for user commands
    pub fn as_admin(&self) -> Option<(AdminCommandKind, &str)> {
        let pair = match self {
            Command::Start(_) => return None,
            Command::MakeAdmin(args) => (AdminCommandKind::MakeAdmin, args.as_str()),
            Command::UnmakeAdmin(args) => (AdminCommandKind::UnmakeAdmin, args.as_str()),
            Command::Warn(args) => (AdminCommandKind::Warn, args.as_str()),
            Command::Unwarn(args) => (AdminCommandKind::Unwarn, args.as_str()),
            Command::Warns(args) => (AdminCommandKind::Warns, args.as_str()),
            Command::Ban(args) => (AdminCommandKind::Ban, args.as_str()),
            Command::Unban(args) => (AdminCommandKind::Unban, args.as_str()),
            Command::Stats(_) => (AdminCommandKind::Stats, ""),
            Command::History(args) => (AdminCommandKind::History, args.as_str()),
            Command::SendAll(args) => (AdminCommandKind::SendAll, args.as_str()),
        };
        Some(pair)
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid `BOT_API_URL`
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    let bot = match std::env::var("BOT_API_URL") {
        Ok(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        Err(_) => bot,
    };
    Ok(bot)
}

/// Publishes the command list shown in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
