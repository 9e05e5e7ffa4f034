//! Message handlers
//!
//! Routes `/start`, `/help`, `/stats` and free text. Only allow-listed users
//! reach the translation service or the statistics reporter.

use crate::{
    auth::AccessControl,
    completion::language_name,
    logging::preview,
    models::telegram::{Update, User},
    service::TranslationService,
    stats::StatsReporter,
    telegram::TelegramClient,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Text to send back and whether to render it as Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub rich_text: bool,
}

impl BotReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rich_text: false,
        }
    }

    pub fn rich(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rich_text: true,
        }
    }

    /// Apology carrying the failure detail
    pub fn apology(detail: impl std::fmt::Display) -> Self {
        Self::plain(format!("Sorry, something went wrong: {}", detail))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Help,
    Stats,
    Text(&'a str),
}

/// Recognizes `/cmd`, `/cmd@botname` and `/cmd args`
///
/// Anything else, including an unrecognized `/word`, is text to translate.
fn parse_command(text: &str) -> Command<'_> {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Text(text);
    };

    let word = rest.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default();

    match name {
        "start" => Command::Start,
        "help" => Command::Help,
        "stats" => Command::Stats,
        _ => Command::Text(text),
    }
}

const HELP_TEXT: &str = "Available commands:\n\n\
/start - greeting\n\
/help - this list\n\
/stats - translation statistics\n\n\
Send any word or phrase to get its translation.";

pub struct Bot {
    service: Arc<TranslationService>,
    stats: Arc<StatsReporter>,
    access: AccessControl,
    telegram: TelegramClient,
}

impl Bot {
    pub fn new(
        service: Arc<TranslationService>,
        stats: Arc<StatsReporter>,
        access: AccessControl,
        telegram: TelegramClient,
    ) -> Self {
        Self {
            service,
            stats,
            access,
            telegram,
        }
    }

    /// Produce the reply for `text` sent by `user`
    pub async fn handle_message(&self, user: &User, text: &str) -> BotReply {
        match parse_command(text) {
            Command::Start => {
                debug!(user_id = user.id, "Received /start");
                BotReply::plain(format!(
                    "👋 Hi, {}!\n\n\
                     This bot translates words and phrases into {}.\n\
                     Use /help to see all commands.",
                    user.display_name(),
                    language_name(self.service.target_language())
                ))
            }
            Command::Help => {
                debug!(user_id = user.id, "Received /help");
                BotReply::plain(HELP_TEXT)
            }
            Command::Stats => {
                if !self.access.is_allowed(user.id) {
                    return self.deny(user);
                }
                match self.stats.get_stats_text().await {
                    Ok(report) => BotReply::plain(report),
                    Err(e) => {
                        error!(user_id = user.id, error = %e, "Failed to build statistics");
                        BotReply::apology(e)
                    }
                }
            }
            Command::Text(text) => {
                if !self.access.is_allowed(user.id) {
                    return self.deny(user);
                }
                self.translate(user, text).await
            }
        }
    }

    async fn translate(&self, user: &User, text: &str) -> BotReply {
        match self.service.get_translation(text).await {
            Ok(Some(record)) => {
                info!(
                    user_id = user.id,
                    source = %preview(&record.source, 50),
                    view_count = record.view_count,
                    "Translation served"
                );
                BotReply::rich(record.translation)
            }
            Ok(None) => BotReply::plain("Nothing to translate. Send me a word or a phrase."),
            Err(e) => {
                error!(user_id = user.id, error = %e, "Translation failed");
                BotReply::apology(e)
            }
        }
    }

    fn deny(&self, user: &User) -> BotReply {
        warn!(user_id = user.id, username = ?user.username, "Access denied");
        BotReply::plain("Sorry, you are not allowed to use this bot.")
    }

    /// Handle one update and deliver the reply
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Ignoring update without message");
            return;
        };

        let Some(user) = message.from.as_ref() else {
            error!(update_id = update.update_id, "Received message without user data");
            return;
        };

        let Some(text) = message.text.as_deref() else {
            debug!(update_id = update.update_id, user_id = user.id, "Ignoring message without text");
            return;
        };

        let reply = self.handle_message(user, text).await;

        if let Err(e) = self
            .telegram
            .send_reply(message.chat.id, &reply.text, reply.rich_text)
            .await
        {
            error!(
                update_id = update.update_id,
                chat_id = message.chat.id,
                error = %e,
                "Failed to send reply"
            );
        }
    }
}
