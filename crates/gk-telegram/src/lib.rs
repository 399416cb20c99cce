//! Telegram adapter (teloxide).
//!
//! This crate implements the `gk-core` ports over the Telegram Bot API:
//! `getUpdates` long polling, `banChatMember` and `sendMessage`.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{prelude::*, types::AllowedUpdate, RequestError};

pub mod convert;
pub mod polling;

use gk_core::{
    config::PollConfig,
    domain::{ChatId, UserId},
    errors::Error,
    ports::{EventSource, MessagingPort, ModerationPort, PollOutcome, PollRequest},
    Result,
};

/// Slack between the poll loop's request deadline and the HTTP client timeout.
///
/// The poll loop owns the deadline; the client timeout only has to stay out of
/// its way so that a client-side timeout is always a real failure.
pub const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(30);

/// Build a bot whose HTTP client outlives the long-poll window.
pub fn build_bot(token: &str, poll: &PollConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(poll.request_timeout + CLIENT_TIMEOUT_GRACE)
        .build()
        .map_err(|e| Error::External(format!("building http client: {e}")))?;
    Ok(Bot::with_client(token, client))
}

#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_user(user_id: UserId) -> Result<teloxide::types::UserId> {
        u64::try_from(user_id.0)
            .map(teloxide::types::UserId)
            .map_err(|_| Error::External(format!("invalid telegram user id: {}", user_id.0)))
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

fn allowed_update(name: &str) -> Option<AllowedUpdate> {
    match name {
        "chat_member" => Some(AllowedUpdate::ChatMember),
        _ => None,
    }
}

#[async_trait]
impl EventSource for TelegramClient {
    /// Every transport failure, timeouts included, is an error here. Only the
    /// poll loop's own request deadline counts as an empty poll.
    async fn fetch(&self, req: PollRequest) -> Result<PollOutcome> {
        let Ok(offset) = i32::try_from(req.offset) else {
            tracing::error!(
                offset = req.offset,
                "update offset exceeds the Bot API range, cannot poll further"
            );
            return Err(Error::External(format!(
                "update offset out of range: {}",
                req.offset
            )));
        };
        let timeout = u32::try_from(req.timeout.as_secs()).unwrap_or(u32::MAX);
        let allowed: Vec<AllowedUpdate> = req
            .allowed
            .iter()
            .filter_map(|name| {
                let kind = allowed_update(name);
                if kind.is_none() {
                    tracing::warn!(update_type = name, "unsupported update type, not requested");
                }
                kind
            })
            .collect();

        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout)
            .allowed_updates(allowed)
            .await
            .map_err(Self::map_err)?;

        Ok(PollOutcome::Batch(
            updates.into_iter().map(convert::to_event).collect(),
        ))
    }
}

#[async_trait]
impl ModerationPort for TelegramClient {
    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.bot
            .ban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id)?)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
