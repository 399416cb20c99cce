use std::sync::Arc;

use anyhow::Context;
use teloxide::prelude::*;

use gk_core::{audit, config::Config, enforcer::Enforcer, poller::PollController};

use crate::{build_bot, TelegramClient};

/// Connect to Telegram and moderate until the poll loop gives up.
///
/// Fails fast if the token is rejected; after that the only way out is
/// exhausting the retry budget (or the process being killed).
pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = build_bot(&cfg.telegram_bot_token, &cfg.poll)?;

    let me = bot.get_me().await.context("starting telegram bot")?;
    tracing::info!(username = %me.username(), "gatekeeper started");

    // getUpdates is refused while a webhook is set.
    bot.delete_webhook().await.context("clearing webhook")?;

    let telegram = TelegramClient::new(bot);
    let shared = Arc::new(telegram.clone());
    let journal = audit::sink_for(shared.clone(), cfg.log_group_id);
    let enforcer = Enforcer::new(shared, journal);

    let mut controller = PollController::new(telegram, cfg.poll);
    controller.run(&enforcer).await?;

    Ok(())
}
