use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, Member},
    ports::{AuditSink, MessagingPort},
    Result,
};

/// Audit sink used when no destination is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAudit;

#[async_trait]
impl AuditSink for NoopAudit {
    async fn record_ban(&self, _member: &Member) -> Result<()> {
        Ok(())
    }
}

/// Posts one line per ban into an audit chat.
pub struct ChatAudit {
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
}

impl ChatAudit {
    pub fn new(messenger: Arc<dyn MessagingPort>, chat_id: ChatId) -> Self {
        Self { messenger, chat_id }
    }
}

#[async_trait]
impl AuditSink for ChatAudit {
    async fn record_ban(&self, member: &Member) -> Result<()> {
        self.messenger
            .send_text(self.chat_id, &format_ban_record(member))
            .await
    }
}

/// Pick the sink for an optional destination.
pub fn sink_for(messenger: Arc<dyn MessagingPort>, chat_id: Option<ChatId>) -> Arc<dyn AuditSink> {
    match chat_id {
        Some(chat_id) => {
            tracing::debug!(journal_group = chat_id.0, "enabling ban journal");
            Arc::new(ChatAudit::new(messenger, chat_id))
        }
        None => Arc::new(NoopAudit),
    }
}

pub fn format_ban_record(member: &Member) -> String {
    format!(
        "User {} {:?} {:?} is_premium={} has no username and was banned",
        member.id.0,
        member.first_name,
        member.last_name_or_empty(),
        member.is_premium
    )
}
