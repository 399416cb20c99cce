use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::Instrument;

use crate::{
    domain::{ChatId, Event, Member, MemberStatus},
    ports::{AuditSink, EventHandler, ModerationPort},
};

/// What the enforcer decided for one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No membership payload, or no new status.
    NotActionable,
    /// The new status is not a plain join.
    Skipped(MemberStatus),
    /// Joined with a public handle.
    HasHandle,
    Banned,
    BanFailed,
}

/// Bans members who join without a public handle.
pub struct Enforcer {
    moderator: Arc<dyn ModerationPort>,
    audit: Arc<dyn AuditSink>,
}

impl Enforcer {
    pub fn new(moderator: Arc<dyn ModerationPort>, audit: Arc<dyn AuditSink>) -> Self {
        Self { moderator, audit }
    }

    pub async fn enforce(&self, event: &Event) -> Verdict {
        let Some(change) = &event.membership else {
            return Verdict::NotActionable;
        };
        let Some(new) = &change.new else {
            return Verdict::NotActionable;
        };

        if new.status != MemberStatus::Member {
            tracing::info!(
                update_id = event.id,
                event_type = new.status.as_str(),
                "skipping event"
            );
            return Verdict::Skipped(new.status);
        }

        let user = &new.member;
        if user.has_handle() {
            return Verdict::HasHandle;
        }

        let span = tracing::info_span!(
            "anon_member",
            user.id = user.id.0,
            user.first_name = %user.first_name,
            user.last_name = %user.last_name_or_empty(),
            user.is_premium = user.is_premium,
        );
        self.ban(change.chat_id, change.date, user)
            .instrument(span)
            .await
    }

    async fn ban(
        &self,
        chat_id: ChatId,
        joined_at: Option<DateTime<Utc>>,
        user: &Member,
    ) -> Verdict {
        tracing::info!(chat_id = chat_id.0, joined_at = ?joined_at, "got an anon user!");

        if let Err(e) = self.moderator.ban_member(chat_id, user.id).await {
            tracing::error!(error = %e, user.id = user.id.0, "unable to ban user");
            return Verdict::BanFailed;
        }
        tracing::info!("successfully banned a user");

        if let Err(e) = self.audit.record_ban(user).await {
            tracing::error!(error = %e, "unable to send log for banned user");
        }
        Verdict::Banned
    }
}

#[async_trait]
impl EventHandler for Enforcer {
    async fn handle(&self, event: &Event) {
        let _ = self.enforce(event).await;
    }
}
