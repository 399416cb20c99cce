use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, Event, Member, UserId},
    Result,
};

/// Update kinds requested from the platform.
pub const ALLOWED_UPDATES: &[&str] = &["chat_member"];

/// Parameters of a single long-poll fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollRequest {
    /// Next unconsumed event id.
    pub offset: i64,
    /// Server-side long-poll window.
    pub timeout: Duration,
    pub allowed: &'static [&'static str],
}

/// Result of a fetch that did not fail.
#[derive(Clone, Debug)]
pub enum PollOutcome {
    /// Zero or more events in ascending id order.
    Batch(Vec<Event>),
    /// Nothing arrived within the window. Not an error.
    TimedOut,
}

/// Hexagonal port for pulling events from the platform.
///
/// Implementations must not classify errors as fatal; escalation is the
/// caller's business.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self, req: PollRequest) -> Result<PollOutcome>;
}

/// Hexagonal port for chat administration.
#[async_trait]
pub trait ModerationPort: Send + Sync {
    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;
}

/// Hexagonal port for plain outbound messages.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Receives every fresh event the poll loop consumes, in order.
///
/// Handlers swallow their own failures: nothing a single event does may stop
/// the loop.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Side channel recording enforcement actions for human review.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_ban(&self, member: &Member) -> Result<()>;
}
