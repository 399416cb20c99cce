use chrono::{DateTime, Utc};

/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Platform chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// One update pulled from the platform's event stream.
///
/// `id` is unique and increasing; only membership changes carry a payload,
/// everything else arrives with `membership: None` and only moves the cursor.
#[derive(Clone, Debug)]
pub struct Event {
    pub id: i64,
    pub membership: Option<MembershipChange>,
}

impl Event {
    pub fn other(id: i64) -> Self {
        Self {
            id,
            membership: None,
        }
    }
}

/// A chat member's status transition.
#[derive(Clone, Debug)]
pub struct MembershipChange {
    pub chat_id: ChatId,
    pub old: Option<MemberState>,
    pub new: Option<MemberState>,
    pub date: Option<DateTime<Utc>>,
}

/// A member together with its status on one side of a transition.
#[derive(Clone, Debug)]
pub struct MemberState {
    pub status: MemberStatus,
    pub member: Member,
}

/// Closed set of member statuses.
///
/// Anything the platform adds later maps to `Unknown` and is never actionable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Left,
    Kicked,
    Restricted,
    Member,
    Administrator,
    Creator,
    Unknown,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Left => "left",
            MemberStatus::Kicked => "kicked",
            MemberStatus::Restricted => "restricted",
            MemberStatus::Member => "member",
            MemberStatus::Administrator => "administrator",
            MemberStatus::Creator => "creator",
            MemberStatus::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_premium: bool,
}

impl Member {
    /// A public handle is the only signal we use: absent or empty means anonymous.
    pub fn has_handle(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn last_name_or_empty(&self) -> &str {
        self.last_name.as_deref().unwrap_or("")
    }
}
