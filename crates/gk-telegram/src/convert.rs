//! Telegram update -> core event conversion.

use teloxide::types::{ChatMember, ChatMemberKind, ChatMemberUpdated, Update, UpdateKind, User};

use gk_core::domain::{ChatId, Event, Member, MemberState, MemberStatus, MembershipChange, UserId};

pub fn to_event(update: Update) -> Event {
    let id = i64::from(update.id);
    match update.kind {
        UpdateKind::ChatMember(change) => Event {
            id,
            membership: Some(to_membership(&change)),
        },
        _ => Event::other(id),
    }
}

pub fn to_membership(change: &ChatMemberUpdated) -> MembershipChange {
    MembershipChange {
        chat_id: ChatId(change.chat.id.0),
        old: to_state(&change.old_chat_member),
        new: to_state(&change.new_chat_member),
        date: Some(change.date),
    }
}

/// `None` when the member cannot be represented; the transition is then not actionable.
fn to_state(member: &ChatMember) -> Option<MemberState> {
    Some(MemberState {
        status: to_status(&member.kind),
        member: to_member(&member.user)?,
    })
}

#[allow(unreachable_patterns)]
pub fn to_status(kind: &ChatMemberKind) -> MemberStatus {
    match kind {
        ChatMemberKind::Owner(_) => MemberStatus::Creator,
        ChatMemberKind::Administrator(_) => MemberStatus::Administrator,
        ChatMemberKind::Member => MemberStatus::Member,
        ChatMemberKind::Restricted(_) => MemberStatus::Restricted,
        ChatMemberKind::Left => MemberStatus::Left,
        ChatMemberKind::Banned(_) => MemberStatus::Kicked,
        _ => MemberStatus::Unknown,
    }
}

pub fn to_member(user: &User) -> Option<Member> {
    let Ok(id) = i64::try_from(user.id.0) else {
        tracing::warn!(user.id = user.id.0, "telegram user id out of range, ignoring");
        return None;
    };
    Some(Member {
        id: UserId(id),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        is_premium: user.is_premium,
    })
}
