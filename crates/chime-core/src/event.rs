//! Inbound events delivered by the chat network's event bus.

use serde::{Deserialize, Serialize};

/// Concrete channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Friend,
    GroupTemporary,
    OtherTemporary,
    Official,
    GroupNormal,
    GroupAnonymous,
    GroupNotice,
    Discussion,
    #[serde(other)]
    Unknown,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friend => "friend",
            Self::GroupTemporary => "group_temporary",
            Self::OtherTemporary => "other_temporary",
            Self::Official => "official",
            Self::GroupNormal => "group_normal",
            Self::GroupAnonymous => "group_anonymous",
            Self::GroupNotice => "group_notice",
            Self::Discussion => "discussion",
            Self::Unknown => "unknown",
        }
    }
}

/// Role of the sender inside a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Member,
    Admin,
    Owner,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// Only present for group messages.
    #[serde(default)]
    pub role: Option<GroupRole>,
}

/// Where a reply or scheduled broadcast goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Private(i64),
    Group(i64),
    Discussion(i64),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Private(id) => write!(f, "private:{id}"),
            Target::Group(id) => write!(f, "group:{id}"),
            Target::Discussion(id) => write!(f, "discuss:{id}"),
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub self_id: i64,
    pub channel: ChannelKind,
    pub user_id: i64,
    /// Group or discussion id, 0 for private chats.
    #[serde(default)]
    pub group_id: i64,
    /// Plain text of the message.
    pub text: String,
    /// The bot was addressed directly (mentioned, or a private chat).
    #[serde(default)]
    pub to_me: bool,
    #[serde(default)]
    pub sender: Sender,
}

impl MessageEvent {
    /// Private message from a friend.
    pub fn private(user_id: i64, text: &str) -> Self {
        Self {
            self_id: 0,
            channel: ChannelKind::Friend,
            user_id,
            group_id: 0,
            text: text.to_string(),
            to_me: true,
            sender: Sender {
                user_id,
                nickname: String::new(),
                role: None,
            },
        }
    }

    /// Regular group message from a plain member.
    pub fn group(group_id: i64, user_id: i64, text: &str) -> Self {
        Self {
            self_id: 0,
            channel: ChannelKind::GroupNormal,
            user_id,
            group_id,
            text: text.to_string(),
            to_me: false,
            sender: Sender {
                user_id,
                nickname: String::new(),
                role: Some(GroupRole::Member),
            },
        }
    }

    pub fn with_role(mut self, role: GroupRole) -> Self {
        self.sender.role = Some(role);
        self
    }

    pub fn addressed(mut self) -> Self {
        self.to_me = true;
        self
    }

    /// Where a reply to this message goes.
    pub fn reply_target(&self) -> Target {
        match self.channel {
            ChannelKind::GroupNormal | ChannelKind::GroupAnonymous | ChannelKind::GroupNotice => {
                Target::Group(self.group_id)
            }
            ChannelKind::Discussion => Target::Discussion(self.group_id),
            _ => Target::Private(self.user_id),
        }
    }
}

/// A notice (member joined, message recalled, poke, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeEvent {
    #[serde(default)]
    pub self_id: i64,
    pub detail_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub group_id: i64,
}

impl NoticeEvent {
    pub fn new(detail_type: &str, sub_type: &str, group_id: i64, user_id: i64) -> Self {
        Self {
            self_id: 0,
            detail_type: detail_type.to_string(),
            sub_type: sub_type.to_string(),
            user_id,
            group_id,
        }
    }

    pub fn reply_target(&self) -> Target {
        if self.group_id != 0 {
            Target::Group(self.group_id)
        } else {
            Target::Private(self.user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_channel_deserializes() {
        let ev: MessageEvent = serde_json::from_value(serde_json::json!({
            "channel": "carrier_pigeon",
            "user_id": 1,
            "text": "hi"
        }))
        .unwrap();
        assert_eq!(ev.channel, ChannelKind::Unknown);
    }

    #[test]
    fn test_reply_targets() {
        assert_eq!(MessageEvent::group(5, 1, "x").reply_target(), Target::Group(5));
        assert_eq!(MessageEvent::private(1, "x").reply_target(), Target::Private(1));
        assert_eq!(NoticeEvent::new("poke", "", 0, 9).reply_target(), Target::Private(9));
        assert_eq!(Target::Group(5).to_string(), "group:5");
    }
}
