//! Rule and notice-trigger definitions as stored and as accepted by the API.

use chime_core::event::{ChannelKind, GroupRole};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// Channel kinds a rule listens on, one bit per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTypes(pub u32);

impl MessageTypes {
    pub const FRIEND: Self = Self(1 << 0);
    pub const GROUP_TEMPORARY: Self = Self(1 << 1);
    pub const OTHER_TEMPORARY: Self = Self(1 << 2);
    pub const OFFICIAL: Self = Self(1 << 3);
    pub const GROUP_NORMAL: Self = Self(1 << 4);
    pub const GROUP_ANONYMOUS: Self = Self(1 << 5);
    pub const GROUP_NOTICE: Self = Self(1 << 6);
    pub const DISCUSSION: Self = Self(1 << 7);
    pub const ALL: Self = Self(0xFF);

    /// Bit of a concrete channel kind. `None` for unknown kinds.
    pub fn of_channel(kind: ChannelKind) -> Option<Self> {
        Some(match kind {
            ChannelKind::Friend => Self::FRIEND,
            ChannelKind::GroupTemporary => Self::GROUP_TEMPORARY,
            ChannelKind::OtherTemporary => Self::OTHER_TEMPORARY,
            ChannelKind::Official => Self::OFFICIAL,
            ChannelKind::GroupNormal => Self::GROUP_NORMAL,
            ChannelKind::GroupAnonymous => Self::GROUP_ANONYMOUS,
            ChannelKind::GroupNotice => Self::GROUP_NOTICE,
            ChannelKind::Discussion => Self::DISCUSSION,
            ChannelKind::Unknown => return None,
        })
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn accepts(self, kind: ChannelKind) -> bool {
        Self::of_channel(kind).is_some_and(|bit| self.intersects(bit))
    }
}

impl std::ops::BitOr for MessageTypes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Sender roles a rule is restricted to. Zero means unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMask(pub u32);

impl RoleMask {
    pub const MEMBER: Self = Self(1);
    pub const ADMIN: Self = Self(2);
    pub const OWNER: Self = Self(4);
    pub const BOT_ADMIN: Self = Self(8);
    pub const GROUP_ROLES: Self = Self(1 | 2 | 4);

    pub fn of_group_role(role: GroupRole) -> Self {
        match role {
            GroupRole::Member => Self::MEMBER,
            GroupRole::Admin => Self::ADMIN,
            GroupRole::Owner => Self::OWNER,
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for RoleMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// How `patterns` are compared against the message text. Persisted as its
/// integer code; codes this build does not know survive decoding as `Other`
/// and are rejected when compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatcherType {
    #[default]
    FullMatch,
    Keyword,
    Prefix,
    Suffix,
    Command,
    Regex,
    Other(i64),
}

impl MatcherType {
    pub fn code(self) -> i64 {
        match self {
            Self::FullMatch => 0,
            Self::Keyword => 1,
            Self::Prefix => 2,
            Self::Suffix => 3,
            Self::Command => 4,
            Self::Regex => 5,
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::FullMatch,
            1 => Self::Keyword,
            2 => Self::Prefix,
            3 => Self::Suffix,
            4 => Self::Command,
            5 => Self::Regex,
            other => Self::Other(other),
        }
    }
}

impl Serialize for MatcherType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for MatcherType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_code)
    }
}

/// At most `limit` firings per fixed window of `window_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub display_name: String,
    pub active: bool,
    pub message_type: MessageTypes,
    /// Empty means any group.
    pub groups_id: BTreeSet<i64>,
    /// Empty means any user.
    pub users_id: BTreeSet<i64>,
    pub role: RoleMask,
    pub rate_limit: Option<RateLimit>,
    pub matcher_type: MatcherType,
    pub patterns: Vec<String>,
    pub only_at_me: bool,
    pub response: String,
    /// Lower fires first.
    pub priority: i32,
    pub block: bool,
    pub parent_group: u64,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            active: true,
            message_type: MessageTypes::ALL,
            groups_id: BTreeSet::new(),
            users_id: BTreeSet::new(),
            role: RoleMask::default(),
            rate_limit: None,
            matcher_type: MatcherType::FullMatch,
            patterns: Vec::new(),
            only_at_me: false,
            response: String::new(),
            priority: 0,
            block: false,
            parent_group: 0,
        }
    }
}

impl Rule {
    /// Active rule with the given matcher and a single reply template.
    pub fn new(name: &str, matcher_type: MatcherType, patterns: &[&str], response: &str) -> Self {
        Self {
            display_name: name.to_string(),
            matcher_type,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            response: response.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub display_name: String,
    pub active: bool,
    pub groups_id: BTreeSet<i64>,
    pub users_id: BTreeSet<i64>,
    /// `[detail_type]` or `[detail_type, sub_type]`.
    pub trigger_type: Vec<String>,
    pub response: String,
    pub priority: i32,
    pub block: bool,
    pub parent_group: u64,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            active: true,
            groups_id: BTreeSet::new(),
            users_id: BTreeSet::new(),
            trigger_type: Vec::new(),
            response: String::new(),
            priority: 0,
            block: false,
            parent_group: 0,
        }
    }
}

impl Trigger {
    pub fn new(name: &str, trigger_type: &[&str], response: &str) -> Self {
        Self {
            display_name: name.to_string(),
            trigger_type: trigger_type.iter().map(|t| t.to_string()).collect(),
            response: response.to_string(),
            ..Self::default()
        }
    }
}
