//! The four leaf kinds managed by the registry, behind one enum.

use chime_core::error::{ChimeError, Result, ValidationKind};
use chime_rules::{Rule, Trigger};
use chime_scheduler::Job;
use chime_store::{decode_record, encode_record};
use serde::{Deserialize, Serialize};

use crate::item::ItemType;

/// A file attached to a group. No runtime behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub display_name: String,
    pub file_name: String,
    pub parent_group: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Rule(Rule),
    Trigger(Trigger),
    Job(Job),
    Resource(Resource),
}

impl Entry {
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Rule(_) => ItemType::Rule,
            Self::Trigger(_) => ItemType::Trigger,
            Self::Job(_) => ItemType::Job,
            Self::Resource(_) => ItemType::Resource,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Rule(r) => &r.display_name,
            Self::Trigger(t) => &t.display_name,
            Self::Job(j) => &j.display_name,
            Self::Resource(r) => &r.display_name,
        }
    }

    pub fn parent_group(&self) -> u64 {
        match self {
            Self::Rule(r) => r.parent_group,
            Self::Trigger(t) => t.parent_group,
            Self::Job(j) => j.parent_group,
            Self::Resource(r) => r.parent_group,
        }
    }

    pub fn set_parent(&mut self, parent: u64) {
        match self {
            Self::Rule(r) => r.parent_group = parent,
            Self::Trigger(t) => t.parent_group = parent,
            Self::Job(j) => j.parent_group = parent,
            Self::Resource(r) => r.parent_group = parent,
        }
    }

    pub fn set_display_name(&mut self, name: &str) {
        let name = name.to_string();
        match self {
            Self::Rule(r) => r.display_name = name,
            Self::Trigger(t) => t.display_name = name,
            Self::Job(j) => j.display_name = name,
            Self::Resource(r) => r.display_name = name,
        }
    }

    /// Whether the entry wants a runtime handler. Resources never do.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Rule(r) => r.active,
            Self::Trigger(t) => t.active,
            Self::Job(j) => j.active,
            Self::Resource(_) => false,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Rule(r) => encode_record(r),
            Self::Trigger(t) => encode_record(t),
            Self::Job(j) => encode_record(j),
            Self::Resource(r) => encode_record(r),
        }
    }

    pub fn from_bytes(item_type: ItemType, bytes: &[u8]) -> Result<Self> {
        Ok(match item_type {
            ItemType::Rule => Self::Rule(decode_record(bytes)?),
            ItemType::Trigger => Self::Trigger(decode_record(bytes)?),
            ItemType::Job => Self::Job(decode_record(bytes)?),
            ItemType::Resource => Self::Resource(decode_record(bytes)?),
            ItemType::Group => return Err(group_not_supported()),
        })
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::Rule(r) => serde_json::to_value(r),
            Self::Trigger(t) => serde_json::to_value(t),
            Self::Job(j) => serde_json::to_value(j),
            Self::Resource(r) => serde_json::to_value(r),
        };
        value.map_err(|e| ChimeError::Internal(format!("encode record: {e}")))
    }
}

pub(crate) fn group_not_supported() -> ChimeError {
    ChimeError::validation(ValidationKind::ItemType, "group in group is not supported")
}

/// Portable form of a single entry, used by export and import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub item_type: ItemType,
    pub data: serde_json::Value,
}

impl UserRecord {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        Ok(Self {
            item_type: entry.item_type(),
            data: entry.to_value()?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_record(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_record(bytes)
    }

    /// Rebuild the entry. Group records are refused.
    pub fn into_entry(self) -> Result<Entry> {
        let decode = |e: serde_json::Error| ChimeError::Decode(e.to_string());
        Ok(match self.item_type {
            ItemType::Rule => Entry::Rule(serde_json::from_value(self.data).map_err(decode)?),
            ItemType::Trigger => Entry::Trigger(serde_json::from_value(self.data).map_err(decode)?),
            ItemType::Job => Entry::Job(serde_json::from_value(self.data).map_err(decode)?),
            ItemType::Resource => {
                Entry::Resource(serde_json::from_value(self.data).map_err(decode)?)
            }
            ItemType::Group => return Err(group_not_supported()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_rules::MatcherType;

    #[test]
    fn test_entry_accessors() {
        let mut entry = Entry::Rule(Rule::new("ping", MatcherType::Keyword, &["ping"], "pong"));
        assert_eq!(entry.item_type(), ItemType::Rule);
        assert_eq!(entry.display_name(), "ping");
        entry.set_parent(4);
        assert_eq!(entry.parent_group(), 4);
        assert!(entry.is_active());

        let resource = Entry::Resource(Resource {
            display_name: "logo".into(),
            file_name: "logo.png".into(),
            parent_group: 0,
        });
        assert!(!resource.is_active());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let entry = Entry::Job(Job::new("daily", "@daily", "hello"));
        let bytes = entry.to_bytes().unwrap();
        assert_eq!(Entry::from_bytes(ItemType::Job, &bytes).unwrap(), entry);
        assert!(Entry::from_bytes(ItemType::Group, &bytes).is_err());
    }

    #[test]
    fn test_user_record_rejects_groups() {
        let record = UserRecord {
            item_type: ItemType::Group,
            data: serde_json::json!({"display_name": "g", "items": []}),
        };
        let err = record.into_entry().unwrap_err();
        assert!(matches!(err, ChimeError::Validation(ValidationKind::ItemType, _)));
    }

    #[test]
    fn test_user_record_roundtrip() {
        let entry = Entry::Trigger(Trigger::new("join", &["group_increase"], "hi"));
        let bytes = UserRecord::from_entry(&entry).unwrap().to_bytes().unwrap();
        let back = UserRecord::from_bytes(&bytes).unwrap().into_entry().unwrap();
        assert_eq!(back, entry);
    }
}
