//! Directory records: the group tree and the items it points at.

use chime_store::Namespace;
use serde::{Deserialize, Serialize};

pub const ROOT_GROUP: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Rule,
    Trigger,
    Job,
    Resource,
    Group,
}

impl ItemType {
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Rule => Namespace::Rules,
            Self::Trigger => Namespace::Triggers,
            Self::Job => Namespace::Jobs,
            Self::Resource => Namespace::Resources,
            Self::Group => Namespace::Groups,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Trigger => "trigger",
            Self::Job => "job",
            Self::Resource => "resource",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer from a group to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_type: ItemType,
    pub display_name: String,
    pub item_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub display_name: String,
    /// Children in insertion order.
    pub items: Vec<Item>,
}

impl Group {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            items: Vec::new(),
        }
    }

    pub fn find(&self, id: u64) -> Option<&Item> {
        self.items.iter().find(|item| item.item_id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.find(id).is_some()
    }

    pub fn remove(&mut self, id: u64) -> Option<Item> {
        let pos = self.items.iter().position(|item| item.item_id == id)?;
        Some(self.items.remove(pos))
    }

    /// Returns `false` when no child has that id.
    pub fn rename(&mut self, id: u64, display_name: &str) -> bool {
        match self.items.iter_mut().find(|item| item.item_id == id) {
            Some(item) => {
                item.display_name = display_name.to_string();
                true
            }
            None => false,
        }
    }
}
