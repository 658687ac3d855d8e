//! Scheduled job definition.

use chime_core::event::Target;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub display_name: String,
    pub active: bool,
    /// Groups that receive the output.
    pub groups_id: BTreeSet<i64>,
    /// Users that receive the output privately.
    pub users_id: BTreeSet<i64>,
    /// Delete the job after its first firing.
    pub once: bool,
    pub cron_spec: String,
    /// Template rendered on every firing.
    pub action: String,
    pub parent_group: u64,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            active: true,
            groups_id: BTreeSet::new(),
            users_id: BTreeSet::new(),
            once: false,
            cron_spec: String::new(),
            action: String::new(),
            parent_group: 0,
        }
    }
}

impl Job {
    pub fn new(name: &str, cron_spec: &str, action: &str) -> Self {
        Self {
            display_name: name.to_string(),
            cron_spec: cron_spec.to_string(),
            action: action.to_string(),
            ..Self::default()
        }
    }

    /// Every user privately, then every group.
    pub fn targets(&self) -> Vec<Target> {
        self.users_id
            .iter()
            .map(|&id| Target::Private(id))
            .chain(self.groups_id.iter().map(|&id| Target::Group(id)))
            .collect()
    }
}
