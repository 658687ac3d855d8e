//! The registry: group tree, entry tables, and their live counterparts.
//!
//! Every mutation writes the store first and only then updates the in-memory
//! tables and the runtime. A crash in between leaves at worst an orphaned
//! store record, which the next startup reports and tolerates.

use chime_core::clock::Clock;
use chime_core::error::{ChimeError, Result, ValidationKind};
use chime_rules::{Dispatcher, Rule, Trigger};
use chime_scheduler::{Job, JobState, SchedulerEngine};
use chime_store::{Cursor, KvStore, Namespace, decode_record, encode_record};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entry::{Entry, Resource, UserRecord, group_not_supported};
use crate::item::{Group, Item, ItemType, ROOT_GROUP};

pub struct Registry {
    store: Arc<dyn KvStore>,
    cursor: Cursor,
    groups: BTreeMap<u64, Group>,
    rules: BTreeMap<u64, Rule>,
    triggers: BTreeMap<u64, Trigger>,
    jobs: BTreeMap<u64, Job>,
    resources: BTreeMap<u64, Resource>,
    dispatcher: Arc<Dispatcher>,
    scheduler: SchedulerEngine,
    clock: Arc<dyn Clock>,
}

/// Decode every record of a namespace. Undecodable records are logged and
/// skipped.
fn load_namespace<T: DeserializeOwned>(
    store: &dyn KvStore,
    ns: Namespace,
    cursor: &mut Cursor,
) -> Result<BTreeMap<u64, T>> {
    let mut out = BTreeMap::new();
    for (key, value) in store.scan_prefix(ns.prefix())? {
        let id = match ns.parse_id(&key) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("⚠️ Skipping malformed key in {ns:?}: {e}");
                continue;
            }
        };
        cursor.observe(id);
        match decode_record::<T>(&value) {
            Ok(record) => {
                out.insert(id, record);
            }
            Err(e) => tracing::warn!("⚠️ Skipping undecodable {ns:?} record {id}: {e}"),
        }
    }
    Ok(out)
}

impl Registry {
    /// Replay the store: load the tree and every entry, then activate the
    /// active ones. The root group is created on a fresh store.
    pub fn open(
        store: Arc<dyn KvStore>,
        dispatcher: Arc<Dispatcher>,
        scheduler: SchedulerEngine,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut cursor = Cursor::load(store.as_ref())?;
        let groups = load_namespace(store.as_ref(), Namespace::Groups, &mut cursor)?;
        let rules = load_namespace(store.as_ref(), Namespace::Rules, &mut cursor)?;
        let triggers = load_namespace(store.as_ref(), Namespace::Triggers, &mut cursor)?;
        let jobs = load_namespace(store.as_ref(), Namespace::Jobs, &mut cursor)?;
        let resources = load_namespace(store.as_ref(), Namespace::Resources, &mut cursor)?;

        let mut registry = Self {
            store,
            cursor,
            groups,
            rules,
            triggers,
            jobs,
            resources,
            dispatcher,
            scheduler,
            clock,
        };

        if !registry.groups.contains_key(&ROOT_GROUP) {
            let root = Group::new("root");
            registry.put_group(ROOT_GROUP, &root)?;
            registry.groups.insert(ROOT_GROUP, root);
            tracing::info!("🌱 Created root group");
        }

        registry.check_tree();
        registry.activate_all();

        tracing::info!(
            "📦 Registry loaded: {} groups, {} rules, {} triggers, {} jobs, {} resources (cursor {})",
            registry.groups.len(),
            registry.rules.len(),
            registry.triggers.len(),
            registry.jobs.len(),
            registry.resources.len(),
            registry.cursor.current()
        );
        Ok(registry)
    }

    /// Warn about entries and groups that their parent does not list.
    fn check_tree(&self) {
        let parents = self
            .rules
            .iter()
            .map(|(id, r)| (*id, ItemType::Rule, r.parent_group))
            .chain(self.triggers.iter().map(|(id, t)| (*id, ItemType::Trigger, t.parent_group)))
            .chain(self.jobs.iter().map(|(id, j)| (*id, ItemType::Job, j.parent_group)))
            .chain(self.resources.iter().map(|(id, r)| (*id, ItemType::Resource, r.parent_group)));
        for (id, item_type, parent) in parents {
            match self.groups.get(&parent) {
                Some(group) if group.contains(id) => {}
                Some(_) => tracing::warn!("⚠️ {item_type} {id} is missing from group {parent}"),
                None => tracing::warn!("⚠️ {item_type} {id} points at missing group {parent}"),
            }
        }
        for id in self.groups.keys().copied().filter(|&id| id != ROOT_GROUP) {
            if self.parent_of_group(id).is_none() {
                tracing::warn!("⚠️ Group {id} is not referenced by any group");
            }
        }
    }

    fn activate_all(&mut self) {
        for (id, rule) in self.rules.iter().filter(|(_, r)| r.active) {
            if let Err(e) = self.dispatcher.activate_rule(*id, rule) {
                tracing::warn!("⚠️ Rule {id} '{}' not activated: {e}", rule.display_name);
            }
        }
        for (id, trigger) in self.triggers.iter().filter(|(_, t)| t.active) {
            if let Err(e) = self.dispatcher.activate_trigger(*id, trigger) {
                tracing::warn!("⚠️ Trigger {id} '{}' not activated: {e}", trigger.display_name);
            }
        }
        let now = self.clock.now();
        for (id, job) in self.jobs.iter().filter(|(_, j)| j.active) {
            if let Err(e) = self.scheduler.register(*id, job, now) {
                tracing::warn!("⚠️ Job {id} '{}' not scheduled: {e}", job.display_name);
            }
        }
    }

    // ── Persistence helpers ─────────────────────────────────

    fn put_group(&self, id: u64, group: &Group) -> Result<()> {
        self.store.put(&Namespace::Groups.key(id), &encode_record(group)?)
    }

    fn put_entry(&self, id: u64, entry: &Entry) -> Result<()> {
        self.store
            .put(&entry.item_type().namespace().key(id), &entry.to_bytes()?)
    }

    fn group_or_not_found(&self, id: u64) -> Result<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| ChimeError::not_found(format!("group {id}")))
    }

    /// Apply `edit` to a copy of group `id`, persist it, then keep it.
    fn update_group(&mut self, id: u64, edit: impl FnOnce(&mut Group)) -> Result<()> {
        let mut updated = self.group_or_not_found(id)?.clone();
        edit(&mut updated);
        self.put_group(id, &updated)?;
        self.groups.insert(id, updated);
        Ok(())
    }

    /// Drop the child pointer `id` from `parent`. A missing pointer is
    /// logged, not an error.
    fn unlink(&mut self, parent: u64, id: u64) -> Result<()> {
        match self.groups.get(&parent).map(|g| g.contains(id)) {
            Some(true) => self.update_group(parent, |g| {
                g.remove(id);
            }),
            Some(false) => {
                tracing::warn!("⚠️ Group {parent} does not list {id}, nothing to unlink");
                Ok(())
            }
            None => {
                tracing::warn!("⚠️ Parent group {parent} of {id} is gone, nothing to unlink");
                Ok(())
            }
        }
    }

    fn rename_link(&mut self, parent: u64, id: u64, display_name: &str) -> Result<()> {
        match self.groups.get(&parent).map(|g| g.contains(id)) {
            Some(true) => self.update_group(parent, |g| {
                g.rename(id, display_name);
            }),
            _ => {
                tracing::warn!("⚠️ Cannot rename {id} in group {parent}: not listed");
                Ok(())
            }
        }
    }

    // ── Entries ─────────────────────────────────────────────

    pub fn validate(&self, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Rule(rule) => self.dispatcher.compiler().validate_rule(rule),
            Entry::Trigger(trigger) => self.dispatcher.compiler().validate_trigger(trigger),
            Entry::Job(job) => self.scheduler.validate(job),
            Entry::Resource(_) => Ok(()),
        }
    }

    /// Add `entry` under group `parent` and activate it if it is active.
    pub fn create_entry(&mut self, parent: u64, mut entry: Entry) -> Result<u64> {
        self.group_or_not_found(parent)?;
        self.validate(&entry)?;

        let id = self.cursor.next(self.store.as_ref())?;
        entry.set_parent(parent);
        self.put_entry(id, &entry)?;
        let item = Item {
            item_type: entry.item_type(),
            display_name: entry.display_name().to_string(),
            item_id: id,
        };
        self.update_group(parent, |g| g.items.push(item))?;

        tracing::info!(
            "➕ Created {} {id} '{}' in group {parent}",
            entry.item_type(),
            entry.display_name()
        );
        self.install(id, entry)?;
        Ok(id)
    }

    pub fn create_rule(&mut self, parent: u64, rule: Rule) -> Result<u64> {
        self.create_entry(parent, Entry::Rule(rule))
    }

    pub fn create_trigger(&mut self, parent: u64, trigger: Trigger) -> Result<u64> {
        self.create_entry(parent, Entry::Trigger(trigger))
    }

    pub fn create_job(&mut self, parent: u64, job: Job) -> Result<u64> {
        self.create_entry(parent, Entry::Job(job))
    }

    pub fn create_resource(&mut self, parent: u64, resource: Resource) -> Result<u64> {
        self.create_entry(parent, Entry::Resource(resource))
    }

    /// Put an entry in its table and activate it.
    fn install(&mut self, id: u64, entry: Entry) -> Result<()> {
        match entry {
            Entry::Rule(rule) => {
                if rule.active {
                    self.dispatcher.activate_rule(id, &rule)?;
                }
                self.rules.insert(id, rule);
            }
            Entry::Trigger(trigger) => {
                if trigger.active {
                    self.dispatcher.activate_trigger(id, &trigger)?;
                }
                self.triggers.insert(id, trigger);
            }
            Entry::Job(job) => {
                self.scheduler.register(id, &job, self.clock.now())?;
                self.jobs.insert(id, job);
            }
            Entry::Resource(resource) => {
                self.resources.insert(id, resource);
            }
        }
        Ok(())
    }

    /// Remove an entry from its table and the runtime.
    fn uninstall(&mut self, id: u64, item_type: ItemType) {
        match item_type {
            ItemType::Rule => {
                self.rules.remove(&id);
                self.dispatcher.deactivate_rule(id);
            }
            ItemType::Trigger => {
                self.triggers.remove(&id);
                self.dispatcher.deactivate_trigger(id);
            }
            ItemType::Job => {
                self.jobs.remove(&id);
                self.scheduler.cancel(id);
            }
            ItemType::Resource => {
                self.resources.remove(&id);
            }
            ItemType::Group => {}
        }
    }

    /// Parent link first, then the record, then the runtime handler.
    pub fn delete_entry(&mut self, id: u64) -> Result<()> {
        let entry = self
            .entry(id)
            .ok_or_else(|| ChimeError::not_found(format!("entry {id}")))?;
        let item_type = entry.item_type();
        self.unlink(entry.parent_group(), id)?;
        self.store.delete(&item_type.namespace().key(id))?;
        self.uninstall(id, item_type);
        tracing::info!("🗑️ Deleted {item_type} {id} '{}'", entry.display_name());
        Ok(())
    }

    /// Replace an entry's definition. The entry keeps its id and parent; the
    /// old handler is swapped for one built from the new definition.
    pub fn modify_entry(&mut self, id: u64, mut entry: Entry) -> Result<()> {
        let old = self
            .entry(id)
            .ok_or_else(|| ChimeError::not_found(format!("entry {id}")))?;
        if old.item_type() != entry.item_type() {
            return Err(ChimeError::validation(
                ValidationKind::ItemType,
                format!("{id} is a {}, not a {}", old.item_type(), entry.item_type()),
            ));
        }
        self.validate(&entry)?;
        if old.is_active() && !self.has_handler(id, old.item_type()) {
            return Err(ChimeError::Internal(format!(
                "{} {id} is active but has no runtime handler",
                old.item_type()
            )));
        }

        entry.set_parent(old.parent_group());
        self.put_entry(id, &entry)?;
        self.uninstall(id, old.item_type());
        let renamed = old.display_name() != entry.display_name();
        let new_name = entry.display_name().to_string();
        self.install(id, entry)?;
        if renamed {
            self.rename_link(old.parent_group(), id, &new_name)?;
        }
        tracing::info!("✏️ Modified {} {id} '{new_name}'", old.item_type());
        Ok(())
    }

    pub fn modify_rule(&mut self, id: u64, rule: Rule) -> Result<()> {
        self.modify_entry(id, Entry::Rule(rule))
    }

    pub fn modify_trigger(&mut self, id: u64, trigger: Trigger) -> Result<()> {
        self.modify_entry(id, Entry::Trigger(trigger))
    }

    pub fn modify_job(&mut self, id: u64, job: Job) -> Result<()> {
        self.modify_entry(id, Entry::Job(job))
    }

    pub fn modify_resource(&mut self, id: u64, resource: Resource) -> Result<()> {
        self.modify_entry(id, Entry::Resource(resource))
    }

    /// Rename any item, group or leaf. The parent's listing follows.
    pub fn rename_entry(&mut self, id: u64, display_name: &str) -> Result<()> {
        if self.groups.contains_key(&id) {
            return self.rename_group(id, display_name);
        }
        let mut entry = self
            .entry(id)
            .ok_or_else(|| ChimeError::not_found(format!("entry {id}")))?;
        if entry.display_name() == display_name {
            return Ok(());
        }
        entry.set_display_name(display_name);
        self.modify_entry(id, entry)
    }

    fn has_handler(&self, id: u64, item_type: ItemType) -> bool {
        match item_type {
            ItemType::Rule => self.dispatcher.has_rule(id),
            ItemType::Trigger => self.dispatcher.has_trigger(id),
            ItemType::Job => self.scheduler.state(id) != JobState::Inactive,
            ItemType::Resource | ItemType::Group => true,
        }
    }

    /// Cleanup after a one-shot job fired: job table, timer entry, parent
    /// link, store key. The job may already be gone if it was deleted by
    /// hand in the meantime.
    ///
    /// Only a job still waiting for cleanup is removed. One that was
    /// redefined while its firing was being delivered is left alone.
    pub fn finish_one_shot(&mut self, id: u64) -> Result<()> {
        if self.scheduler.state(id) != JobState::FiredPendingCleanup {
            if self.jobs.contains_key(&id) {
                tracing::info!("🔁 One-shot job {id} was redefined while firing, keeping it");
            } else {
                tracing::debug!("One-shot job {id} already removed");
            }
            return Ok(());
        }
        self.scheduler.cancel(id);
        let Some(job) = self.jobs.remove(&id) else {
            tracing::debug!("One-shot job {id} already removed");
            return Ok(());
        };
        self.unlink(job.parent_group, id)?;
        self.store.delete(&Namespace::Jobs.key(id))?;
        tracing::info!("✅ One-shot job {id} '{}' done and removed", job.display_name);
        Ok(())
    }

    // ── Export / import ─────────────────────────────────────

    pub fn export(&self, id: u64) -> Result<Vec<u8>> {
        let entry = self
            .entry(id)
            .ok_or_else(|| ChimeError::not_found(format!("entry {id}")))?;
        UserRecord::from_entry(&entry)?.to_bytes()
    }

    /// Create a new entry under `parent` from exported bytes.
    pub fn import(&mut self, parent: u64, bytes: &[u8]) -> Result<u64> {
        let record = UserRecord::from_bytes(bytes)?;
        if record.item_type == ItemType::Group {
            return Err(group_not_supported());
        }
        self.create_entry(parent, record.into_entry()?)
    }

    // ── Groups ──────────────────────────────────────────────

    pub fn create_group(&mut self, parent: u64, display_name: &str) -> Result<u64> {
        self.group_or_not_found(parent)?;
        let id = self.cursor.next(self.store.as_ref())?;
        let group = Group::new(display_name);
        self.put_group(id, &group)?;
        self.groups.insert(id, group);
        let item = Item {
            item_type: ItemType::Group,
            display_name: display_name.to_string(),
            item_id: id,
        };
        self.update_group(parent, |g| g.items.push(item))?;
        tracing::info!("📁 Created group {id} '{display_name}' in group {parent}");
        Ok(id)
    }

    pub fn rename_group(&mut self, id: u64, display_name: &str) -> Result<()> {
        let old = self.group_or_not_found(id)?.display_name.clone();
        if old == display_name {
            return Ok(());
        }
        self.update_group(id, |g| g.display_name = display_name.to_string())?;
        if let Some(parent) = self.parent_of_group(id) {
            self.rename_link(parent, id, display_name)?;
        }
        Ok(())
    }

    /// Only empty, non-root groups can be deleted.
    pub fn delete_group(&mut self, id: u64) -> Result<()> {
        if id == ROOT_GROUP {
            return Err(ChimeError::validation(
                ValidationKind::Tree,
                "the root group cannot be deleted",
            ));
        }
        let group = self.group_or_not_found(id)?;
        if !group.items.is_empty() {
            return Err(ChimeError::validation(
                ValidationKind::Tree,
                format!("group {id} still has {} items", group.items.len()),
            ));
        }
        if let Some(parent) = self.parent_of_group(id) {
            self.unlink(parent, id)?;
        }
        self.store.delete(&Namespace::Groups.key(id))?;
        self.groups.remove(&id);
        tracing::info!("🗑️ Deleted group {id}");
        Ok(())
    }

    /// Nest group `id` under `new_parent`.
    pub fn move_group(&mut self, id: u64, new_parent: u64) -> Result<()> {
        if id == ROOT_GROUP {
            return Err(ChimeError::validation(
                ValidationKind::Tree,
                "the root group cannot be moved",
            ));
        }
        let name = self.group_or_not_found(id)?.display_name.clone();
        self.group_or_not_found(new_parent)?;

        let mut cursor = Some(new_parent);
        while let Some(ancestor) = cursor {
            if ancestor == id {
                return Err(ChimeError::validation(
                    ValidationKind::Tree,
                    format!("moving group {id} under {new_parent} would create a cycle"),
                ));
            }
            cursor = self.parent_of_group(ancestor);
        }

        let old_parent = self.parent_of_group(id);
        if old_parent == Some(new_parent) {
            return Ok(());
        }
        let item = Item {
            item_type: ItemType::Group,
            display_name: name,
            item_id: id,
        };
        // Unlink first: a failed second write leaves the group unlisted,
        // which startup reports, never listed under two parents.
        if let Some(old_parent) = old_parent {
            self.unlink(old_parent, id)?;
        }
        self.update_group(new_parent, |g| g.items.push(item))?;
        tracing::info!("📁 Moved group {id} under {new_parent}");
        Ok(())
    }

    /// The group that lists `id` as a child group.
    pub fn parent_of_group(&self, id: u64) -> Option<u64> {
        self.groups.iter().find_map(|(gid, g)| {
            g.items
                .iter()
                .any(|item| item.item_type == ItemType::Group && item.item_id == id)
                .then_some(*gid)
        })
    }

    // ── Reads ───────────────────────────────────────────────

    pub fn group(&self, id: u64) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> &BTreeMap<u64, Group> {
        &self.groups
    }

    pub fn rule(&self, id: u64) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn rules(&self) -> &BTreeMap<u64, Rule> {
        &self.rules
    }

    pub fn trigger(&self, id: u64) -> Option<&Trigger> {
        self.triggers.get(&id)
    }

    pub fn triggers(&self) -> &BTreeMap<u64, Trigger> {
        &self.triggers
    }

    pub fn job(&self, id: u64) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn jobs(&self) -> &BTreeMap<u64, Job> {
        &self.jobs
    }

    pub fn resource(&self, id: u64) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn resources(&self) -> &BTreeMap<u64, Resource> {
        &self.resources
    }

    /// Any leaf entry by id.
    pub fn entry(&self, id: u64) -> Option<Entry> {
        if let Some(r) = self.rules.get(&id) {
            return Some(Entry::Rule(r.clone()));
        }
        if let Some(t) = self.triggers.get(&id) {
            return Some(Entry::Trigger(t.clone()));
        }
        if let Some(j) = self.jobs.get(&id) {
            return Some(Entry::Job(j.clone()));
        }
        self.resources.get(&id).map(|r| Entry::Resource(r.clone()))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &SchedulerEngine {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut SchedulerEngine {
        &mut self.scheduler
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.current()
    }
}
