use chime_core::clock::ManualClock;
use chime_core::error::{ChimeError, Result, ValidationKind};
use chime_core::event::{MessageEvent, NoticeEvent, Target};
use chime_core::transport::{RecordingTransport, Transport};
use chime_registry::{Entry, ItemType, ROOT_GROUP, Resource, Runtime};
use chime_rules::{MatchSettings, MatcherType, RateLimit, Rule, Trigger};
use chime_scheduler::{Job, JobState};
use chime_store::{KvStore, MemoryStore, Namespace};
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

struct Harness {
    runtime: Runtime,
    store: Arc<MemoryStore>,
    transport: Arc<RecordingTransport>,
    clock: Arc<ManualClock>,
}

fn harness_on(store: Arc<MemoryStore>) -> Harness {
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let runtime = Runtime::builder(store.clone(), transport.clone())
        .settings(MatchSettings {
            command_prefix: "/".into(),
            bot_admins: [42].into(),
        })
        .clock(clock.clone())
        .build()
        .unwrap();
    Harness {
        runtime,
        store,
        transport,
        clock,
    }
}

fn harness() -> Harness {
    harness_on(Arc::new(MemoryStore::new()))
}

fn ping_rule() -> Rule {
    Rule::new("ping", MatcherType::Keyword, &["ping"], "pong")
}

#[tokio::test]
async fn test_ping_pong_then_delete() {
    let h = harness();
    let id = h.runtime.registry().await.create_rule(ROOT_GROUP, ping_rule()).unwrap();
    assert_eq!(id, 1);

    let fired = h.runtime.handle_message(&MessageEvent::group(5, 1, "ping")).await;
    assert_eq!(fired, vec![1]);
    assert_eq!(h.transport.sent(), vec![(Target::Group(5), "pong".to_string())]);

    h.runtime.registry().await.delete_entry(1).unwrap();
    {
        let registry = h.runtime.registry().await;
        assert!(registry.group(ROOT_GROUP).unwrap().items.is_empty());
        assert!(registry.rule(1).is_none());
    }
    assert!(h.store.get(&Namespace::Rules.key(1)).unwrap().is_none());

    h.transport.clear();
    assert!(h.runtime.handle_message(&MessageEvent::group(5, 1, "ping")).await.is_empty());
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_delete_removes_exactly_one_item() {
    let h = harness();
    let (a, b, c) = {
        let mut registry = h.runtime.registry().await;
        (
            registry.create_rule(ROOT_GROUP, ping_rule()).unwrap(),
            registry
                .create_trigger(ROOT_GROUP, Trigger::new("join", &["group_increase"], "hi"))
                .unwrap(),
            registry.create_job(ROOT_GROUP, Job::new("daily", "@daily", "morning")).unwrap(),
        )
    };
    h.runtime.registry().await.delete_entry(b).unwrap();

    let registry = h.runtime.registry().await;
    let ids: Vec<u64> = registry
        .group(ROOT_GROUP)
        .unwrap()
        .items
        .iter()
        .map(|i| i.item_id)
        .collect();
    assert_eq!(ids, vec![a, c]);
    drop(registry);

    // the persisted parent agrees, and a reload rebuilds the same tree
    let reloaded = harness_on(h.store.clone());
    let before = h.runtime.registry().await.groups().clone();
    assert_eq!(reloaded.runtime.registry().await.groups(), &before);
}

#[tokio::test]
async fn test_priority_and_block_through_registry() {
    let h = harness();
    {
        let mut registry = h.runtime.registry().await;
        let mut low = Rule::new("low", MatcherType::Keyword, &["hi"], "second");
        low.priority = 2;
        registry.create_rule(ROOT_GROUP, low).unwrap();
        let mut high = Rule::new("high", MatcherType::Keyword, &["hi"], "first");
        high.priority = 1;
        high.block = true;
        registry.create_rule(ROOT_GROUP, high).unwrap();
    }
    let fired = h.runtime.handle_message(&MessageEvent::group(5, 1, "hi")).await;
    assert_eq!(fired, vec![2]);
    assert_eq!(h.transport.texts(), vec!["first"]);
}

#[tokio::test]
async fn test_reload_roundtrip() {
    let h = harness();
    let mut rule = Rule::new("weather", MatcherType::Command, &["weather"], "{{args}}");
    rule.groups_id = [5, 6].into();
    rule.rate_limit = Some(RateLimit { limit: 3, window_secs: 60 });
    rule.priority = 4;
    let mut inactive_job = Job::new("weekly", "0 9 * * 1", "report");
    inactive_job.active = false;
    inactive_job.users_id = [7].into();

    let (group, rule_id, trigger_id, job_id, resource_id) = {
        let mut registry = h.runtime.registry().await;
        let group = registry.create_group(ROOT_GROUP, "weather").unwrap();
        (
            group,
            registry.create_rule(group, rule.clone()).unwrap(),
            registry
                .create_trigger(group, Trigger::new("poke", &["notify", "poke"], "ouch"))
                .unwrap(),
            registry.create_job(ROOT_GROUP, inactive_job.clone()).unwrap(),
            registry
                .create_resource(
                    group,
                    Resource {
                        display_name: "map".into(),
                        file_name: "map.png".into(),
                        parent_group: 0,
                    },
                )
                .unwrap(),
        )
    };

    let reloaded = harness_on(h.store.clone());
    let registry = reloaded.runtime.registry().await;
    let original = h.runtime.registry().await;

    rule.parent_group = group;
    assert_eq!(registry.rule(rule_id), Some(&rule));
    assert_eq!(registry.trigger(trigger_id), original.trigger(trigger_id));
    inactive_job.parent_group = ROOT_GROUP;
    assert_eq!(registry.job(job_id), Some(&inactive_job));
    assert_eq!(registry.resource(resource_id).unwrap().parent_group, group);
    assert_eq!(registry.groups(), original.groups());

    assert_eq!(registry.dispatcher().active_rules(), vec![rule_id]);
    assert_eq!(registry.dispatcher().active_triggers(), vec![trigger_id]);
    assert_eq!(registry.scheduler().state(job_id), JobState::Inactive);
    assert_eq!(registry.cursor(), resource_id);
    drop(registry);
    drop(original);

    let next = reloaded
        .runtime
        .registry()
        .await
        .create_rule(ROOT_GROUP, ping_rule())
        .unwrap();
    assert_eq!(next, resource_id + 1);

    let fired = reloaded
        .runtime
        .handle_message(&MessageEvent::group(6, 1, "/weather oslo"))
        .await;
    assert_eq!(fired, vec![rule_id]);
    assert_eq!(reloaded.transport.texts(), vec!["oslo"]);
}

#[tokio::test]
async fn test_once_job_fires_exactly_once() {
    let h = harness();
    let mut job = Job::new("reminder", "@every 1m", "stand up at {{now}}");
    job.once = true;
    job.groups_id = [5].into();
    job.users_id = [1].into();
    let id = h.runtime.registry().await.create_job(ROOT_GROUP, job).unwrap();

    assert!(h.runtime.tick().await.is_empty());

    h.clock.advance(Duration::seconds(60));
    assert_eq!(h.runtime.tick().await, vec![id]);
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, Target::Private(1));
    assert_eq!(sent[1].0, Target::Group(5));
    assert!(sent[0].1.starts_with("stand up at 2026-03-01T12:01:00"));

    {
        let registry = h.runtime.registry().await;
        assert!(registry.job(id).is_none());
        assert_eq!(registry.scheduler().state(id), JobState::Inactive);
        assert!(registry.group(ROOT_GROUP).unwrap().items.is_empty());
    }
    assert!(h.store.get(&Namespace::Jobs.key(id)).unwrap().is_none());

    h.clock.advance(Duration::seconds(60));
    assert!(h.runtime.tick().await.is_empty());
    assert_eq!(h.transport.sent().len(), 2);
}

#[tokio::test]
async fn test_recurring_job_keeps_firing() {
    let h = harness();
    let mut job = Job::new("heartbeat", "@every 30s", "beat");
    job.groups_id = [9].into();
    let id = h.runtime.registry().await.create_job(ROOT_GROUP, job).unwrap();

    for _ in 0..3 {
        h.clock.advance(Duration::seconds(30));
        assert_eq!(h.runtime.tick().await, vec![id]);
    }
    assert_eq!(h.transport.texts(), vec!["beat", "beat", "beat"]);
    assert!(h.runtime.registry().await.job(id).is_some());
}

#[tokio::test]
async fn test_one_shot_cleanup_tolerates_manual_delete() {
    let h = harness();
    let mut job = Job::new("once", "@every 1m", "x");
    job.once = true;
    let id = h.runtime.registry().await.create_job(ROOT_GROUP, job).unwrap();
    h.runtime.registry().await.delete_entry(id).unwrap();
    h.runtime.registry().await.finish_one_shot(id).unwrap();
}

/// Redefines a job the first time anything is delivered, the way an admin
/// edit can land while a firing is still being sent.
struct EditingTransport {
    runtime: OnceLock<Runtime>,
    job_id: u64,
    replacement: Job,
    edited: AtomicBool,
    inner: RecordingTransport,
}

#[async_trait::async_trait]
impl Transport for EditingTransport {
    fn name(&self) -> &str {
        "editing"
    }

    async fn send(&self, target: Target, text: &str) -> Result<()> {
        if !self.edited.swap(true, Ordering::SeqCst)
            && let Some(runtime) = self.runtime.get()
        {
            runtime
                .registry()
                .await
                .modify_job(self.job_id, self.replacement.clone())?;
        }
        self.inner.send(target, text).await
    }
}

#[tokio::test]
async fn test_job_redefined_during_delivery_survives_cleanup() {
    let mut replacement = Job::new("heartbeat", "@every 5m", "beat");
    replacement.groups_id = [5].into();
    let transport = Arc::new(EditingTransport {
        runtime: OnceLock::new(),
        job_id: 1,
        replacement,
        edited: AtomicBool::new(false),
        inner: RecordingTransport::new(),
    });
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let runtime = Runtime::builder(store.clone(), transport.clone())
        .clock(clock.clone())
        .build()
        .unwrap();
    assert!(transport.runtime.set(runtime.clone()).is_ok());

    let mut job = Job::new("once", "@every 1m", "x");
    job.once = true;
    job.groups_id = [5].into();
    let id = runtime.registry().await.create_job(ROOT_GROUP, job).unwrap();
    assert_eq!(id, 1);

    clock.advance(Duration::seconds(60));
    assert_eq!(runtime.tick().await, vec![id]);
    {
        let registry = runtime.registry().await;
        let kept = registry.job(id).unwrap();
        assert_eq!(kept.display_name, "heartbeat");
        assert!(!kept.once);
        assert_eq!(registry.scheduler().state(id), JobState::Active);
        assert!(registry.group(ROOT_GROUP).unwrap().contains(id));
    }
    assert!(store.get(&Namespace::Jobs.key(id)).unwrap().is_some());

    // the redefinition keeps its own schedule
    clock.advance(Duration::minutes(5));
    assert_eq!(runtime.tick().await, vec![id]);
    assert_eq!(transport.inner.texts(), vec!["x".to_string(), "beat".to_string()]);
}

#[tokio::test]
async fn test_rate_limit_three_per_minute() {
    let h = harness();
    let mut rule = ping_rule();
    rule.rate_limit = Some(RateLimit { limit: 3, window_secs: 60 });
    let id = h.runtime.registry().await.create_rule(ROOT_GROUP, rule).unwrap();
    let ping = MessageEvent::group(5, 1, "ping");

    for _ in 0..3 {
        assert_eq!(h.runtime.handle_message(&ping).await, vec![id]);
    }
    assert!(h.runtime.handle_message(&ping).await.is_empty());

    h.clock.advance(Duration::seconds(60));
    assert_eq!(h.runtime.handle_message(&ping).await, vec![id]);
    assert_eq!(h.transport.texts().len(), 4);
}

#[tokio::test]
async fn test_missing_parent_writes_nothing() {
    let h = harness();
    let before = h.store.snapshot();
    let err = h
        .runtime
        .registry()
        .await
        .create_rule(999, ping_rule())
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn test_invalid_definitions_are_not_persisted() {
    let h = harness();
    let before = h.store.snapshot();
    let mut registry = h.runtime.registry().await;

    let bad_regex = Rule::new("re", MatcherType::Regex, &["(oops"], "x");
    assert!(matches!(
        registry.create_rule(ROOT_GROUP, bad_regex),
        Err(ChimeError::Validation(ValidationKind::RegexSyntax, _))
    ));
    assert!(matches!(
        registry.create_job(ROOT_GROUP, Job::new("j", "whenever", "x")),
        Err(ChimeError::Validation(ValidationKind::CronSpec, _))
    ));
    assert!(matches!(
        registry.create_trigger(ROOT_GROUP, Trigger::new("t", &[], "x")),
        Err(ChimeError::Validation(ValidationKind::TriggerArity, _))
    ));
    drop(registry);
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn test_undecodable_records_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    {
        let h = harness_on(store.clone());
        h.runtime.registry().await.create_rule(ROOT_GROUP, ping_rule()).unwrap();
    }
    store.put(&Namespace::Rules.key(50), b"not json").unwrap();
    store.put(&Namespace::Triggers.key(51), br#"{"trigger_type": 5}"#).unwrap();

    let h = harness_on(store);
    let mut registry = h.runtime.registry().await;
    assert_eq!(registry.rules().keys().copied().collect::<Vec<_>>(), vec![1]);
    assert!(registry.triggers().is_empty());
    // skipped ids are never handed out again
    assert_eq!(registry.create_rule(ROOT_GROUP, ping_rule()).unwrap(), 52);
}

#[tokio::test]
async fn test_modify_rule_swaps_handler_and_renames() {
    let h = harness();
    let group = h.runtime.registry().await.create_group(ROOT_GROUP, "fun").unwrap();
    let id = h.runtime.registry().await.create_rule(group, ping_rule()).unwrap();

    let mut changed = Rule::new("ping v2", MatcherType::FullMatch, &["ping"], "PONG");
    changed.parent_group = 12345;
    h.runtime.registry().await.modify_rule(id, changed).unwrap();

    {
        let registry = h.runtime.registry().await;
        let rule = registry.rule(id).unwrap();
        assert_eq!(rule.parent_group, group);
        assert_eq!(registry.group(group).unwrap().find(id).unwrap().display_name, "ping v2");
    }

    assert!(h.runtime.handle_message(&MessageEvent::group(5, 1, "a ping")).await.is_empty());
    assert_eq!(h.runtime.handle_message(&MessageEvent::group(5, 1, "ping")).await, vec![id]);
    assert_eq!(h.transport.texts(), vec!["PONG"]);

    let mut off = ping_rule();
    off.display_name = "ping v2".into();
    off.active = false;
    h.runtime.registry().await.modify_rule(id, off).unwrap();
    assert!(h.runtime.dispatcher().active_rules().is_empty());
}

#[tokio::test]
async fn test_modify_job_deactivates_timer() {
    let h = harness();
    let id = h
        .runtime
        .registry()
        .await
        .create_job(ROOT_GROUP, Job::new("j", "@hourly", "x"))
        .unwrap();
    assert_eq!(h.runtime.registry().await.scheduler().state(id), JobState::Active);

    let mut inactive = Job::new("j", "@hourly", "x");
    inactive.active = false;
    h.runtime.registry().await.modify_job(id, inactive).unwrap();
    assert_eq!(h.runtime.registry().await.scheduler().state(id), JobState::Inactive);
}

#[tokio::test]
async fn test_modify_rejects_kind_change_and_unknown_id() {
    let h = harness();
    let id = h.runtime.registry().await.create_rule(ROOT_GROUP, ping_rule()).unwrap();
    let mut registry = h.runtime.registry().await;
    assert!(matches!(
        registry.modify_job(id, Job::new("j", "@daily", "x")),
        Err(ChimeError::Validation(ValidationKind::ItemType, _))
    ));
    assert!(registry.modify_rule(77, ping_rule()).unwrap_err().is_not_found());
    assert!(registry.delete_entry(77).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_notice_trigger_through_runtime() {
    let h = harness();
    let mut welcome = Trigger::new("welcome", &["group_increase"], "welcome {{user_id}}");
    welcome.groups_id = [5].into();
    let id = h.runtime.registry().await.create_trigger(ROOT_GROUP, welcome).unwrap();

    assert!(h
        .runtime
        .handle_notice(&NoticeEvent::new("group_increase", "approve", 6, 3))
        .await
        .is_empty());
    assert_eq!(
        h.runtime
            .handle_notice(&NoticeEvent::new("group_increase", "approve", 5, 3))
            .await,
        vec![id]
    );
    assert_eq!(h.transport.sent(), vec![(Target::Group(5), "welcome 3".to_string())]);
}

#[tokio::test]
async fn test_group_tree_operations() {
    let h = harness();
    let mut registry = h.runtime.registry().await;
    let a = registry.create_group(ROOT_GROUP, "a").unwrap();
    let b = registry.create_group(a, "b").unwrap();
    assert_eq!(registry.parent_of_group(b), Some(a));

    // cannot move a group beneath itself or its descendants
    for target in [a, b] {
        assert!(matches!(
            registry.move_group(a, target),
            Err(ChimeError::Validation(ValidationKind::Tree, _))
        ));
    }
    assert!(registry.move_group(ROOT_GROUP, a).is_err());

    registry.move_group(b, ROOT_GROUP).unwrap();
    assert_eq!(registry.parent_of_group(b), Some(ROOT_GROUP));
    assert!(registry.group(a).unwrap().items.is_empty());

    registry.rename_group(b, "bee").unwrap();
    assert_eq!(registry.group(b).unwrap().display_name, "bee");
    assert_eq!(
        registry.group(ROOT_GROUP).unwrap().find(b).unwrap().display_name,
        "bee"
    );

    registry.create_rule(b, ping_rule()).unwrap();
    assert!(matches!(
        registry.delete_group(b),
        Err(ChimeError::Validation(ValidationKind::Tree, _))
    ));
    assert!(registry.delete_group(ROOT_GROUP).is_err());
    registry.delete_group(a).unwrap();
    assert!(registry.group(a).is_none());
    assert!(!registry.group(ROOT_GROUP).unwrap().contains(a));
    drop(registry);
    assert!(h.store.get(&Namespace::Groups.key(a)).unwrap().is_none());
}

/// Memory store that refuses writes to one chosen key.
struct BlockingStore {
    inner: Arc<MemoryStore>,
    blocked: Mutex<Option<Vec<u8>>>,
}

impl KvStore for BlockingStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.blocked.lock().unwrap().as_deref() == Some(key) {
            return Err(ChimeError::Storage("disk full".into()));
        }
        self.inner.put(key, value)
    }
    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.delete(key)
    }
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan_prefix(prefix)
    }
}

#[tokio::test]
async fn test_failed_move_never_lists_group_twice() {
    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(BlockingStore {
        inner: inner.clone(),
        blocked: Mutex::new(None),
    });
    let runtime = Runtime::builder(store.clone(), Arc::new(RecordingTransport::new()))
        .build()
        .unwrap();
    let mut registry = runtime.registry().await;
    let a = registry.create_group(ROOT_GROUP, "a").unwrap();
    let b = registry.create_group(a, "b").unwrap();

    *store.blocked.lock().unwrap() = Some(Namespace::Groups.key(ROOT_GROUP));
    assert!(matches!(
        registry.move_group(b, ROOT_GROUP),
        Err(ChimeError::Storage(_))
    ));
    let parents = [ROOT_GROUP, a]
        .into_iter()
        .filter(|g| registry.group(*g).unwrap().contains(b))
        .count();
    assert_eq!(parents, 0);
    drop(registry);

    // the unlisted group survives a reload and can be re-attached
    let h = harness_on(inner);
    let mut registry = h.runtime.registry().await;
    assert!(registry.group(b).is_some());
    assert_eq!(registry.parent_of_group(b), None);
    registry.move_group(b, ROOT_GROUP).unwrap();
    assert_eq!(registry.parent_of_group(b), Some(ROOT_GROUP));
    assert!(!registry.group(a).unwrap().contains(b));
}

#[tokio::test]
async fn test_rename_entry_updates_parent_listing() {
    let h = harness();
    let id = {
        let mut registry = h.runtime.registry().await;
        let group = registry.create_group(ROOT_GROUP, "g").unwrap();
        let id = registry.create_rule(group, ping_rule()).unwrap();
        registry.rename_entry(id, "ping2").unwrap();
        assert_eq!(registry.rule(id).unwrap().display_name, "ping2");
        assert_eq!(registry.group(group).unwrap().find(id).unwrap().display_name, "ping2");

        registry.rename_entry(group, "games").unwrap();
        assert_eq!(registry.group(ROOT_GROUP).unwrap().find(group).unwrap().display_name, "games");
        assert!(registry.rename_entry(999, "x").unwrap_err().is_not_found());
        id
    };

    // still live after the rename
    assert_eq!(h.runtime.handle_message(&MessageEvent::group(5, 1, "ping")).await, vec![id]);

    let reloaded = harness_on(h.store.clone());
    let registry = reloaded.runtime.registry().await;
    assert_eq!(registry.rule(id).unwrap().display_name, "ping2");
}

#[tokio::test]
async fn test_export_import() {
    let h = harness();
    let mut registry = h.runtime.registry().await;
    let group = registry.create_group(ROOT_GROUP, "copies").unwrap();
    let id = registry.create_rule(ROOT_GROUP, ping_rule()).unwrap();

    let bytes = registry.export(id).unwrap();
    let copy = registry.import(group, &bytes).unwrap();
    assert_ne!(copy, id);
    let imported = registry.rule(copy).unwrap();
    assert_eq!(imported.parent_group, group);
    assert_eq!(imported.response, "pong");
    assert_eq!(registry.group(group).unwrap().items[0].item_type, ItemType::Rule);
    assert_eq!(registry.dispatcher().active_rules(), vec![id, copy]);

    let group_record = serde_json::to_vec(&serde_json::json!({
        "item_type": "group",
        "data": {"display_name": "g", "items": []}
    }))
    .unwrap();
    assert!(matches!(
        registry.import(ROOT_GROUP, &group_record),
        Err(ChimeError::Validation(ValidationKind::ItemType, _))
    ));
    assert!(matches!(
        registry.import(ROOT_GROUP, b"garbage"),
        Err(ChimeError::Decode(_))
    ));
    assert!(registry.export(999).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_entry_lookup() {
    let h = harness();
    let mut registry = h.runtime.registry().await;
    let id = registry
        .create_resource(
            ROOT_GROUP,
            Resource {
                display_name: "logo".into(),
                file_name: "logo.png".into(),
                parent_group: 0,
            },
        )
        .unwrap();
    match registry.entry(id) {
        Some(Entry::Resource(r)) => assert_eq!(r.file_name, "logo.png"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(registry.entry(id + 1).is_none());
}

#[tokio::test]
async fn test_bot_admin_role() {
    let h = harness();
    let mut rule = Rule::new("admin", MatcherType::Prefix, &["!ban"], "done");
    rule.role = chime_rules::RoleMask::BOT_ADMIN;
    h.runtime.registry().await.create_rule(ROOT_GROUP, rule).unwrap();

    assert!(h.runtime.handle_message(&MessageEvent::group(5, 1, "!ban x")).await.is_empty());
    assert_eq!(h.runtime.handle_message(&MessageEvent::group(5, 42, "!ban x")).await.len(), 1);
}
