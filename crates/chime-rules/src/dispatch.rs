//! Live dispatch tables.
//!
//! Active rules and triggers sit in two priority-ordered tables behind
//! `ArcSwap`. Matching works on a snapshot and never waits for a writer;
//! activation and deactivation publish a new table.

use arc_swap::ArcSwap;
use chime_core::clock::Clock;
use chime_core::error::Result;
use chime_core::event::{MessageEvent, NoticeEvent, Target};
use chime_core::template::{RenderContext, Template};
use chime_core::transport::Transport;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compile::{CompiledRule, CompiledTrigger, Compiler};
use crate::model::{Rule, Trigger};
use crate::pattern::MatchDetails;

trait Handler {
    fn id(&self) -> u64;
    fn priority(&self) -> i32;
}

impl Handler for CompiledRule {
    fn id(&self) -> u64 {
        self.id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Handler for CompiledTrigger {
    fn id(&self) -> u64 {
        self.id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
}

/// A handler plus its registration sequence, which breaks priority ties.
struct Slot<T> {
    seq: u64,
    handler: Arc<T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            handler: self.handler.clone(),
        }
    }
}

type Table<T> = ArcSwap<Vec<Slot<T>>>;

fn install<T: Handler>(table: &Table<T>, slot: Slot<T>) {
    let id = slot.handler.id();
    table.rcu(|current| {
        let mut next: Vec<Slot<T>> = current
            .iter()
            .filter(|s| s.handler.id() != id)
            .cloned()
            .collect();
        next.push(slot.clone());
        next.sort_by_key(|s| (s.handler.priority(), s.seq));
        next
    });
}

fn uninstall<T: Handler>(table: &Table<T>, id: u64) -> bool {
    if !table.load().iter().any(|s| s.handler.id() == id) {
        return false;
    }
    table.rcu(|current| {
        current
            .iter()
            .filter(|s| s.handler.id() != id)
            .cloned()
            .collect::<Vec<_>>()
    });
    true
}

pub struct Dispatcher {
    compiler: Compiler,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    rules: Table<CompiledRule>,
    triggers: Table<CompiledTrigger>,
    seq: AtomicU64,
}

impl Dispatcher {
    pub fn new(compiler: Compiler, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            compiler,
            transport,
            clock,
            rules: ArcSwap::from_pointee(Vec::new()),
            triggers: ArcSwap::from_pointee(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Compile and register a rule, replacing any handler with the same id.
    pub fn activate_rule(&self, id: u64, rule: &Rule) -> Result<()> {
        let compiled = self.compiler.compile_rule(id, rule)?;
        install(
            &self.rules,
            Slot {
                seq: self.next_seq(),
                handler: Arc::new(compiled),
            },
        );
        tracing::debug!("✅ Rule {id} '{}' active", rule.display_name);
        Ok(())
    }

    /// Drop a rule's handler and its rate budget. `false` if it was not active.
    pub fn deactivate_rule(&self, id: u64) -> bool {
        self.compiler.limiter().reset(id);
        uninstall(&self.rules, id)
    }

    pub fn has_rule(&self, id: u64) -> bool {
        self.rules.load().iter().any(|s| s.handler.id == id)
    }

    /// Active rule ids in evaluation order.
    pub fn active_rules(&self) -> Vec<u64> {
        self.rules.load().iter().map(|s| s.handler.id).collect()
    }

    pub fn activate_trigger(&self, id: u64, trigger: &Trigger) -> Result<()> {
        let compiled = self.compiler.compile_trigger(id, trigger)?;
        install(
            &self.triggers,
            Slot {
                seq: self.next_seq(),
                handler: Arc::new(compiled),
            },
        );
        tracing::debug!("✅ Trigger {id} '{}' active", trigger.display_name);
        Ok(())
    }

    pub fn deactivate_trigger(&self, id: u64) -> bool {
        uninstall(&self.triggers, id)
    }

    pub fn has_trigger(&self, id: u64) -> bool {
        self.triggers.load().iter().any(|s| s.handler.id == id)
    }

    pub fn active_triggers(&self) -> Vec<u64> {
        self.triggers.load().iter().map(|s| s.handler.id).collect()
    }

    /// Run a message through the active rules in priority order. Returns the
    /// ids of the rules that fired.
    pub async fn handle_message(&self, event: &MessageEvent) -> Vec<u64> {
        let table = self.rules.load_full();
        let mut fired = Vec::new();
        for slot in table.iter() {
            let rule = &slot.handler;
            let Some(details) = rule.matcher.evaluate(event) else {
                continue;
            };
            tracing::info!("⚡ Rule {} '{}' matched", rule.id, rule.name);
            fired.push(rule.id);

            let rendered = self.render_message(rule.template.as_ref(), event, &details);
            self.deliver(rule.id, event.reply_target(), rendered).await;

            if rule.block {
                tracing::debug!("Rule {} blocks lower priorities", rule.id);
                break;
            }
        }
        fired
    }

    /// Run a notice through the active triggers in priority order.
    pub async fn handle_notice(&self, event: &NoticeEvent) -> Vec<u64> {
        let table = self.triggers.load_full();
        let mut fired = Vec::new();
        for slot in table.iter() {
            let trigger = &slot.handler;
            if !trigger.matcher.evaluate(event) {
                continue;
            }
            tracing::info!("⚡ Trigger {} '{}' matched", trigger.id, trigger.name);
            fired.push(trigger.id);

            let rendered = self.render_notice(trigger.template.as_ref(), event);
            self.deliver(trigger.id, event.reply_target(), rendered).await;

            if trigger.block {
                break;
            }
        }
        fired
    }

    fn render_message(
        &self,
        template: &dyn Template,
        event: &MessageEvent,
        details: &MatchDetails,
    ) -> Result<String> {
        let renderer = self.compiler.renderer();
        let mut ctx = renderer.context()?;
        self.fill_common(&mut ctx, event.self_id, event.user_id, event.group_id);
        ctx.set("text", event.text.as_str());
        ctx.set("nickname", event.sender.nickname.as_str());
        ctx.set("message_type", event.channel.as_str());
        ctx.set("args", details.args.clone());
        ctx.set("match", details.captures.clone());
        renderer.render(template, ctx)
    }

    fn render_notice(&self, template: &dyn Template, event: &NoticeEvent) -> Result<String> {
        let renderer = self.compiler.renderer();
        let mut ctx = renderer.context()?;
        self.fill_common(&mut ctx, event.self_id, event.user_id, event.group_id);
        ctx.set("detail_type", event.detail_type.as_str());
        ctx.set("sub_type", event.sub_type.as_str());
        renderer.render(template, ctx)
    }

    fn fill_common(&self, ctx: &mut RenderContext, self_id: i64, user_id: i64, group_id: i64) {
        ctx.set("self_id", self_id);
        ctx.set("user_id", user_id);
        ctx.set("group_id", group_id);
        ctx.set("now", self.clock.now().to_rfc3339());
    }

    async fn deliver(&self, id: u64, target: Target, rendered: Result<String>) {
        match rendered {
            Ok(text) if text.is_empty() => {
                tracing::debug!("Entry {id} rendered nothing, no reply sent");
            }
            Ok(text) => {
                if let Err(e) = self.transport.send(target, &text).await {
                    tracing::error!("❌ Entry {id}: delivery to {target} failed: {e}");
                }
            }
            Err(e) => tracing::error!("❌ Entry {id}: render failed: {e}"),
        }
    }
}
