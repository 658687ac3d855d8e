//! Turns rule and trigger definitions into predicate chains.
//!
//! A rule compiles to its filter predicates (channel kind, allow-lists,
//! addressed-to-bot, role), then its text pattern, then its rate limit. All
//! must pass, left to right. The pattern runs before the rate limit, so only
//! messages that actually match the pattern consume budget.

use chime_core::config::ChimeConfig;
use chime_core::error::{ChimeError, Result, ValidationKind};
use chime_core::event::{MessageEvent, NoticeEvent};
use chime_core::render::Renderer;
use chime_core::template::Template;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::limiter::{RateLimiter, window_length};
use crate::model::{RateLimit, RoleMask, Rule, Trigger};
use crate::pattern::{MatchDetails, Pattern};

pub type MessagePredicate = Box<dyn Fn(&MessageEvent) -> bool + Send + Sync>;
pub type NoticePredicate = Box<dyn Fn(&NoticeEvent) -> bool + Send + Sync>;

/// Settings that shape matching but live outside the rule itself.
#[derive(Debug, Clone, Default)]
pub struct MatchSettings {
    pub command_prefix: String,
    pub bot_admins: HashSet<i64>,
}

impl MatchSettings {
    pub fn from_config(config: &ChimeConfig) -> Self {
        Self {
            command_prefix: config.command_prefix.clone(),
            bot_admins: config.bot_admins.iter().copied().collect(),
        }
    }
}

pub struct RuleMatcher {
    rule_id: u64,
    filters: Vec<MessagePredicate>,
    pattern: Pattern,
    rate_limit: Option<RateLimit>,
    limiter: Arc<RateLimiter>,
}

impl RuleMatcher {
    pub fn evaluate(&self, event: &MessageEvent) -> Option<MatchDetails> {
        if !self.filters.iter().all(|p| p(event)) {
            return None;
        }
        let details = self.pattern.matches(&event.text)?;
        if let Some(limit) = &self.rate_limit
            && !self.limiter.try_acquire(self.rule_id, limit)
        {
            return None;
        }
        Some(details)
    }
}

pub struct TriggerMatcher {
    filters: Vec<NoticePredicate>,
}

impl TriggerMatcher {
    pub fn evaluate(&self, event: &NoticeEvent) -> bool {
        self.filters.iter().all(|p| p(event))
    }
}

/// A rule ready for dispatch.
pub struct CompiledRule {
    pub id: u64,
    pub name: String,
    pub priority: i32,
    pub block: bool,
    pub matcher: RuleMatcher,
    pub template: Arc<dyn Template>,
}

pub struct CompiledTrigger {
    pub id: u64,
    pub name: String,
    pub priority: i32,
    pub block: bool,
    pub matcher: TriggerMatcher,
    pub template: Arc<dyn Template>,
}

pub struct Compiler {
    settings: Arc<MatchSettings>,
    renderer: Renderer,
    limiter: Arc<RateLimiter>,
}

impl Compiler {
    pub fn new(settings: MatchSettings, renderer: Renderer, limiter: Arc<RateLimiter>) -> Self {
        Self {
            settings: Arc::new(settings),
            renderer,
            limiter,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Everything `compile_rule` would reject, without building anything
    /// that touches runtime state.
    pub fn validate_rule(&self, rule: &Rule) -> Result<()> {
        Pattern::compile(rule.matcher_type, &rule.patterns, &self.settings.command_prefix)?;
        if let Some(limit) = &rule.rate_limit {
            validate_rate_limit(limit)?;
        }
        self.renderer.compile(&rule.response)?;
        Ok(())
    }

    pub fn compile_rule(&self, id: u64, rule: &Rule) -> Result<CompiledRule> {
        let pattern =
            Pattern::compile(rule.matcher_type, &rule.patterns, &self.settings.command_prefix)?;
        if let Some(limit) = &rule.rate_limit {
            validate_rate_limit(limit)?;
        }
        let template = self.renderer.compile(&rule.response)?;

        let mut filters: Vec<MessagePredicate> = Vec::new();
        let message_type = rule.message_type;
        filters.push(Box::new(move |ev: &MessageEvent| message_type.accepts(ev.channel)));
        if let Some(groups) = non_empty(&rule.groups_id) {
            filters.push(Box::new(move |ev: &MessageEvent| groups.contains(&ev.group_id)));
        }
        if let Some(users) = non_empty(&rule.users_id) {
            filters.push(Box::new(move |ev: &MessageEvent| users.contains(&ev.user_id)));
        }
        if rule.only_at_me {
            filters.push(Box::new(|ev: &MessageEvent| ev.to_me));
        }
        if !rule.role.is_empty() {
            let role = rule.role;
            let settings = self.settings.clone();
            filters.push(Box::new(move |ev: &MessageEvent| {
                role_allows(role, ev, &settings.bot_admins)
            }));
        }

        Ok(CompiledRule {
            id,
            name: rule.display_name.clone(),
            priority: rule.priority,
            block: rule.block,
            matcher: RuleMatcher {
                rule_id: id,
                filters,
                pattern,
                rate_limit: rule.rate_limit,
                limiter: self.limiter.clone(),
            },
            template,
        })
    }

    pub fn validate_trigger(&self, trigger: &Trigger) -> Result<()> {
        check_trigger_arity(&trigger.trigger_type)?;
        self.renderer.compile(&trigger.response)?;
        Ok(())
    }

    /// A stored trigger with an unsupported arity still compiles, to a
    /// predicate that never passes.
    pub fn compile_trigger(&self, id: u64, trigger: &Trigger) -> Result<CompiledTrigger> {
        let template = self.renderer.compile(&trigger.response)?;

        let mut filters: Vec<NoticePredicate> = Vec::new();
        match trigger.trigger_type.as_slice() {
            [detail] => {
                let detail = detail.clone();
                filters.push(Box::new(move |ev: &NoticeEvent| ev.detail_type == detail));
            }
            [detail, sub] => {
                let (detail, sub) = (detail.clone(), sub.clone());
                filters.push(Box::new(move |ev: &NoticeEvent| {
                    ev.detail_type == detail && ev.sub_type == sub
                }));
            }
            other => {
                tracing::warn!(
                    "⚠️ Trigger {id} '{}' has {} trigger types, it will never fire",
                    trigger.display_name,
                    other.len()
                );
                filters.push(Box::new(|_: &NoticeEvent| false));
            }
        }
        if let Some(groups) = non_empty(&trigger.groups_id) {
            filters.push(Box::new(move |ev: &NoticeEvent| groups.contains(&ev.group_id)));
        }
        if let Some(users) = non_empty(&trigger.users_id) {
            filters.push(Box::new(move |ev: &NoticeEvent| users.contains(&ev.user_id)));
        }

        Ok(CompiledTrigger {
            id,
            name: trigger.display_name.clone(),
            priority: trigger.priority,
            block: trigger.block,
            matcher: TriggerMatcher { filters },
            template,
        })
    }
}

fn non_empty(set: &BTreeSet<i64>) -> Option<HashSet<i64>> {
    (!set.is_empty()).then(|| set.iter().copied().collect())
}

/// Group-role match OR bot-admin match. A mask that names every group role
/// does not restrict by group role at all.
fn role_allows(role: RoleMask, event: &MessageEvent, bot_admins: &HashSet<i64>) -> bool {
    let group_roles = RoleMask(role.0 & RoleMask::GROUP_ROLES.0);
    let group_ok = if group_roles == RoleMask::GROUP_ROLES {
        true
    } else {
        event
            .sender
            .role
            .is_some_and(|r| group_roles.intersects(RoleMask::of_group_role(r)))
    };
    let admin_ok = role.contains(RoleMask::BOT_ADMIN) && bot_admins.contains(&event.user_id);
    group_ok || admin_ok
}

fn validate_rate_limit(limit: &RateLimit) -> Result<()> {
    if limit.limit == 0 || limit.window_secs == 0 {
        return Err(ChimeError::validation(
            ValidationKind::RateLimit,
            "rate limit needs a positive limit and window",
        ));
    }
    if window_length(limit).is_none() {
        return Err(ChimeError::validation(
            ValidationKind::RateLimit,
            format!("rate limit window of {}s is too long", limit.window_secs),
        ));
    }
    Ok(())
}

pub fn check_trigger_arity(trigger_type: &[String]) -> Result<()> {
    match trigger_type.len() {
        1 | 2 => Ok(()),
        n => Err(ChimeError::validation(
            ValidationKind::TriggerArity,
            format!("trigger type takes 1 or 2 values, got {n}"),
        )),
    }
}
