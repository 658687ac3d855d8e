//! Timer engine: one entry per active job.
//!
//! The engine only decides *what* is due and renders it. Delivery and the
//! cleanup of fired one-shot jobs happen outside the engine, so callers can
//! drop their locks before touching the network.

use chime_core::error::Result;
use chime_core::event::Target;
use chime_core::render::Renderer;
use chime_core::template::Template;
use chime_core::transport::Transport;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schedule::CronSchedule;
use crate::job::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No timer entry.
    Inactive,
    Active,
    /// A one-shot job that fired and awaits removal.
    FiredPendingCleanup,
}

struct TimerEntry {
    name: String,
    schedule: CronSchedule,
    template: Arc<dyn Template>,
    targets: Vec<Target>,
    once: bool,
    next_fire: Option<DateTime<Utc>>,
    state: JobState,
}

/// A due job, rendered and ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub job_id: u64,
    pub name: String,
    pub once: bool,
    pub targets: Vec<Target>,
    /// `None` when the render failed or produced only whitespace.
    pub text: Option<String>,
}

pub struct SchedulerEngine {
    renderer: Renderer,
    entries: BTreeMap<u64, TimerEntry>,
}

impl SchedulerEngine {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            entries: BTreeMap::new(),
        }
    }

    /// Check the cron spec and the action template.
    pub fn validate(&self, job: &Job) -> Result<()> {
        CronSchedule::parse(&job.cron_spec)?;
        self.renderer.compile(&job.action)?;
        Ok(())
    }

    /// Add a timer entry for `job`, replacing any previous one with the same
    /// id. Inactive jobs get no entry; returns whether one was created.
    pub fn register(&mut self, id: u64, job: &Job, now: DateTime<Utc>) -> Result<bool> {
        if !job.active {
            self.entries.remove(&id);
            return Ok(false);
        }
        let schedule = CronSchedule::parse(&job.cron_spec)?;
        let template = self.renderer.compile(&job.action)?;
        let next_fire = schedule.next_after(now);
        if next_fire.is_none() {
            tracing::warn!("⚠️ Job {id} '{}' has no future firing", job.display_name);
        }
        self.entries.insert(
            id,
            TimerEntry {
                name: job.display_name.clone(),
                schedule,
                template,
                targets: job.targets(),
                once: job.once,
                next_fire,
                state: JobState::Active,
            },
        );
        tracing::info!(
            "📅 Job {id} '{}' scheduled, next at {}",
            job.display_name,
            next_fire.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into())
        );
        Ok(true)
    }

    /// Remove a timer entry. Cancelling an unknown id is a no-op.
    pub fn cancel(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn state(&self, id: u64) -> JobState {
        self.entries
            .get(&id)
            .map(|e| e.state)
            .unwrap_or(JobState::Inactive)
    }

    pub fn next_fire(&self, id: u64) -> Option<DateTime<Utc>> {
        self.entries.get(&id).and_then(|e| e.next_fire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fire every entry due at `now`. Recurring entries move to their next
    /// time; one-shot entries stop and wait for cleanup.
    pub fn collect_due(&mut self, now: DateTime<Utc>) -> Vec<Firing> {
        let mut firings = Vec::new();
        for (&id, entry) in self.entries.iter_mut() {
            if entry.state != JobState::Active || !entry.next_fire.is_some_and(|t| t <= now) {
                continue;
            }
            tracing::info!("🔔 Job {id} '{}' fired", entry.name);

            let text = match render_job(&self.renderer, entry.template.as_ref(), now) {
                Ok(text) if text.is_empty() => None,
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::error!("❌ Job {id}: render failed: {e}");
                    None
                }
            };

            if entry.once {
                entry.state = JobState::FiredPendingCleanup;
                entry.next_fire = None;
            } else {
                entry.next_fire = entry.schedule.next_after(now);
            }

            firings.push(Firing {
                job_id: id,
                name: entry.name.clone(),
                once: entry.once,
                targets: entry.targets.clone(),
                text,
            });
        }
        firings
    }
}

fn render_job(renderer: &Renderer, template: &dyn Template, now: DateTime<Utc>) -> Result<String> {
    let mut ctx = renderer.context()?;
    ctx.set("now", now.to_rfc3339());
    renderer.render(template, ctx)
}

/// Send a firing to every target. Failures are logged per target.
pub async fn deliver(transport: &dyn Transport, firing: &Firing) {
    let Some(text) = &firing.text else {
        tracing::debug!("Job {} produced no output", firing.job_id);
        return;
    };
    for target in &firing.targets {
        match transport.send(*target, text).await {
            Ok(()) => tracing::info!("📣 Job {} delivered to {target}", firing.job_id),
            Err(e) => tracing::warn!("⚠️ Job {} delivery to {target} failed: {e}", firing.job_id),
        }
    }
}
