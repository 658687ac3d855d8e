//! Shared handle over the registry and the live dispatch tables.
//!
//! Writers (admin API, one-shot cleanup) go through one async mutex around
//! the [`Registry`]. Event matching reads the dispatcher's snapshots and never
//! takes that lock.

use chime_core::clock::{Clock, SystemClock};
use chime_core::config::ChimeConfig;
use chime_core::error::Result;
use chime_core::event::{MessageEvent, NoticeEvent};
use chime_core::render::Renderer;
use chime_core::script::ScriptHost;
use chime_core::template::{PlaceholderEngine, TemplateEngine};
use chime_core::transport::Transport;
use chime_rules::{Compiler, Dispatcher, MatchSettings, RateLimiter};
use chime_scheduler::{SchedulerEngine, deliver};
use chime_store::KvStore;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::registry::Registry;

pub struct RuntimeBuilder {
    store: Arc<dyn KvStore>,
    transport: Arc<dyn Transport>,
    settings: MatchSettings,
    engine: Arc<dyn TemplateEngine>,
    script_host: Option<Arc<dyn ScriptHost>>,
    clock: Arc<dyn Clock>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: &ChimeConfig) -> Self {
        self.settings = MatchSettings::from_config(config);
        self
    }

    pub fn settings(mut self, settings: MatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wire everything up and replay the store.
    pub fn build(self) -> Result<Runtime> {
        let mut renderer = Renderer::new(self.engine);
        if let Some(host) = self.script_host {
            renderer = renderer.with_script_host(host);
        }
        let limiter = Arc::new(RateLimiter::new(self.clock.clone()));
        let compiler = Compiler::new(self.settings, renderer.clone(), limiter);
        let dispatcher = Arc::new(Dispatcher::new(
            compiler,
            self.transport.clone(),
            self.clock.clone(),
        ));
        let scheduler = SchedulerEngine::new(renderer);
        let registry = Registry::open(self.store, dispatcher.clone(), scheduler, self.clock.clone())?;

        Ok(Runtime {
            registry: Arc::new(Mutex::new(registry)),
            dispatcher,
            transport: self.transport,
            clock: self.clock,
        })
    }
}

#[derive(Clone)]
pub struct Runtime {
    registry: Arc<Mutex<Registry>>,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    pub fn builder(store: Arc<dyn KvStore>, transport: Arc<dyn Transport>) -> RuntimeBuilder {
        RuntimeBuilder {
            store,
            transport,
            settings: MatchSettings {
                command_prefix: "/".into(),
                ..Default::default()
            },
            engine: Arc::new(PlaceholderEngine),
            script_host: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Exclusive access for reads and mutations.
    pub async fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().await
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub async fn handle_message(&self, event: &MessageEvent) -> Vec<u64> {
        self.dispatcher.handle_message(event).await
    }

    pub async fn handle_notice(&self, event: &NoticeEvent) -> Vec<u64> {
        self.dispatcher.handle_notice(event).await
    }

    /// Fire every due job, deliver outside the lock, then clean up the
    /// one-shot jobs that fired. Returns the fired job ids.
    pub async fn tick(&self) -> Vec<u64> {
        let now = self.clock.now();
        let firings = {
            let mut registry = self.registry.lock().await;
            registry.scheduler_mut().collect_due(now)
        };

        for firing in &firings {
            deliver(self.transport.as_ref(), firing).await;
        }

        let finished: Vec<u64> = firings.iter().filter(|f| f.once).map(|f| f.job_id).collect();
        if !finished.is_empty() {
            let mut registry = self.registry.lock().await;
            for id in finished {
                if let Err(e) = registry.finish_one_shot(id) {
                    tracing::error!("❌ Cleanup of one-shot job {id} failed: {e}");
                }
            }
        }

        firings.iter().map(|f| f.job_id).collect()
    }

    /// Run the job timer in the background, checking every `tick_secs`.
    pub fn spawn_scheduler(&self, tick_secs: u64) -> tokio::task::JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            tracing::info!("⏰ Scheduler started (check every {tick_secs}s)");
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(tick_secs.max(1)));
            loop {
                interval.tick().await;
                runtime.tick().await;
            }
        })
    }
}
