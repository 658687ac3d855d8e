//! Scoped rendering shared by rule replies and scheduled jobs.

use std::sync::Arc;

use crate::error::Result;
use crate::script::ScriptHost;
use crate::template::{RenderContext, Template, TemplateEngine};

/// Template engine plus the optional scripting host.
///
/// Each render gets its own [`RenderContext`] and, when scripting is enabled,
/// its own interpreter session. [`Renderer::render`] consumes the context, so
/// the session is released on every exit path.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn TemplateEngine>,
    script_host: Option<Arc<dyn ScriptHost>>,
}

impl Renderer {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            engine,
            script_host: None,
        }
    }

    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    pub fn compile(&self, source: &str) -> Result<Arc<dyn Template>> {
        self.engine.compile(source)
    }

    /// Fresh context for one render.
    pub fn context(&self) -> Result<RenderContext> {
        let ctx = RenderContext::new();
        match &self.script_host {
            Some(host) => Ok(ctx.with_script(host.open()?)),
            None => Ok(ctx),
        }
    }

    /// Render and trim. An all-whitespace result comes back empty.
    pub fn render(&self, template: &dyn Template, mut ctx: RenderContext) -> Result<String> {
        let out = template.render(&mut ctx)?;
        Ok(out.trim().to_string())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("engine", &self.engine.name())
            .field("script_host", &self.script_host.as_ref().map(|h| h.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChimeError;
    use crate::script::ScriptSession;
    use crate::template::PlaceholderEngine;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Host {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    struct Session(Arc<AtomicUsize>);

    impl ScriptSession for Session {
        fn eval(&mut self, code: &str, vars: &Map<String, Value>) -> Result<String> {
            match vars.get(code) {
                Some(v) => Ok(v.to_string()),
                None => Err(ChimeError::Render(format!("undefined {code}"))),
            }
        }
    }

    impl Drop for Session {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ScriptHost for Host {
        fn name(&self) -> &str {
            "test"
        }

        fn open(&self) -> Result<Box<dyn ScriptSession>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Session(self.closed.clone())))
        }
    }

    #[test]
    fn test_render_trims() {
        let renderer = Renderer::new(Arc::new(PlaceholderEngine));
        let template = renderer.compile("  hi {{ who }} \n").unwrap();
        let mut ctx = renderer.context().unwrap();
        ctx.set("who", "bob");
        assert_eq!(renderer.render(template.as_ref(), ctx).unwrap(), "hi bob");
    }

    #[test]
    fn test_one_session_per_render_and_always_closed() {
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let renderer = Renderer::new(Arc::new(PlaceholderEngine)).with_script_host(Arc::new(Host {
            opened: opened.clone(),
            closed: closed.clone(),
        }));
        let template = renderer.compile("{{= n }}").unwrap();

        let mut ctx = renderer.context().unwrap();
        ctx.set("n", 3);
        assert_eq!(renderer.render(template.as_ref(), ctx).unwrap(), "3");

        let ctx = renderer.context().unwrap();
        assert!(renderer.render(template.as_ref(), ctx).is_err());

        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }
}
