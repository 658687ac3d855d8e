//! Embedded scripting seam.
//!
//! A [`ScriptHost`] hands out one [`ScriptSession`] per render. The session is
//! owned by the [`RenderContext`](crate::template::RenderContext) it was put in
//! and released when that context is dropped, whatever the render outcome.

use serde_json::{Map, Value};

use crate::error::Result;

pub trait ScriptHost: Send + Sync {
    fn name(&self) -> &str;
    /// Start a fresh interpreter state for a single render.
    fn open(&self) -> Result<Box<dyn ScriptSession>>;
}

pub trait ScriptSession: Send {
    /// Evaluate `code` with the render variables in scope and return its text.
    fn eval(&mut self, code: &str, vars: &Map<String, Value>) -> Result<String>;
}
