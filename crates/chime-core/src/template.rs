//! Response templates.
//!
//! The rendering engine is pluggable through [`TemplateEngine`]. The built-in
//! [`PlaceholderEngine`] substitutes `{{ path.to.var }}` with values from the
//! [`RenderContext`] and hands `{{= code }}` to the scripting session, if any.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{ChimeError, Result, ValidationKind};
use crate::script::ScriptSession;

pub trait TemplateEngine: Send + Sync {
    fn name(&self) -> &str;
    /// Parse `source`. A parse failure is a `Validation(Template, ..)` error.
    fn compile(&self, source: &str) -> Result<Arc<dyn Template>>;
}

pub trait Template: Send + Sync {
    fn render(&self, ctx: &mut RenderContext) -> Result<String>;
}

/// Variables available to a template, plus the scripting session scoped to
/// this one render.
#[derive(Default)]
pub struct RenderContext {
    vars: Map<String, Value>,
    script: Option<Box<dyn ScriptSession>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, session: Box<dyn ScriptSession>) -> Self {
        self.script = Some(session);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.vars.insert(key.to_string(), value.into());
    }

    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Look up a dotted path such as `match.1` or `sender.nickname`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.vars.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn eval_script(&mut self, code: &str) -> Result<String> {
        let session = self
            .script
            .as_mut()
            .ok_or_else(|| ChimeError::Render("scripting is not enabled".into()))?;
        session.eval(code, &self.vars)
    }
}

/// Text form of a context value.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
    Script(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEngine;

impl TemplateEngine for PlaceholderEngine {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn Template>> {
        Ok(Arc::new(PlaceholderTemplate {
            segments: parse(source)?,
        }))
    }
}

#[derive(Debug)]
struct PlaceholderTemplate {
    segments: Vec<Segment>,
}

impl Template for PlaceholderTemplate {
    fn render(&self, ctx: &mut RenderContext) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(path) => {
                    if let Some(value) = ctx.get(path) {
                        out.push_str(&display_value(value));
                    }
                }
                Segment::Script(code) => out.push_str(&ctx.eval_script(code)?),
            }
        }
        Ok(out)
    }
}

fn parse(source: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            ChimeError::validation(ValidationKind::Template, "template error: unclosed '{{'")
        })?;
        let inner = after[..end].trim();
        if inner.is_empty() {
            return Err(ChimeError::validation(
                ValidationKind::Template,
                "template error: empty placeholder",
            ));
        }
        if let Some(code) = inner.strip_prefix('=') {
            segments.push(Segment::Script(code.trim().to_string()));
        } else if inner
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
            && !inner.starts_with('.')
            && !inner.ends_with('.')
        {
            segments.push(Segment::Var(inner.to_string()));
        } else {
            return Err(ChimeError::validation(
                ValidationKind::Template,
                format!("template error: invalid placeholder '{inner}'"),
            ));
        }
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}
