//! Status rendering
//!
//! Rendering runs in two phases. The [`Planner`] walks correlations for an
//! object and produces a [`RenderNode`] tree; the [`TemplateEngine`] then
//! renders that tree without touching the cluster. Templates are chosen by
//! kind, falling back to `DefaultResource`, and nested nodes are rendered
//! from inside templates with `render(node)`.

pub mod conditions;
mod dedup;
pub mod functions;
mod node;
mod plan;
mod templates;

pub use dedup::RenderedSet;
pub use node::{Includes, RenderNode};
pub use plan::Planner;
pub use templates::DEFAULT_TEMPLATE;

use anyhow::Context;
use chrono::{DateTime, Utc};
use minijinja::{Environment, Error, State, UndefinedBehavior, Value};
use std::io::Write;
use std::path::Path;

use crate::config::IncludeFlags;
use crate::error::StatusError;
use crate::models::ResourceObject;
use crate::repository::ObjectRepository;

/// Compiled template set
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Built-in templates only
    pub fn new() -> Result<Self, Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        functions::register(&mut env);
        env.add_function("render", render_nested);

        for &(name, source) in templates::BUILTIN_TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Built-in templates, replaced or extended by the `*.tmpl` files in `dir`
    pub fn with_overrides(dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut engine = Self::new().context("Failed to compile built-in templates")?;
        if let Some(dir) = dir {
            for (name, source) in templates::read_template_dir(dir)? {
                tracing::debug!("Using template {} from {}", name, dir.display());
                engine
                    .env
                    .add_template_owned(name.clone(), source)
                    .with_context(|| format!("Failed to compile template {}", name))?;
            }
        }
        Ok(engine)
    }

    /// Pin the clock used for ages
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.env.add_global(functions::NOW_GLOBAL, now.to_rfc3339());
    }

    /// Name of the template used for `kind`
    pub fn template_name(&self, kind: &str) -> String {
        template_name(&self.env, kind)
    }

    pub fn render(&self, node: &RenderNode) -> Result<String, StatusError> {
        if node.already_printed {
            return Ok(node.placeholder_line());
        }
        render_value(&self.env, &Value::from_serialize(node)).map_err(|source| {
            StatusError::Render {
                object: node.display_name.clone(),
                source,
            }
        })
    }
}

fn template_name(env: &Environment<'_>, kind: &str) -> String {
    if !kind.is_empty() && !kind.starts_with('_') && env.get_template(kind).is_ok() {
        kind.to_string()
    } else {
        DEFAULT_TEMPLATE.to_string()
    }
}

fn render_value(env: &Environment<'_>, node: &Value) -> Result<String, Error> {
    if node.get_attr("alreadyPrinted")?.is_true() {
        let display_name = node.get_attr("displayName")?;
        return Ok(format!("{} is already printed", display_name));
    }
    let kind = node.get_attr("kind")?;
    let name = template_name(env, kind.as_str().unwrap_or_default());
    let rendered = env.get_template(&name)?.render(node)?;
    Ok(rendered.trim_end().to_string())
}

/// `render(node)` inside templates
fn render_nested(state: &State, node: Value) -> Result<Value, Error> {
    render_value(state.env(), &node).map(Value::from_safe_string)
}

/// Plans and renders objects for one session
///
/// Owns the session's [`RenderedSet`]; objects are rendered one at a time.
pub struct Dispatcher {
    engine: TemplateEngine,
    rendered: RenderedSet,
    includes: IncludeFlags,
    max_depth: usize,
}

impl Dispatcher {
    pub fn new(
        engine: TemplateEngine,
        includes: IncludeFlags,
        max_depth: usize,
        dedup: bool,
    ) -> Self {
        Self {
            engine,
            rendered: RenderedSet::new(dedup),
            includes,
            max_depth,
        }
    }

    pub fn includes(&self) -> IncludeFlags {
        self.includes
    }

    /// Drop to shallow rendering without de-duplication
    pub fn enter_watch_mode(&mut self) {
        self.includes = IncludeFlags::none();
        self.rendered.disable();
    }

    /// Render one object followed by a blank line
    pub async fn render(
        &mut self,
        repo: &ObjectRepository,
        object: ResourceObject,
        out: &mut (dyn Write + Send),
    ) -> Result<(), StatusError> {
        let node = Planner::new(repo, self.includes, self.max_depth, &mut self.rendered)
            .plan(object)
            .await;
        let text = self.engine.render(&node)?;
        writeln!(out, "{}", text)?;
        writeln!(out)?;
        Ok(())
    }
}
