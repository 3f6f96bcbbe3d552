//! The rendering collaborator. Views hand a [`Context`] and a
//! [`TemplateChain`] to a [`Renderer`]; the chain's inner template renders the
//! view's own markup and the outer template wraps it in the page layout.
//! Markdown bodies are converted to content-only HTML snapshots with
//! [`to_html`].

use crate::context::{Context, FieldSource, SiteContext};
use crate::item::{ContentItem, Identifier, ItemKind};
use gtmpl_value::Value;
use pulldown_cmark::{html, Options, Parser};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Renders a named template against a context value.
pub trait Renderer: Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// The templates applied to a view, innermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateChain {
    pub inner: String,
    pub outer: String,
}

impl TemplateChain {
    pub fn new(inner: &str, outer: &str) -> TemplateChain {
        TemplateChain {
            inner: inner.to_owned(),
            outer: outer.to_owned(),
        }
    }

    /// Renders `context` through the chain. Both stages see the view's fields
    /// and `.site`; the outer stage additionally sees the inner stage's output
    /// as `.content`.
    pub fn render(
        &self,
        renderer: &dyn Renderer,
        context: &Context,
        site: &SiteContext,
    ) -> Result<String> {
        let mut value = context.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert("site".to_owned(), site.to_value());
        }
        let content = renderer.render(&self.inner, &value)?;
        if let Value::Object(obj) = &mut value {
            obj.insert("content".to_owned(), Value::String(content));
        }
        renderer.render(&self.outer, &value)
    }
}

/// The template file for each role a view can play. Paths are relative to
/// the theme directory.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct TemplateSet {
    pub default: PathBuf,
    pub post: PathBuf,
    pub page: PathBuf,
    pub archive: PathBuf,
    pub tag: PathBuf,
    pub home: PathBuf,
    pub projects: PathBuf,
}

impl TemplateSet {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        vec![
            ("default", self.default.as_path()),
            ("post", self.post.as_path()),
            ("page", self.page.as_path()),
            ("archive", self.archive.as_path()),
            ("tag", self.tag.as_path()),
            ("home", self.home.as_path()),
            ("projects", self.projects.as_path()),
        ]
        .into_iter()
    }
}

/// A [`Renderer`] over Go-style templates (via [`gtmpl`]), keyed by role name
/// (`default`, `post`, `page`, ...).
#[derive(Clone, Debug, Default)]
pub struct Theme {
    templates: HashMap<String, String>,
}

impl Theme {
    /// Reads every template in `set` from `theme_directory`.
    pub fn load(theme_directory: &Path, set: &TemplateSet) -> Result<Theme> {
        let mut theme = Theme::default();
        for (role, relative) in set.iter() {
            let path = theme_directory.join(relative);
            let source = std::fs::read_to_string(&path)
                .map_err(|err| Error::OpenTemplateFile { path, err })?;
            theme = theme.with(role, &source);
        }
        debug!(templates = theme.templates.len(), "loaded theme");
        Ok(theme)
    }

    /// Adds (or replaces) the template for `role`.
    pub fn with(mut self, role: &str, source: &str) -> Theme {
        self.templates.insert(role.to_owned(), source.to_owned());
        self
    }
}

impl Renderer for Theme {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| Error::UnknownTemplate(template.to_owned()))?;
        gtmpl::template(source, context.clone()).map_err(|err| Error::Template {
            template: template.to_owned(),
            message: err.to_string(),
        })
    }
}

/// Converts markdown to HTML. The result contains the body only, with no
/// page layout, which is what feeds and listings embed.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

/// Content-only renderings of item bodies, keyed by identifier.
pub type Snapshots = HashMap<Identifier, String>;

/// Snapshots the body of every item backed by a source file. Items are
/// independent, so this runs in parallel.
pub fn snapshots(items: &[ContentItem]) -> Snapshots {
    items
        .par_iter()
        .filter(|item| item.kind == ItemKind::Actual)
        .map(|item| (item.id.clone(), to_html(&item.body)))
        .collect()
}

/// A rendered output, addressed by its path relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: String,
}

impl OutputFile {
    pub fn is_html(&self) -> bool {
        self.path.ends_with(".html")
    }
}

/// Represents the result of a rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or executing templates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("opening template file '{}': {err}", path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("no template named `{0}`")]
    UnknownTemplate(String),

    #[error("executing template `{template}`: {message}")]
    Template { template: String, message: String },
}
