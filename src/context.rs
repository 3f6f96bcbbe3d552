//! Template contexts. Each view kind has its own small context type, and
//! [`Context`] wraps them in a tagged variant so the renderer can resolve any
//! field by name. A field an item doesn't supply resolves to `None` (and to
//! `nil` in the template) rather than to an empty string or an error, so
//! templates can branch on presence with `{{ if .repo }}`.

use gtmpl_value::Value;
use std::collections::HashMap;

/// Resolves template fields by name.
pub trait FieldSource {
    /// The names this context knows about. Every one of them appears in
    /// [`FieldSource::to_value`], as `nil` when absent.
    fn field_names(&self) -> &'static [&'static str];

    /// Resolves `name`, returning `None` when the field is absent.
    fn field(&self, name: &str) -> Option<Value>;

    /// Converts the context into a template object.
    fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        for name in self.field_names() {
            m.insert((*name).to_owned(), self.field(name).unwrap_or(Value::Nil));
        }
        Value::Object(m)
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn optional(s: &Option<String>) -> Option<Value> {
    s.as_deref().map(string)
}

fn array<T: FieldSource>(items: &[T]) -> Value {
    Value::Array(items.iter().map(FieldSource::to_value).collect())
}

/// A titled link, used for tags and for previous/next navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub title: String,
    pub url: String,
}

impl FieldSource for Link {
    fn field_names(&self) -> &'static [&'static str] {
        &["title", "url"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(string(&self.title)),
            "url" => Some(string(&self.url)),
            _ => None,
        }
    }
}

/// The context for a single post or page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostContext {
    pub title: Option<String>,
    pub url: String,
    /// The human-readable date, e.g. `May 10, 2020`.
    pub date: Option<String>,
    /// The ISO date, e.g. `2020-05-10`.
    pub datetime: Option<String>,
    /// The content-only rendering of the body.
    pub body: String,
    pub tags: Vec<Link>,
    pub prev: Option<Link>,
    pub next: Option<Link>,
}

impl FieldSource for PostContext {
    fn field_names(&self) -> &'static [&'static str] {
        &["title", "url", "date", "datetime", "body", "tags", "prev", "next"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => optional(&self.title),
            "url" => Some(string(&self.url)),
            "date" => optional(&self.date),
            "datetime" => optional(&self.datetime),
            "body" => Some(string(&self.body)),
            // an empty tag list is still a present list
            "tags" => Some(array(&self.tags)),
            "prev" => self.prev.as_ref().map(FieldSource::to_value),
            "next" => self.next.as_ref().map(FieldSource::to_value),
            _ => None,
        }
    }
}

/// The context for a list of posts: the archive, the home page, and each tag
/// listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingContext {
    pub title: String,
    pub url: String,
    /// Set for tag listings only.
    pub tag: Option<String>,
    pub posts: Vec<PostContext>,
    pub tags: Vec<Link>,
}

impl FieldSource for ListingContext {
    fn field_names(&self) -> &'static [&'static str] {
        &["title", "url", "tag", "posts", "tags"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(string(&self.title)),
            "url" => Some(string(&self.url)),
            "tag" => optional(&self.tag),
            "posts" => Some(array(&self.posts)),
            "tags" => Some(array(&self.tags)),
            _ => None,
        }
    }
}

/// The context for one hand-authored project record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectContext {
    pub name: String,
    pub description: String,
    pub url: String,
    /// The optional secondary link (e.g. a source repository).
    pub repo: Option<String>,
}

impl FieldSource for ProjectContext {
    fn field_names(&self) -> &'static [&'static str] {
        &["name", "description", "url", "repo"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(string(&self.name)),
            "description" => Some(string(&self.description)),
            "url" => Some(string(&self.url)),
            "repo" => optional(&self.repo),
            _ => None,
        }
    }
}

/// The context for the project listing page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectsContext {
    pub title: String,
    pub url: String,
    pub projects: Vec<ProjectContext>,
}

impl FieldSource for ProjectsContext {
    fn field_names(&self) -> &'static [&'static str] {
        &["title", "url", "projects"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(string(&self.title)),
            "url" => Some(string(&self.url)),
            "projects" => Some(array(&self.projects)),
            _ => None,
        }
    }
}

/// Site-wide values available to every template under `.site`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SiteContext {
    pub title: String,
    pub home: String,
    pub archive: String,
    pub feed: String,
    pub projects: Option<String>,
}

impl FieldSource for SiteContext {
    fn field_names(&self) -> &'static [&'static str] {
        &["title", "home", "archive", "feed", "projects"]
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(string(&self.title)),
            "home" => Some(string(&self.home)),
            "archive" => Some(string(&self.archive)),
            "feed" => Some(string(&self.feed)),
            "projects" => optional(&self.projects),
            _ => None,
        }
    }
}

/// One context per view kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Context {
    Post(PostContext),
    TagListing(ListingContext),
    Index(ListingContext),
    Projects(ProjectsContext),
}

impl Context {
    fn inner(&self) -> &dyn FieldSource {
        match self {
            Context::Post(c) => c,
            Context::TagListing(c) => c,
            Context::Index(c) => c,
            Context::Projects(c) => c,
        }
    }
}

impl FieldSource for Context {
    fn field_names(&self) -> &'static [&'static str] {
        self.inner().field_names()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.inner().field(name)
    }
}
