//! Defines [`ContentItem`], the unit of content flowing through a build, along
//! with its [`Identifier`] and ordered [`Metadata`]. Actual items are created
//! once by [`crate::loader`] and only read afterwards; virtual items are
//! synthesized by [`crate::view`] from already-filtered item sets.

use std::fmt;

/// The unique, path-like name of a content item within a build (e.g.,
/// `posts/2020-05-10-hello-world.markdown`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier from a path-like string. Leading `./` segments
    /// and backslash separators are normalized away so that two spellings of
    /// the same source resolve to the same identifier.
    pub fn new(raw: &str) -> Identifier {
        let mut normalized = raw.replace('\\', "/");
        while let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_owned();
        }
        Identifier(normalized.trim_start_matches('/').to_owned())
    }

    /// The placeholder identifier carried by a virtual item. Placeholders
    /// live in their own namespace so they never collide with a source file.
    pub fn placeholder(key: &str) -> Identifier {
        Identifier(format!("virtual:{}", key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with("virtual:")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An insertion-ordered mapping of metadata keys to string values. A key that
/// was never inserted is absent, which is distinct from a key holding the
/// empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Metadata {
        Metadata::default()
    }

    /// Looks up `key`, returning `None` when the field is not present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Metadata {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

/// Whether an item is backed by a source file or was synthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Actual,
    Virtual,
}

/// A unit of content: metadata plus a raw body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentItem {
    pub id: Identifier,
    pub kind: ItemKind,
    pub metadata: Metadata,
    pub body: String,
}

impl ContentItem {
    /// Creates an item backed by a source file.
    pub fn actual(id: Identifier, metadata: Metadata, body: String) -> ContentItem {
        ContentItem {
            id,
            kind: ItemKind::Actual,
            metadata,
            body,
        }
    }

    /// Creates a synthesized item with a placeholder identifier derived from
    /// `key` and an empty body.
    pub fn synthesized(key: &str, metadata: Metadata) -> ContentItem {
        ContentItem {
            id: Identifier::placeholder(key),
            kind: ItemKind::Virtual,
            metadata,
            body: String::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }

    pub fn date(&self) -> Option<&str> {
        self.field("date")
    }
}
