//! Output paths. [`RouteResolver`] derives the canonical output path of an
//! item from its identifier, and [`RouteTable`] records every output the build
//! will produce so that two producers can never claim the same path.

use crate::item::Identifier;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_WIDTH: usize = "YYYY-MM-DD".len();
const INDEX_FILE: &str = "index.html";

/// Resolves identifiers following `<section>/<YYYY-MM-DD>-<slug>.<ext>` into
/// `<outSection>/<slug>/index.html`, where `<outSection>` is the configured
/// rename of `<section>` (or `<section>` itself if none is configured).
#[derive(Clone, Debug, Default)]
pub struct RouteResolver {
    renames: HashMap<String, String>,
}

/// The parts of a dated identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatedName<'a> {
    pub section: &'a str,
    pub date: NaiveDate,
    pub slug: &'a str,
    pub extension: &'a str,
}

impl RouteResolver {
    pub fn new(renames: HashMap<String, String>) -> RouteResolver {
        RouteResolver { renames }
    }

    /// Adds a rename from a source section to an output section.
    pub fn with_rename(mut self, section: &str, output: &str) -> RouteResolver {
        self.renames.insert(section.to_owned(), output.to_owned());
        self
    }

    /// The output name for `section`.
    pub fn output_section<'a>(&'a self, section: &'a str) -> &'a str {
        self.renames
            .get(section)
            .map(String::as_str)
            .unwrap_or(section)
    }

    /// Resolves a dated identifier to its output path.
    pub fn resolve(&self, id: &Identifier) -> Result<String, RouteParseError> {
        let name = parse_dated(id)?;
        Ok(format!(
            "{}/{}/{}",
            self.output_section(name.section),
            name.slug,
            INDEX_FILE
        ))
    }

    /// Resolves an undated identifier `<section>/<name>.<ext>` to
    /// `<name>/index.html`. Used for standalone pages.
    pub fn resolve_page(&self, id: &Identifier) -> Result<String, RouteParseError> {
        let (_, file_name) = split_section(id)?;
        let (stem, _) = split_extension(id, file_name)?;
        Ok(format!("{}/{}", stem, INDEX_FILE))
    }

    /// `<outSection>/tags/<tag>/index.html`, with the tag slugified so it is
    /// safe to drop into a path.
    pub fn tag_listing(&self, section: &str, tag: &str) -> String {
        format!(
            "{}/tags/{}/{}",
            self.output_section(section),
            slug::slugify(tag),
            INDEX_FILE
        )
    }

    /// `<outSection>/index.html`.
    pub fn archive(&self, section: &str) -> String {
        format!("{}/{}", self.output_section(section), INDEX_FILE)
    }

    /// `<outSection>/atom.xml`.
    pub fn feed(&self, section: &str) -> String {
        format!("{}/atom.xml", self.output_section(section))
    }

    /// The home page, at the root of the output tree.
    pub fn home(&self) -> String {
        INDEX_FILE.to_owned()
    }

    /// `projects/index.html`.
    pub fn projects(&self) -> String {
        format!("projects/{}", INDEX_FILE)
    }
}

/// Splits a dated identifier into its parts. Every malformation is reported
/// explicitly rather than sliced around.
pub fn parse_dated(id: &Identifier) -> Result<DatedName<'_>, RouteParseError> {
    let (section, file_name) = split_section(id)?;
    let (stem, extension) = split_extension(id, file_name)?;

    let prefix = stem
        .get(..DATE_WIDTH)
        .ok_or_else(|| RouteParseError::new(id, ParseFailure::DatePrefix))?;
    let date = NaiveDate::parse_from_str(prefix, DATE_FORMAT)
        .map_err(|_| RouteParseError::new(id, ParseFailure::DatePrefix))?;
    // `parse_from_str` accepts unpadded fields, so insist on the exact width
    if !prefix.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    }) {
        return Err(RouteParseError::new(id, ParseFailure::DatePrefix));
    }

    let slug = match stem[DATE_WIDTH..].strip_prefix('-') {
        Some(slug) => slug,
        None => return Err(RouteParseError::new(id, ParseFailure::Separator)),
    };
    if slug.is_empty() {
        return Err(RouteParseError::new(id, ParseFailure::EmptySlug));
    }

    Ok(DatedName {
        section,
        date,
        slug,
        extension,
    })
}

fn split_section(id: &Identifier) -> Result<(&str, &str), RouteParseError> {
    match id.as_str().rsplit_once('/') {
        Some((section, file_name)) if !section.is_empty() => Ok((section, file_name)),
        _ => Err(RouteParseError::new(id, ParseFailure::Section)),
    }
}

fn split_extension<'a>(
    id: &Identifier,
    file_name: &'a str,
) -> Result<(&'a str, &'a str), RouteParseError> {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            Ok((stem, extension))
        }
        _ => Err(RouteParseError::new(id, ParseFailure::Extension)),
    }
}

/// Returned when an identifier does not follow the naming convention.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed identifier `{id}`: {failure}")]
pub struct RouteParseError {
    pub id: Identifier,
    pub failure: ParseFailure,
}

impl RouteParseError {
    fn new(id: &Identifier, failure: ParseFailure) -> RouteParseError {
        RouteParseError {
            id: id.clone(),
            failure,
        }
    }
}

/// What was wrong with a malformed identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseFailure {
    Section,
    Extension,
    DatePrefix,
    Separator,
    EmptySlug,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ParseFailure::Section => "missing `<section>/` prefix",
            ParseFailure::Extension => "missing file extension",
            ParseFailure::DatePrefix => "missing `YYYY-MM-DD` date prefix",
            ParseFailure::Separator => "missing `-` between date and slug",
            ParseFailure::EmptySlug => "empty slug",
        })
    }
}

/// The producer of an output path: a real item or a synthetic key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Item(Identifier),
    Tag(String),
    Archive,
    Feed,
    Home,
    Projects,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteKey::Item(id) => write!(f, "item `{}`", id),
            RouteKey::Tag(tag) => write!(f, "tag `{}`", tag),
            RouteKey::Archive => f.write_str("archive"),
            RouteKey::Feed => f.write_str("feed"),
            RouteKey::Home => f.write_str("home page"),
            RouteKey::Projects => f.write_str("project listing"),
        }
    }
}

/// Every output path of a build, keyed by its producer. Registering a key or
/// a path twice is an error: last-registration-wins would silently drop an
/// output.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<(RouteKey, String)>,
    by_key: HashMap<RouteKey, usize>,
    by_path: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> RouteTable {
        RouteTable::default()
    }

    pub fn register(&mut self, key: RouteKey, path: String) -> Result<(), Error> {
        if let Some(&existing) = self.by_key.get(&key) {
            return Err(Error::DuplicateRoute {
                key,
                path: self.routes[existing].1.clone(),
            });
        }
        if let Some(&existing) = self.by_path.get(&path) {
            return Err(Error::DuplicatePath {
                path,
                first: self.routes[existing].0.clone(),
                second: key,
            });
        }
        self.by_key.insert(key.clone(), self.routes.len());
        self.by_path.insert(path.clone(), self.routes.len());
        self.routes.push((key, path));
        Ok(())
    }

    pub fn get(&self, key: &RouteKey) -> Option<&str> {
        self.by_key
            .get(key)
            .map(|&position| self.routes[position].1.as_str())
    }

    /// Like [`RouteTable::get`] but treats a missing route as an error.
    pub fn path(&self, key: &RouteKey) -> Result<&str, Error> {
        self.get(key)
            .ok_or_else(|| Error::Unrouted(key.clone()))
    }

    pub fn item(&self, id: &Identifier) -> Result<&str, Error> {
        self.path(&RouteKey::Item(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &str)> {
        self.routes.iter().map(|(key, path)| (key, path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The URL path of an output path, rooted at the site root (e.g.
/// `blog/a/index.html` becomes `/blog/a/index.html`). Generated links use
/// this form; [`crate::canonical`] later makes them relative and drops the
/// `index.html`.
pub fn url_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Represents a failure in the route table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{key} was routed twice (first to `{path}`)")]
    DuplicateRoute { key: RouteKey, path: String },

    #[error("output path `{path}` claimed by both {first} and {second}")]
    DuplicatePath {
        path: String,
        first: RouteKey,
        second: RouteKey,
    },

    #[error("no route for {0}")]
    Unrouted(RouteKey),
}
