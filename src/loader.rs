//! Enumerates source content and turns each match into an actual
//! [`ContentItem`]. Sources are addressed through the [`ContentSource`] trait
//! so the same loading logic runs over a directory on disk ([`FsSource`]) or an
//! in-memory tree ([`MemorySource`]).

use crate::item::{ContentItem, Identifier};
use crate::metadata::{self, MetadataExtractor};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A tree of content addressed by [`Identifier`]s.
pub trait ContentSource: Sync {
    /// Lists the identifiers that `selector` could match. Sources may return
    /// more than that; the loader filters and sorts them itself.
    fn identifiers(&self, selector: &Selector) -> Result<Vec<Identifier>>;

    /// Reads the raw contents for `id`.
    fn read(&self, id: &Identifier) -> Result<String>;
}

/// A [`ContentSource`] rooted at a directory. Identifiers are paths relative
/// to the root, with `/` separators. Only the directory a selector is
/// anchored in is walked, and excluded directories (such as the build's own
/// output) are never entered.
pub struct FsSource {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> FsSource {
        FsSource {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Skips `path` and everything under it.
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> FsSource {
        self.excluded.push(path.into());
        self
    }
}

impl ContentSource for FsSource {
    fn identifiers(&self, selector: &Selector) -> Result<Vec<Identifier>> {
        let start = self.root.join(selector.base());
        if !start.is_dir() {
            debug!(directory = %start.display(), "no content directory");
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let walker = WalkDir::new(&start)
            .into_iter()
            .filter_entry(|entry| !self.excluded.iter().any(|path| entry.path() == path));
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix shouldn't fail since `root` is always an ancestor
            // of the walked entries
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                match relative.to_str() {
                    Some(relative) => ids.push(Identifier::new(relative)),
                    // no selector can match a name that isn't UTF-8
                    None => {
                        warn!(path = %entry.path().display(), "skipping non-UTF-8 file name")
                    }
                }
            }
        }
        Ok(ids)
    }

    fn read(&self, id: &Identifier) -> Result<String> {
        let path = self.root.join(id.as_str());
        std::fs::read_to_string(&path).map_err(|err| Error::Read { path, err })
    }
}

/// A [`ContentSource`] held entirely in memory. Entries keep their insertion
/// order and may repeat an identifier (after normalization), which the loader
/// reports as a duplicate.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    entries: Vec<(Identifier, String)>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn with(mut self, id: &str, contents: &str) -> MemorySource {
        self.entries.push((Identifier::new(id), contents.to_owned()));
        self
    }
}

impl ContentSource for MemorySource {
    fn identifiers(&self, _: &Selector) -> Result<Vec<Identifier>> {
        Ok(self.entries.iter().map(|(id, _)| id.clone()).collect())
    }

    fn read(&self, id: &Identifier) -> Result<String> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| Error::NotFound(id.clone()))
    }
}

/// A glob-like pattern over identifiers (e.g., `posts/*.markdown`). `*` does
/// not cross `/`; use `**` for that.
#[derive(Clone, Debug)]
pub struct Selector {
    pattern: Pattern,
}

impl Selector {
    pub fn new(pattern: &str) -> Result<Selector> {
        Ok(Selector {
            pattern: Pattern::new(pattern).map_err(|err| Error::InvalidSelector {
                pattern: pattern.to_owned(),
                err,
            })?,
        })
    }

    pub fn matches(&self, id: &Identifier) -> bool {
        self.pattern.matches_with(
            id.as_str(),
            MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: true,
            },
        )
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// The directory every match lies under: the pattern's leading
    /// components up to the first one with a wildcard, e.g. `posts` for
    /// `posts/*.md` and the empty string for `**/*.md`.
    pub fn base(&self) -> &str {
        let pattern = self.as_str();
        let mut end = 0;
        for (offset, _) in pattern.match_indices('/') {
            if pattern[..offset].contains(['*', '?', '[']) {
                break;
            }
            end = offset;
        }
        &pattern[..end]
    }
}

/// Loads [`ContentItem`]s from a [`ContentSource`], delegating metadata
/// extraction to a [`MetadataExtractor`]. A loader remembers every identifier
/// it has produced so that two selectors (or two spellings of one source)
/// resolving to the same identifier fail the build.
pub struct ContentLoader<'a> {
    source: &'a dyn ContentSource,
    extractor: &'a dyn MetadataExtractor,
    seen: HashSet<Identifier>,
}

impl<'a> ContentLoader<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        extractor: &'a dyn MetadataExtractor,
    ) -> ContentLoader<'a> {
        ContentLoader {
            source,
            extractor,
            seen: HashSet::new(),
        }
    }

    /// Returns one item per identifier matching `selector`, ordered by
    /// identifier.
    pub fn load(&mut self, selector: &Selector) -> Result<Vec<ContentItem>> {
        let mut ids: Vec<Identifier> = self
            .source
            .identifiers(selector)?
            .into_iter()
            .filter(|id| selector.matches(id))
            .collect();
        ids.sort();

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.seen.insert(id.clone()) {
                return Err(Error::DuplicateIdentifier(id));
            }
            let raw = self.source.read(&id)?;
            let (metadata, body) =
                self.extractor
                    .extract(&raw)
                    .map_err(|err| Error::Metadata {
                        id: id.clone(),
                        err,
                    })?;
            items.push(ContentItem::actual(id, metadata, body));
        }
        debug!(selector = selector.as_str(), count = items.len(), "loaded items");
        Ok(items)
    }
}

/// Represents the result of a loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to load content. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when two matches resolve to the same identifier.
    #[error("duplicate identifier `{0}`")]
    DuplicateIdentifier(Identifier),

    #[error("reading `{}`: {err}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("no content for identifier `{0}`")]
    NotFound(Identifier),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("parsing metadata for `{id}`: {err}")]
    Metadata {
        id: Identifier,
        #[source]
        err: metadata::Error,
    },

    #[error("invalid selector `{pattern}`: {err}")]
    InvalidSelector {
        pattern: String,
        #[source]
        err: glob::PatternError,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::Frontmatter;

    fn post(title: &str) -> String {
        format!("---\ntitle: {}\ndate: 2020-01-01\n---\nbody", title)
    }

    #[test]
    fn test_load_in_identifier_order() -> Result<()> {
        let source = MemorySource::new()
            .with("posts/2020-01-02-b.md", &post("B"))
            .with("posts/2020-01-01-a.md", &post("A"))
            .with("pages/about.md", &post("About"));
        let mut loader = ContentLoader::new(&source, &Frontmatter);
        let items = loader.load(&Selector::new("posts/*")?)?;
        let titles: Vec<_> = items.iter().map(|i| i.title().unwrap()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn test_selector_does_not_cross_directories() -> Result<()> {
        let selector = Selector::new("posts/*")?;
        assert!(selector.matches(&Identifier::new("posts/a.md")));
        assert!(!selector.matches(&Identifier::new("posts/nested/a.md")));
        Ok(())
    }

    #[test]
    fn test_selector_base() -> Result<()> {
        assert_eq!(Selector::new("posts/*")?.base(), "posts");
        assert_eq!(Selector::new("blog/posts/*.md")?.base(), "blog/posts");
        assert_eq!(Selector::new("blog/[a-z]*/*.md")?.base(), "blog");
        assert_eq!(Selector::new("pages/about.md")?.base(), "pages");
        assert_eq!(Selector::new("**/*.md")?.base(), "");
        assert_eq!(Selector::new("*.md")?.base(), "");
        Ok(())
    }

    #[test]
    fn test_missing_field_is_absent() -> Result<()> {
        let source = MemorySource::new().with("posts/a.md", "---\ntitle: A\n---\n");
        let items = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("posts/*")?)?;
        assert_eq!(items[0].field("tags"), None);
        Ok(())
    }

    #[test]
    fn test_duplicate_identifier_within_selector() -> Result<()> {
        let source = MemorySource::new()
            .with("posts/a.md", &post("A"))
            .with("./posts/a.md", &post("A again"));
        let result = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("posts/*")?);
        assert!(matches!(result, Err(Error::DuplicateIdentifier(_))));
        Ok(())
    }

    #[test]
    fn test_duplicate_identifier_across_selectors() -> Result<()> {
        let source = MemorySource::new().with("posts/a.md", &post("A"));
        let mut loader = ContentLoader::new(&source, &Frontmatter);
        loader.load(&Selector::new("posts/*")?)?;
        let result = loader.load(&Selector::new("posts/*.md")?);
        match result {
            Err(Error::DuplicateIdentifier(id)) => {
                assert_eq!(id.as_str(), "posts/a.md")
            }
            other => panic!("wanted duplicate identifier; found {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_metadata_error_is_annotated() -> Result<()> {
        let source = MemorySource::new().with("posts/a.md", "---\ntitle: A\n");
        let result = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("posts/*")?);
        assert!(matches!(result, Err(Error::Metadata { .. })));
        Ok(())
    }

    #[test]
    fn test_fs_source() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|err| Error::Read {
            path: PathBuf::from("tempdir"),
            err,
        })?;
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::write(dir.path().join("posts/2020-01-01-a.md"), post("A")).unwrap();
        let source = FsSource::new(dir.path());
        let items = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("posts/*.md")?)?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "posts/2020-01-01-a.md");
        Ok(())
    }

    #[test]
    fn test_fs_source_skips_missing_directory() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(dir.path());
        let items = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("pages/*")?)?;
        assert!(items.is_empty());
        Ok(())
    }

    #[test]
    fn test_fs_source_skips_excluded_directory() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::create_dir_all(dir.path().join("_site/posts")).unwrap();
        std::fs::write(dir.path().join("posts/2020-01-01-a.md"), post("A")).unwrap();
        std::fs::write(dir.path().join("_site/posts/old.md"), post("Old")).unwrap();
        let source = FsSource::new(dir.path()).excluding(dir.path().join("_site"));
        let items = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("**/*.md")?)?;
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["posts/2020-01-01-a.md"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_source_tolerates_non_utf8_names() -> Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::create_dir_all(dir.path().join("_site")).unwrap();
        std::fs::write(dir.path().join("posts/2020-01-01-a.md"), post("A")).unwrap();
        std::fs::write(dir.path().join("_site").join(OsStr::from_bytes(b"caf\xE9.jpg")), "")
            .unwrap();
        std::fs::write(dir.path().join("posts").join(OsStr::from_bytes(b"caf\xE9.md")), "")
            .unwrap();

        let source = FsSource::new(dir.path());
        let items = ContentLoader::new(&source, &Frontmatter)
            .load(&Selector::new("posts/*")?)?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "posts/2020-01-01-a.md");
        Ok(())
    }
}
