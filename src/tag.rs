//! Defines the [`TagIndex`], which groups items by the tags listed in their
//! metadata. The index is built once from the filtered item set and is never
//! mutated afterwards.

use crate::item::{ContentItem, Identifier};
use std::collections::HashMap;
use tracing::debug;

/// The delimiter between tags in a tag field.
pub const TAG_DELIMITER: char = ',';

/// A tag together with the output path of its listing page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    /// The tag's name, as written in metadata (trimmed).
    pub name: String,

    /// The output path of the tag's listing page, e.g.
    /// `blog/tags/{tag}/index.html`.
    pub path: String,
}

/// Splits a tag field into its trimmed, non-empty pieces. A tag repeated
/// within one field is kept once.
pub fn split_tags(field: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for piece in field.split(TAG_DELIMITER) {
        let piece = piece.trim();
        if !piece.is_empty() && !tags.iter().any(|t| t == piece) {
            tags.push(piece.to_owned());
        }
    }
    tags
}

/// The key a tag is indexed under: its slug, so that spellings which would
/// share a listing page (`macOS` and `MacOS`, `C` and `C++`) share a bucket.
pub fn tag_key(tag: &str) -> String {
    slug::slugify(tag)
}

/// A bidirectional mapping between tags and the identifiers of the items
/// carrying them, plus each tag's listing path. Tags are matched by
/// [`tag_key`] and keep the first spelling seen.
#[derive(Clone, Debug, Default)]
pub struct TagIndex {
    /// Tags in first-discovery order with their buckets.
    tags: Vec<(Tag, Vec<Identifier>)>,
    positions: HashMap<String, usize>,
    by_item: HashMap<Identifier, Vec<String>>,
}

impl TagIndex {
    /// Indexes `items` by the tags found in `field`. `path_for` maps each
    /// distinct tag to the output path of its listing page. A tag with no
    /// characters usable in a path is an error.
    pub fn build<F>(items: &[ContentItem], field: &str, path_for: F) -> Result<TagIndex>
    where
        F: Fn(&str) -> String,
    {
        let mut index = TagIndex::default();
        for item in items {
            let written = match item.field(field) {
                Some(value) => split_tags(value),
                None => continue,
            };
            let mut tags: Vec<String> = Vec::with_capacity(written.len());
            for tag in &written {
                let key = tag_key(tag);
                if key.is_empty() {
                    return Err(Error::EmptySlug {
                        tag: tag.clone(),
                        id: item.id.clone(),
                    });
                }
                let position = match index.positions.get(&key) {
                    Some(&position) => position,
                    None => {
                        index.tags.push((
                            Tag {
                                name: tag.clone(),
                                path: path_for(tag),
                            },
                            Vec::new(),
                        ));
                        index.positions.insert(key, index.tags.len() - 1);
                        index.tags.len() - 1
                    }
                };
                let (tag, bucket) = &mut index.tags[position];
                // `C, C++` on one item lands in one bucket once
                if bucket.last() != Some(&item.id) {
                    bucket.push(item.id.clone());
                    tags.push(tag.name.clone());
                }
            }
            index.by_item.insert(item.id.clone(), tags);
        }
        debug!(tags = index.tags.len(), "built tag index");
        Ok(index)
    }

    /// The identifiers of the items tagged `tag`, in discovery order. Unknown
    /// tags have an empty bucket.
    pub fn items_tagged(&self, tag: &str) -> &[Identifier] {
        match self.positions.get(&tag_key(tag)) {
            Some(&position) => &self.tags[position].1,
            None => &[],
        }
    }

    /// The tags carried by the item `id`, in the order they were written,
    /// under the names the index knows them by.
    pub fn tags_of(&self, id: &Identifier) -> &[String] {
        self.by_item.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The listing path for `tag`, if the tag is known.
    pub fn path_of(&self, tag: &str) -> Option<&str> {
        self.positions
            .get(&tag_key(tag))
            .map(|&position| self.tags[position].0.path.as_str())
    }

    /// Every distinct tag in first-discovery order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().map(|(tag, _)| tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem indexing tags.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Returned when a tag has no characters that survive slugification, so
    /// it has no listing path.
    #[error("tag `{tag}` on `{id}` has no characters usable in a path")]
    EmptySlug { tag: String, id: Identifier },
}
