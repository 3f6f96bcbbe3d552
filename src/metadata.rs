//! Extracts [`Metadata`] from a source file's header block. Source files are
//! structured as follows:
//!
//! 1. Initial frontmatter fence (`---`)
//! 2. YAML frontmatter with fields such as `title`, `date`, `tags`, `draft`
//! 3. Terminal frontmatter fence (`---`)
//! 4. Body
//!
//! For example:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! tags: greet, meta
//! ---
//! # Hello
//!
//! World
//! ```

use crate::item::Metadata;
use serde_yaml::{Mapping, Value};

/// The collaborator responsible for splitting a raw source into metadata and
/// body. [`crate::loader::ContentLoader`] delegates to it for every item.
pub trait MetadataExtractor: Sync {
    fn extract(&self, raw: &str) -> Result<(Metadata, String)>;
}

/// Extracts YAML frontmatter delimited by `---` fences. A source without an
/// opening fence has empty metadata and is all body.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frontmatter;

const FENCE: &str = "---";

impl MetadataExtractor for Frontmatter {
    fn extract(&self, raw: &str) -> Result<(Metadata, String)> {
        let input = raw.trim_start_matches('\u{feff}');
        if !input.starts_with(FENCE) {
            return Ok((Metadata::new(), input.to_owned()));
        }
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let yaml = &input[yaml_start..yaml_stop];
        let metadata = if yaml.trim().is_empty() {
            Metadata::new()
        } else {
            to_metadata(serde_yaml::from_str(yaml)?)?
        };
        let body = input[body_start..].trim_start_matches(['\r', '\n']);
        Ok((metadata, body.to_owned()))
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    // the closing fence must sit on its own line
    let rest = &input[FENCE.len()..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if offset > 0 && line.trim_end() == FENCE {
            return Ok((
                FENCE.len(),                                // yaml_start
                FENCE.len() + offset,                       // yaml_stop
                FENCE.len() + offset + line.len(),          // body_start
            ));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

fn to_metadata(mapping: Mapping) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(key) => key,
            other => return Err(Error::NonStringKey(format!("{:?}", other))),
        };
        if let Some(value) = scalar(&key, value)? {
            metadata.insert(key, value);
        }
    }
    Ok(metadata)
}

// Flattens a YAML value into the string form every metadata consumer expects.
// Sequences are joined with the tag delimiter so `tags: [a, b]` and
// `tags: a, b` are equivalent. `null` means the field is absent.
fn scalar(key: &str, value: Value) -> Result<Option<String>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s),
        Value::Sequence(values) => {
            let mut pieces = Vec::with_capacity(values.len());
            for value in values {
                if let Some(piece) = scalar(key, value)? {
                    pieces.push(piece);
                }
            }
            Some(pieces.join(", "))
        }
        Value::Mapping(_) | Value::Tagged(_) => {
            return Err(Error::UnsupportedValue(key.to_owned()))
        }
    })
}

/// Represents the result of a metadata-extraction operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error extracting metadata from a source file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the opening fence was found but the terminal one is
    /// missing.
    #[error("missing closing `---`")]
    MissingEndFence,

    /// Returned when the frontmatter isn't a valid YAML mapping.
    #[error(transparent)]
    DeserializeYaml(#[from] serde_yaml::Error),

    #[error("frontmatter key must be a string, found {0}")]
    NonStringKey(String),

    /// Returned for nested mappings, which have no string form.
    #[error("frontmatter field `{0}` must be a scalar or a list")]
    UnsupportedValue(String),
}
