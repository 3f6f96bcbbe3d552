//! Draft visibility. The decision to publish drafts is made once per build and
//! threaded through as a [`BuildMode`]; after [`filter`] runs, no later stage
//! looks at the `draft` field again.

use crate::item::ContentItem;
use tracing::info;

/// The environment variable which toggles draft inclusion.
pub const LOAD_DRAFTS: &str = "LOAD_DRAFTS";

/// Build-wide settings which affect which content is published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildMode {
    pub include_drafts: bool,
}

impl BuildMode {
    /// Reads [`LOAD_DRAFTS`]. Only the exact value `"true"` enables drafts;
    /// any other value, or no value, disables them.
    pub fn from_env() -> BuildMode {
        BuildMode::from_value(std::env::var(LOAD_DRAFTS).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> BuildMode {
        BuildMode {
            include_drafts: value == Some("true"),
        }
    }
}

/// An item is a draft iff its `draft` field is present and is exactly
/// `"true"`.
pub fn is_draft(item: &ContentItem) -> bool {
    item.field("draft") == Some("true")
}

/// Removes drafts unless `mode` includes them. Order is preserved.
pub fn filter(items: Vec<ContentItem>, mode: BuildMode) -> Vec<ContentItem> {
    if mode.include_drafts {
        return items;
    }
    let before = items.len();
    let published: Vec<ContentItem> =
        items.into_iter().filter(|item| !is_draft(item)).collect();
    if published.len() < before {
        info!(drafts = before - published.len(), "skipping drafts");
    }
    published
}
