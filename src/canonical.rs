//! Post-processing of rendered link text. Two passes run over every HTML
//! output, strictly in this order:
//!
//! 1. [`relativize`] rewrites site-root-absolute links (`/blog/a/index.html`)
//!    relative to the output's own location (`../../blog/a/index.html`).
//! 2. [`canonicalize`] strips a trailing `index.html` from internal links
//!    (`../../blog/a/`).
//!
//! Only `href` and `src` attribute values are touched. Both passes are
//! idempotent, and each link is rewritten independently of every other.

use regex::Regex;
use std::sync::LazyLock;

const INDEX_FILE: &str = "index.html";

static LINK_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[\s<])(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("link attribute pattern is valid")
});

/// Decides whether a link points outside the site.
pub trait LinkClassifier: Sync {
    fn is_external(&self, link: &str) -> bool;
}

/// Treats a link as external when it has a URL scheme (`https:`, `mailto:`,
/// ...) or is protocol-relative (`//host/...`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemeClassifier;

impl LinkClassifier for SchemeClassifier {
    fn is_external(&self, link: &str) -> bool {
        link.starts_with("//") || url::Url::parse(link).is_ok()
    }
}

// Rewrites the value of every link attribute in `text` with `rewrite`,
// copying everything else through untouched.
fn rewrite_links<F>(text: &str, rewrite: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in LINK_ATTRIBUTE.captures_iter(text) {
        let value = match captures.get(1).or_else(|| captures.get(2)) {
            Some(value) => value,
            None => continue,
        };
        if let Some(rewritten) = rewrite(value.as_str()) {
            out.push_str(&text[last..value.start()]);
            out.push_str(&rewritten);
            last = value.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

/// The relative path from an output at `path` back to the site root: `.` for
/// a file at the root, otherwise one `..` per directory level.
pub fn to_site_root(path: &str) -> String {
    let depth = path.trim_start_matches('/').matches('/').count();
    if depth == 0 {
        ".".to_owned()
    } else {
        vec![".."; depth].join("/")
    }
}

/// Rewrites every site-root-absolute link in `text` relative to the output
/// at `path`. Protocol-relative links (`//host`) are left alone.
pub fn relativize(text: &str, path: &str) -> String {
    let root = to_site_root(path);
    rewrite_links(text, |link| {
        if link.starts_with('/') && !link.starts_with("//") {
            Some(format!("{}{}", root, link))
        } else {
            None
        }
    })
}

/// Strips a trailing `index.html` segment from a link's path, keeping the
/// separator before it along with any query or fragment. A bare `index.html`
/// becomes `./`. Links that don't end in an `index.html` segment are
/// returned unchanged.
pub fn clean_index(link: &str) -> String {
    let split = link.find(['?', '#']).unwrap_or(link.len());
    let (path, rest) = link.split_at(split);
    match path.strip_suffix(INDEX_FILE) {
        Some("") => format!("./{}", rest),
        Some(dir) if dir.ends_with('/') => format!("{}{}", dir, rest),
        _ => link.to_owned(),
    }
}

/// Strips `index.html` from every internal link in `text`. External links,
/// as decided by `classifier`, are never modified. Must run after
/// [`relativize`].
pub fn canonicalize(text: &str, classifier: &dyn LinkClassifier) -> String {
    rewrite_links(text, |link| {
        if classifier.is_external(link) {
            return None;
        }
        let cleaned = clean_index(link);
        if cleaned == link {
            None
        } else {
            Some(cleaned)
        }
    })
}

/// Both passes, in order.
pub fn process(text: &str, path: &str, classifier: &dyn LinkClassifier) -> String {
    canonicalize(&relativize(text, path), classifier)
}
