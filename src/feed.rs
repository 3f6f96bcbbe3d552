//! Support for creating Atom feeds from a list of posts.

use crate::canonical;
use crate::config::Author;
use crate::item::{ContentItem, Identifier};
use crate::render::Snapshots;
use crate::route::{self, RouteTable};
use crate::view::{item_date, OrderingError};
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::io::Write;
use url::Url;

/// The default number of entries in a feed.
pub const DEFAULT_FEED_SIZE: usize = 10;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: Url,
    /// The absolute URL of the feed document itself.
    pub feed_url: Url,
}

/// One syndicated post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: Identifier,
    pub title: String,
    pub date: NaiveDate,
    pub url: Url,
    /// The content-only snapshot of the post's body.
    pub description: String,
}

/// Builds at most `limit` entries from `items`, which must already be ordered
/// most recent first. Each description is the item's snapshot, never the
/// laid-out page.
pub fn entries(
    items: &[&ContentItem],
    snapshots: &Snapshots,
    routes: &RouteTable,
    site_root: &Url,
    limit: usize,
) -> Result<Vec<FeedEntry>> {
    let mut entries: Vec<FeedEntry> = Vec::with_capacity(limit.min(items.len()));
    for item in items.iter().take(limit) {
        let date = item_date(item)?;
        if let Some(previous) = entries.last() {
            if previous.date < date {
                return Err(Error::Unordered(item.id.clone()));
            }
        }
        let path = canonical::clean_index(routes.item(&item.id)?);
        entries.push(FeedEntry {
            id: item.id.clone(),
            title: item.title().unwrap_or(item.id.as_str()).to_owned(),
            date,
            url: site_root.join(&path)?,
            description: snapshots
                .get(&item.id)
                .cloned()
                .ok_or_else(|| Error::MissingSnapshot(item.id.clone()))?,
        });
    }
    Ok(entries)
}

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .fixed_offset()
}

/// Assembles the feed document. Its `updated` value is the most recent
/// entry's date, or the Unix epoch for an empty feed, so that the output
/// depends only on the content.
pub fn feed(config: FeedConfig, entries: &[FeedEntry]) -> Feed {
    let updated = match entries.first() {
        Some(entry) => midnight_utc(entry.date),
        None => DateTime::<Utc>::UNIX_EPOCH.fixed_offset(),
    };
    let authors = author_to_people(config.author);
    Feed {
        title: Text::plain(config.title),
        id: config.id,
        updated,
        authors: authors.clone(),
        links: vec![
            Link {
                href: config.home_page.to_string(),
                rel: "alternate".to_owned(),
                ..Default::default()
            },
            Link {
                href: config.feed_url.to_string(),
                rel: "self".to_owned(),
                ..Default::default()
            },
        ],
        entries: entries
            .iter()
            .map(|entry| feed_entry(entry, &authors))
            .collect(),
        ..Default::default()
    }
}

fn feed_entry(entry: &FeedEntry, authors: &[Person]) -> Entry {
    let date = midnight_utc(entry.date);
    Entry {
        id: entry.url.to_string(),
        title: Text::plain(entry.title.as_str()),
        updated: date,
        published: Some(date),
        authors: authors.to_vec(),
        links: vec![Link {
            href: entry.url.to_string(),
            rel: "alternate".to_owned(),
            ..Default::default()
        }],
        summary: Some(Text::html(entry.description.as_str())),
        ..Default::default()
    }
}

fn author_to_people(author: Option<Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![Person {
            name: author.name,
            email: author.email,
            ..Default::default()
        }],
        None => Vec::new(),
    }
}

/// Renders the feed document to a string.
pub fn to_string(feed: &Feed) -> Result<String> {
    let mut buf = Vec::new();
    write_feed(feed, &mut buf)?;
    String::from_utf8(buf).map_err(|err| Error::Encoding(err.to_string()))
}

/// Writes the feed document to a [`std::io::Write`].
pub fn write_feed<W: Write>(feed: &Feed, w: W) -> Result<()> {
    feed.write_to(w)?;
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    #[error(transparent)]
    Atom(#[from] AtomError),

    /// Returned when a post's date can't be parsed.
    #[error(transparent)]
    Date(#[from] OrderingError),

    /// Returned when the input isn't ordered most recent first.
    #[error("feed input is not ordered most recent first at `{0}`")]
    Unordered(Identifier),

    #[error("no snapshot for `{0}`")]
    MissingSnapshot(Identifier),

    #[error(transparent)]
    Route(#[from] route::Error),

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    #[error("feed is not valid UTF-8: {0}")]
    Encoding(String),
}
