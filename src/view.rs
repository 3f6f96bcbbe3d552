//! Synthesizes the derived views of a build: per-tag listings, the blog
//! archive, the home index, and the project listing. Each view is assembled
//! from an ordered sub-list of the filtered items (or of the project records)
//! plus a few scalar fields; rendering is left to the view's
//! [`TemplateChain`]. Post and page views over actual items are built here
//! too, since they share the same per-item context.

use crate::context::{
    Context, Link, ListingContext, PostContext, ProjectContext, ProjectsContext, SiteContext,
};
use crate::item::{ContentItem, Identifier, Metadata};
use crate::render::{self, OutputFile, Renderer, Snapshots, TemplateChain};
use crate::route::{self, url_path, RouteKey, RouteTable};
use crate::tag::{Tag, TagIndex};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// How a view orders the items it lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOrder {
    /// Descending by the `date` field, ties kept in discovery order. Every
    /// item must have a parseable date.
    RecentFirst,

    /// The order the items were given in.
    AsGiven,
}

/// Parses an item's `date` field.
pub fn item_date(item: &ContentItem) -> std::result::Result<NaiveDate, OrderingError> {
    let raw = item.date().ok_or_else(|| OrderingError {
        id: item.id.clone(),
        value: None,
    })?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| OrderingError {
        id: item.id.clone(),
        value: Some(raw.to_owned()),
    })
}

/// Stable-sorts `items` most recent first. Fails on the first item without a
/// parseable date rather than guessing where it belongs.
pub fn recent_first<'a>(
    items: impl IntoIterator<Item = &'a ContentItem>,
) -> std::result::Result<Vec<&'a ContentItem>, OrderingError> {
    let mut dated = items
        .into_iter()
        .map(|item| Ok((item_date(item)?, item)))
        .collect::<std::result::Result<Vec<_>, OrderingError>>()?;
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dated.into_iter().map(|(_, item)| item).collect())
}

/// Applies `order` to `items`.
pub fn order<'a>(
    items: Vec<&'a ContentItem>,
    order: ListOrder,
) -> std::result::Result<Vec<&'a ContentItem>, OrderingError> {
    match order {
        ListOrder::RecentFirst => recent_first(items),
        ListOrder::AsGiven => Ok(items),
    }
}

/// A hand-authored project record.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ProjectRecord {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub repo: Option<String>,
}

/// A synthesized page: a virtual item, the identifiers it summarizes, and
/// how to render it.
#[derive(Clone, Debug)]
pub struct DerivedView {
    pub item: ContentItem,
    pub path: String,
    pub sources: Vec<Identifier>,
    pub templates: TemplateChain,
    pub context: Context,
}

/// A page for an actual item (a post or a standalone page).
#[derive(Clone, Debug)]
pub struct ItemView {
    pub id: Identifier,
    pub path: String,
    pub templates: TemplateChain,
    pub context: Context,
}

impl DerivedView {
    pub fn render(&self, renderer: &dyn Renderer, site: &SiteContext) -> render::Result<OutputFile> {
        debug!(
            view = %self.item.id,
            path = %self.path,
            sources = self.sources.len(),
            "rendering view"
        );
        Ok(OutputFile {
            path: self.path.clone(),
            contents: self.templates.render(renderer, &self.context, site)?,
        })
    }
}

impl ItemView {
    pub fn render(&self, renderer: &dyn Renderer, site: &SiteContext) -> render::Result<OutputFile> {
        Ok(OutputFile {
            path: self.path.clone(),
            contents: self.templates.render(renderer, &self.context, site)?,
        })
    }
}

/// Builds views over one blog section's filtered posts. Holds only shared
/// references to finalized tables.
pub struct ViewSynthesizer<'a> {
    posts: &'a [ContentItem],
    by_id: HashMap<&'a Identifier, &'a ContentItem>,
    tags: &'a TagIndex,
    routes: &'a RouteTable,
    snapshots: &'a Snapshots,
}

impl<'a> ViewSynthesizer<'a> {
    pub fn new(
        posts: &'a [ContentItem],
        tags: &'a TagIndex,
        routes: &'a RouteTable,
        snapshots: &'a Snapshots,
    ) -> ViewSynthesizer<'a> {
        ViewSynthesizer {
            posts,
            by_id: posts.iter().map(|item| (&item.id, item)).collect(),
            tags,
            routes,
            snapshots,
        }
    }

    fn tag_links(&self, names: &[String]) -> Vec<Link> {
        names
            .iter()
            .filter_map(|name| {
                self.tags.path_of(name).map(|path| Link {
                    title: name.clone(),
                    url: url_path(path),
                })
            })
            .collect()
    }

    fn all_tag_links(&self) -> Vec<Link> {
        self.tags
            .tags()
            .map(|tag| Link {
                title: tag.name.clone(),
                url: url_path(&tag.path),
            })
            .collect()
    }

    fn link(&self, item: &ContentItem) -> Result<Link> {
        Ok(Link {
            title: item.title().unwrap_or(item.id.as_str()).to_owned(),
            url: url_path(self.routes.item(&item.id)?),
        })
    }

    /// The context for one actual item. A missing or unparseable date is not
    /// an error here: the date fields are simply absent.
    pub fn post_context(&self, item: &ContentItem) -> Result<PostContext> {
        let date = item_date(item).ok();
        Ok(PostContext {
            title: item.title().map(str::to_owned),
            url: url_path(self.routes.item(&item.id)?),
            date: date.map(|d| d.format(DISPLAY_DATE_FORMAT).to_string()),
            datetime: date.map(|d| d.format(DATE_FORMAT).to_string()),
            body: self
                .snapshots
                .get(&item.id)
                .cloned()
                .ok_or_else(|| Error::MissingSnapshot(item.id.clone()))?,
            tags: self.tag_links(self.tags.tags_of(&item.id)),
            prev: None,
            next: None,
        })
    }

    /// One page per post, in recent-first order. `prev` links to the newer
    /// neighbour and `next` to the older one.
    pub fn post_pages(&self, templates: &TemplateChain) -> Result<Vec<ItemView>> {
        let ordered = recent_first(self.posts)?;
        let mut views = Vec::with_capacity(ordered.len());
        for (i, item) in ordered.iter().enumerate() {
            let mut context = self.post_context(item)?;
            if i > 0 {
                context.prev = Some(self.link(ordered[i - 1])?);
            }
            if let Some(next) = ordered.get(i + 1) {
                context.next = Some(self.link(next)?);
            }
            views.push(ItemView {
                id: item.id.clone(),
                path: self.routes.item(&item.id)?.to_owned(),
                templates: templates.clone(),
                context: Context::Post(context),
            });
        }
        Ok(views)
    }

    fn listing(
        &self,
        key: RouteKey,
        title: String,
        tag: Option<String>,
        items: Vec<&ContentItem>,
        templates: &TemplateChain,
        wrap: fn(ListingContext) -> Context,
    ) -> Result<DerivedView> {
        let path = self.routes.path(&key)?.to_owned();
        let posts = items
            .iter()
            .map(|item| self.post_context(item))
            .collect::<Result<Vec<_>>>()?;
        let mut metadata = Metadata::new();
        metadata.insert("title", title.as_str());
        Ok(DerivedView {
            item: ContentItem::synthesized(&path, metadata),
            sources: items.iter().map(|item| item.id.clone()).collect(),
            templates: templates.clone(),
            context: wrap(ListingContext {
                title,
                url: url_path(&path),
                tag,
                posts,
                tags: self.all_tag_links(),
            }),
            path,
        })
    }

    /// The listing for a single tag: every post in its bucket.
    pub fn tag_listing(
        &self,
        tag: &Tag,
        list_order: ListOrder,
        templates: &TemplateChain,
    ) -> Result<DerivedView> {
        let items = self
            .tags
            .items_tagged(&tag.name)
            .iter()
            .map(|id| {
                self.by_id
                    .get(id)
                    .copied()
                    .ok_or_else(|| Error::UnknownItem(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.listing(
            RouteKey::Tag(tag.name.clone()),
            format!("Posts tagged \"{}\"", tag.name),
            Some(tag.name.clone()),
            order(items, list_order)?,
            templates,
            Context::TagListing,
        )
    }

    /// One listing per tag, in tag discovery order.
    pub fn tag_listings(
        &self,
        list_order: ListOrder,
        templates: &TemplateChain,
    ) -> Result<Vec<DerivedView>> {
        self.tags
            .tags()
            .map(|tag| self.tag_listing(tag, list_order, templates))
            .collect()
    }

    /// Every post.
    pub fn archive(
        &self,
        title: &str,
        list_order: ListOrder,
        templates: &TemplateChain,
    ) -> Result<DerivedView> {
        self.listing(
            RouteKey::Archive,
            title.to_owned(),
            None,
            order(self.posts.iter().collect(), list_order)?,
            templates,
            Context::Index,
        )
    }

    /// The first `limit` posts.
    pub fn home(
        &self,
        title: &str,
        limit: usize,
        list_order: ListOrder,
        templates: &TemplateChain,
    ) -> Result<DerivedView> {
        let mut items = order(self.posts.iter().collect(), list_order)?;
        items.truncate(limit);
        self.listing(RouteKey::Home, title.to_owned(), None, items, templates, Context::Index)
    }
}

/// The project listing, in authored order. Independent of the post set.
pub fn projects(
    routes: &RouteTable,
    records: &[ProjectRecord],
    title: &str,
    templates: &TemplateChain,
) -> Result<DerivedView> {
    let path = routes.path(&RouteKey::Projects)?.to_owned();
    let mut metadata = Metadata::new();
    metadata.insert("title", title);
    Ok(DerivedView {
        item: ContentItem::synthesized(&path, metadata),
        sources: Vec::new(),
        templates: templates.clone(),
        context: Context::Projects(ProjectsContext {
            title: title.to_owned(),
            url: url_path(&path),
            projects: records
                .iter()
                .map(|record| ProjectContext {
                    name: record.name.clone(),
                    description: record.description.clone(),
                    url: record.url.clone(),
                    repo: record.repo.clone(),
                })
                .collect(),
        }),
        path,
    })
}

/// One page per standalone page item, in load order.
pub fn page_views(
    pages: &[ContentItem],
    routes: &RouteTable,
    snapshots: &Snapshots,
    templates: &TemplateChain,
) -> Result<Vec<ItemView>> {
    pages
        .iter()
        .map(|item| {
            let path = routes.item(&item.id)?.to_owned();
            let date = item_date(item).ok();
            Ok(ItemView {
                id: item.id.clone(),
                templates: templates.clone(),
                context: Context::Post(PostContext {
                    title: item.title().map(str::to_owned),
                    url: url_path(&path),
                    date: date.map(|d| d.format(DISPLAY_DATE_FORMAT).to_string()),
                    datetime: date.map(|d| d.format(DATE_FORMAT).to_string()),
                    body: snapshots
                        .get(&item.id)
                        .cloned()
                        .ok_or_else(|| Error::MissingSnapshot(item.id.clone()))?,
                    ..Default::default()
                }),
                path,
            })
        })
        .collect()
}

/// Returned when "recent first" ordering meets an item without a parseable
/// date.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot order `{id}`: {}", date_problem(.value))]
pub struct OrderingError {
    pub id: Identifier,
    /// The unparseable value, or `None` when the field is missing.
    pub value: Option<String>,
}

fn date_problem(value: &Option<String>) -> String {
    match value {
        None => "no `date` field".to_owned(),
        Some(value) => format!("`date` value `{}` is not a YYYY-MM-DD date", value),
    }
}

/// Represents the result of a view-synthesis operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to synthesize a view.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    Route(#[from] route::Error),

    #[error("no snapshot for `{0}`")]
    MissingSnapshot(Identifier),

    #[error("tag index refers to unknown item `{0}`")]
    UnknownItem(Identifier),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::snapshots;
    use crate::route::RouteResolver;

    fn post(id: &str, date: Option<&str>, tags: Option<&str>) -> ContentItem {
        let mut metadata = Metadata::new();
        metadata.insert("title", id);
        if let Some(date) = date {
            metadata.insert("date", date);
        }
        if let Some(tags) = tags {
            metadata.insert("tags", tags);
        }
        ContentItem::actual(Identifier::new(id), metadata, format!("body of {}", id))
    }

    struct Fixture {
        posts: Vec<ContentItem>,
        tags: TagIndex,
        routes: RouteTable,
        snapshots: Snapshots,
    }

    impl Fixture {
        fn new(posts: Vec<ContentItem>) -> Fixture {
            let resolver = RouteResolver::default().with_rename("posts", "blog");
            let tags =
                TagIndex::build(&posts, "tags", |t| resolver.tag_listing("posts", t)).unwrap();
            let mut routes = RouteTable::new();
            for item in &posts {
                routes
                    .register(RouteKey::Item(item.id.clone()), resolver.resolve(&item.id).unwrap())
                    .unwrap();
            }
            for tag in tags.tags() {
                routes
                    .register(RouteKey::Tag(tag.name.clone()), tag.path.clone())
                    .unwrap();
            }
            routes.register(RouteKey::Archive, resolver.archive("posts")).unwrap();
            routes.register(RouteKey::Home, resolver.home()).unwrap();
            routes.register(RouteKey::Projects, resolver.projects()).unwrap();
            let snapshots = snapshots(&posts);
            Fixture {
                posts,
                tags,
                routes,
                snapshots,
            }
        }

        fn synthesizer(&self) -> ViewSynthesizer<'_> {
            ViewSynthesizer::new(&self.posts, &self.tags, &self.routes, &self.snapshots)
        }
    }

    fn chain() -> TemplateChain {
        TemplateChain::new("archive", "default")
    }

    fn ids(items: &[&ContentItem]) -> Vec<String> {
        items.iter().map(|i| i.id.to_string()).collect()
    }

    fn listed(view: &DerivedView) -> Vec<&str> {
        view.sources.iter().map(Identifier::as_str).collect()
    }

    #[test]
    fn test_recent_first_is_stable() -> std::result::Result<(), OrderingError> {
        let items = vec![
            post("posts/2020-01-01-a.md", Some("2020-01-01"), None),
            post("posts/2020-03-01-b.md", Some("2020-03-01"), None),
            post("posts/2020-03-01-c.md", Some("2020-03-01"), None),
            post("posts/2020-02-01-d.md", Some("2020-02-01"), None),
        ];
        let ordered = recent_first(&items)?;
        assert_eq!(
            ids(&ordered),
            vec![
                "posts/2020-03-01-b.md",
                "posts/2020-03-01-c.md",
                "posts/2020-02-01-d.md",
                "posts/2020-01-01-a.md",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_recent_first_rejects_missing_date() {
        let items = vec![
            post("posts/2020-01-01-a.md", Some("2020-01-01"), None),
            post("posts/2020-01-02-b.md", None, None),
        ];
        let err = recent_first(&items).unwrap_err();
        assert_eq!(err.id.as_str(), "posts/2020-01-02-b.md");
        assert_eq!(err.value, None);
        assert_eq!(
            err.to_string(),
            "cannot order `posts/2020-01-02-b.md`: no `date` field"
        );
    }

    #[test]
    fn test_recent_first_rejects_unparseable_date() {
        let items = vec![post("posts/2020-01-01-a.md", Some("yesterday"), None)];
        let err = recent_first(&items).unwrap_err();
        assert_eq!(err.value.as_deref(), Some("yesterday"));
        assert_eq!(
            err.to_string(),
            "cannot order `posts/2020-01-01-a.md`: `date` value `yesterday` is not a YYYY-MM-DD date"
        );
    }

    #[test]
    fn test_as_given_skips_dates() -> std::result::Result<(), OrderingError> {
        let items = vec![post("b", None, None), post("a", None, None)];
        let ordered = order(items.iter().collect(), ListOrder::AsGiven)?;
        assert_eq!(ids(&ordered), vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn test_tag_listing_recent_first() -> Result<()> {
        let fixture = Fixture::new(vec![
            post("posts/2020-01-01-a.md", Some("2020-01-01"), Some("x")),
            post("posts/2020-01-03-b.md", Some("2020-01-03"), Some("x, y")),
            post("posts/2020-01-02-c.md", Some("2020-01-02"), Some("y")),
        ]);
        let views = fixture
            .synthesizer()
            .tag_listings(ListOrder::RecentFirst, &chain())?;
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].path, "blog/tags/x/index.html");
        assert_eq!(
            listed(&views[0]),
            vec!["posts/2020-01-03-b.md", "posts/2020-01-01-a.md"]
        );
        assert_eq!(
            listed(&views[1]),
            vec!["posts/2020-01-03-b.md", "posts/2020-01-02-c.md"]
        );
        assert!(views[0].item.id.is_placeholder());
        match &views[0].context {
            Context::TagListing(listing) => {
                assert_eq!(listing.tag.as_deref(), Some("x"));
                assert_eq!(listing.posts[0].url, "/blog/b/index.html");
            }
            other => panic!("wanted tag listing; found {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_archive_and_home() -> Result<()> {
        let fixture = Fixture::new(vec![
            post("posts/2020-01-01-a.md", Some("2020-01-01"), None),
            post("posts/2020-01-03-b.md", Some("2020-01-03"), None),
            post("posts/2020-01-02-c.md", Some("2020-01-02"), None),
        ]);
        let synthesizer = fixture.synthesizer();
        let archive = synthesizer.archive("Archive", ListOrder::RecentFirst, &chain())?;
        assert_eq!(archive.path, "blog/index.html");
        assert_eq!(
            listed(&archive),
            vec!["posts/2020-01-03-b.md", "posts/2020-01-02-c.md", "posts/2020-01-01-a.md"]
        );
        let home = synthesizer.home("Home", 2, ListOrder::RecentFirst, &chain())?;
        assert_eq!(home.path, "index.html");
        assert_eq!(listed(&home), vec!["posts/2020-01-03-b.md", "posts/2020-01-02-c.md"]);
        Ok(())
    }

    #[test]
    fn test_archive_fails_on_undated_post() {
        let fixture = Fixture::new(vec![post("posts/2020-01-01-a.md", None, None)]);
        let result = fixture
            .synthesizer()
            .archive("Archive", ListOrder::RecentFirst, &chain());
        assert!(matches!(result, Err(Error::Ordering(_))));
    }

    #[test]
    fn test_post_pages_neighbours() -> Result<()> {
        let fixture = Fixture::new(vec![
            post("posts/2020-01-01-a.md", Some("2020-01-01"), Some("x")),
            post("posts/2020-01-02-b.md", Some("2020-01-02"), None),
        ]);
        let pages = fixture
            .synthesizer()
            .post_pages(&TemplateChain::new("post", "default"))?;
        let contexts: Vec<&PostContext> = pages
            .iter()
            .map(|page| match &page.context {
                Context::Post(context) => context,
                other => panic!("wanted post; found {:?}", other),
            })
            .collect();
        assert_eq!(pages[0].path, "blog/b/index.html");
        assert_eq!(contexts[0].prev, None);
        assert_eq!(contexts[0].next.as_ref().map(|l| l.url.as_str()), Some("/blog/a/index.html"));
        assert_eq!(contexts[1].prev.as_ref().map(|l| l.url.as_str()), Some("/blog/b/index.html"));
        assert_eq!(contexts[1].next, None);
        assert_eq!(contexts[1].date.as_deref(), Some("January 1, 2020"));
        assert_eq!(contexts[1].tags[0].url, "/blog/tags/x/index.html");
        assert_eq!(contexts[1].body, "<p>body of posts/2020-01-01-a.md</p>\n");
        Ok(())
    }

    #[test]
    fn test_projects_keep_authored_order() -> Result<()> {
        let fixture = Fixture::new(Vec::new());
        let records = vec![
            ProjectRecord {
                name: "zeta".to_owned(),
                description: "last letter".to_owned(),
                url: "https://example.org/zeta".to_owned(),
                repo: None,
            },
            ProjectRecord {
                name: "alpha".to_owned(),
                description: "first letter".to_owned(),
                url: "https://example.org/alpha".to_owned(),
                repo: Some("https://git.example.org/alpha".to_owned()),
            },
        ];
        let view = projects(
            &fixture.routes,
            &records,
            "Projects",
            &TemplateChain::new("projects", "default"),
        )?;
        assert_eq!(view.path, "projects/index.html");
        match &view.context {
            Context::Projects(context) => {
                let names: Vec<&str> = context.projects.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["zeta", "alpha"]);
                assert_eq!(context.projects[0].repo, None);
            }
            other => panic!("wanted projects; found {:?}", other),
        }
        Ok(())
    }
}
