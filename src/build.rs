//! Exports the [`build_site`] function which stitches together the high-level
//! steps of a build. [`render_site`] runs the pipeline as a [`TaskGraph`]:
//!
//! ```text
//! load -> filter -> tags ------> routes -> posts, tag-listings, archive, home
//!                \-> snapshots -----------> pages, feed, projects
//! ```
//!
//! The result is a list of [`OutputFile`]s held in memory. [`build_site`]
//! renders from the project directory on disk and publishes the outputs,
//! along with the static assets, by swapping a fully written staging
//! directory into place.

use crate::canonical::{self, SchemeClassifier};
use crate::config::Config;
use crate::context::SiteContext;
use crate::draft::{self, BuildMode};
use crate::feed::{self, FeedConfig};
use crate::graph::{GraphError, TaskGraph, Upstream};
use crate::item::ContentItem;
use crate::loader::{self, ContentLoader, ContentSource, FsSource, Selector};
use crate::metadata::Frontmatter;
use crate::render::{self, snapshots, OutputFile, Renderer, Snapshots, TemplateChain, Theme};
use crate::route::{self, url_path, RouteKey, RouteParseError, RouteResolver, RouteTable};
use crate::tag::{self, TagIndex};
use crate::view::{self, DerivedView, ItemView, ListOrder, OrderingError, ViewSynthesizer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const ARCHIVE_TITLE: &str = "Archive";
const PROJECTS_TITLE: &str = "Projects";
const LAYOUT_TEMPLATE: &str = "default";

/// The tasks whose artifacts are output files, in the order their outputs
/// are collected.
const OUTPUT_TASKS: &[&str] = &[
    "posts",
    "pages",
    "tag-listings",
    "archive",
    "home",
    "projects",
    "feed",
];

/// Published content, by role.
struct Corpus {
    posts: Vec<ContentItem>,
    pages: Vec<ContentItem>,
}

/// The value a build task produces.
enum Artifact {
    Corpus(Corpus),
    Tags(TagIndex),
    Routes(RouteTable),
    Snapshots(Snapshots),
    Outputs(Vec<OutputFile>),
}

impl Artifact {
    fn corpus(&self) -> Result<&Corpus> {
        match self {
            Artifact::Corpus(corpus) => Ok(corpus),
            _ => Err(Error::Artifact("corpus")),
        }
    }

    fn tags(&self) -> Result<&TagIndex> {
        match self {
            Artifact::Tags(tags) => Ok(tags),
            _ => Err(Error::Artifact("tag index")),
        }
    }

    fn routes(&self) -> Result<&RouteTable> {
        match self {
            Artifact::Routes(routes) => Ok(routes),
            _ => Err(Error::Artifact("route table")),
        }
    }

    fn snapshots(&self) -> Result<&Snapshots> {
        match self {
            Artifact::Snapshots(snapshots) => Ok(snapshots),
            _ => Err(Error::Artifact("snapshot table")),
        }
    }
}

/// A synthesizer over the filtered posts and the tables a view task depends
/// on.
fn view_synthesizer<'u>(up: &Upstream<'u, Artifact>) -> Result<ViewSynthesizer<'u>> {
    Ok(ViewSynthesizer::new(
        &up.get("filter")?.corpus()?.posts,
        up.get("tags")?.tags()?,
        up.get("routes")?.routes()?,
        up.get("snapshots")?.snapshots()?,
    ))
}

fn chain(role: &str) -> TemplateChain {
    TemplateChain::new(role, LAYOUT_TEMPLATE)
}

fn render_items(
    views: &[ItemView],
    renderer: &dyn Renderer,
    site: &SiteContext,
) -> Result<Vec<OutputFile>> {
    Ok(views
        .par_iter()
        .map(|view| view.render(renderer, site))
        .collect::<render::Result<Vec<_>>>()?)
}

fn render_derived(
    views: &[DerivedView],
    renderer: &dyn Renderer,
    site: &SiteContext,
) -> Result<Vec<OutputFile>> {
    Ok(views
        .par_iter()
        .map(|view| view.render(renderer, site))
        .collect::<render::Result<Vec<_>>>()?)
}

fn load(config: &Config, source: &dyn ContentSource) -> Result<Corpus> {
    let extractor = Frontmatter;
    let mut loader = ContentLoader::new(source, &extractor);
    let posts = loader.load(&Selector::new(&config.blog.selector)?)?;
    let pages = loader.load(&Selector::new(&config.pages)?)?;
    info!(posts = posts.len(), pages = pages.len(), "loaded content");
    Ok(Corpus { posts, pages })
}

fn register_routes(
    config: &Config,
    resolver: &RouteResolver,
    corpus: &Corpus,
    tags: &TagIndex,
) -> Result<RouteTable> {
    let section = config.blog.section.as_str();
    let mut table = RouteTable::new();
    for post in &corpus.posts {
        table.register(RouteKey::Item(post.id.clone()), resolver.resolve(&post.id)?)?;
    }
    for page in &corpus.pages {
        table.register(
            RouteKey::Item(page.id.clone()),
            resolver.resolve_page(&page.id)?,
        )?;
    }
    for tag in tags.tags() {
        table.register(RouteKey::Tag(tag.name.clone()), tag.path.clone())?;
    }
    table.register(RouteKey::Archive, resolver.archive(section))?;
    table.register(RouteKey::Feed, resolver.feed(section))?;
    table.register(RouteKey::Home, resolver.home())?;
    if config.projects.is_some() {
        table.register(RouteKey::Projects, resolver.projects())?;
    }
    debug!(routes = table.len(), "registered routes");
    Ok(table)
}

fn build_feed(
    config: &Config,
    corpus: &Corpus,
    routes: &RouteTable,
    snapshots: &Snapshots,
) -> Result<OutputFile> {
    let ordered = view::recent_first(&corpus.posts)?;
    let path = routes.path(&RouteKey::Feed)?;
    let entries = feed::entries(
        &ordered,
        snapshots,
        routes,
        &config.site_root,
        config.feed_size,
    )?;
    let document = feed::feed(
        FeedConfig {
            title: config.title.clone(),
            id: config.site_root.to_string(),
            author: config.author.clone(),
            home_page: config.site_root.clone(),
            feed_url: config.site_root.join(path)?,
        },
        &entries,
    );
    Ok(OutputFile {
        path: path.to_owned(),
        contents: feed::to_string(&document)?,
    })
}

/// Renders the whole site from `source` without touching the disk. The
/// result is sorted by output path; HTML outputs have had their links made
/// relative and canonicalized.
pub fn render_site(
    config: &Config,
    source: &dyn ContentSource,
    renderer: &dyn Renderer,
    mode: BuildMode,
) -> Result<Vec<OutputFile>> {
    let section = config.blog.section.as_str();
    let resolver = RouteResolver::default().with_rename(section, &config.blog.output);
    let site = SiteContext {
        title: config.title.clone(),
        home: url_path(&resolver.home()),
        archive: url_path(&resolver.archive(section)),
        feed: url_path(&resolver.feed(section)),
        projects: config
            .projects
            .as_ref()
            .map(|_| url_path(&resolver.projects())),
    };
    let (resolver, site) = (&resolver, &site);

    let mut graph: TaskGraph<'_, Artifact, Error> = TaskGraph::new();
    graph.add("load", &[], |_| Ok(Artifact::Corpus(load(config, source)?)))?;
    graph.add("filter", &["load"], |up| {
        let corpus = up.get("load")?.corpus()?;
        Ok(Artifact::Corpus(Corpus {
            posts: draft::filter(corpus.posts.clone(), mode),
            pages: draft::filter(corpus.pages.clone(), mode),
        }))
    })?;
    graph.add("tags", &["filter"], |up| {
        let corpus = up.get("filter")?.corpus()?;
        let tags = TagIndex::build(&corpus.posts, &config.tag_field, |tag| {
            resolver.tag_listing(section, tag)
        })?;
        info!(tags = tags.len(), "indexed tags");
        Ok(Artifact::Tags(tags))
    })?;
    graph.add("routes", &["filter", "tags"], |up| {
        let corpus = up.get("filter")?.corpus()?;
        let tags = up.get("tags")?.tags()?;
        Ok(Artifact::Routes(register_routes(
            config, resolver, corpus, tags,
        )?))
    })?;
    graph.add("snapshots", &["filter"], |up| {
        let corpus = up.get("filter")?.corpus()?;
        let mut table = snapshots(&corpus.posts);
        table.extend(snapshots(&corpus.pages));
        Ok(Artifact::Snapshots(table))
    })?;

    const VIEW_DEPS: &[&str] = &["filter", "tags", "routes", "snapshots"];
    graph.add("posts", VIEW_DEPS, |up| {
        let synthesizer = view_synthesizer(up)?;
        let views = synthesizer.post_pages(&chain("post"))?;
        Ok(Artifact::Outputs(render_items(&views, renderer, site)?))
    })?;
    graph.add("tag-listings", VIEW_DEPS, |up| {
        let synthesizer = view_synthesizer(up)?;
        let views = synthesizer.tag_listings(ListOrder::RecentFirst, &chain("tag"))?;
        Ok(Artifact::Outputs(render_derived(&views, renderer, site)?))
    })?;
    graph.add("archive", VIEW_DEPS, |up| {
        let synthesizer = view_synthesizer(up)?;
        let view = synthesizer.archive(ARCHIVE_TITLE, ListOrder::RecentFirst, &chain("archive"))?;
        Ok(Artifact::Outputs(vec![view.render(renderer, site)?]))
    })?;
    graph.add("home", VIEW_DEPS, |up| {
        let synthesizer = view_synthesizer(up)?;
        let view = synthesizer.home(
            &config.title,
            config.home_page_size,
            ListOrder::RecentFirst,
            &chain("home"),
        )?;
        Ok(Artifact::Outputs(vec![view.render(renderer, site)?]))
    })?;
    graph.add("pages", &["filter", "routes", "snapshots"], |up| {
        let views = view::page_views(
            &up.get("filter")?.corpus()?.pages,
            up.get("routes")?.routes()?,
            up.get("snapshots")?.snapshots()?,
            &chain("page"),
        )?;
        Ok(Artifact::Outputs(render_items(&views, renderer, site)?))
    })?;
    graph.add("projects", &["routes"], |up| {
        let records = match &config.projects {
            Some(records) => records,
            None => return Ok(Artifact::Outputs(Vec::new())),
        };
        let view = view::projects(
            up.get("routes")?.routes()?,
            records,
            PROJECTS_TITLE,
            &chain("projects"),
        )?;
        Ok(Artifact::Outputs(vec![view.render(renderer, site)?]))
    })?;
    graph.add("feed", &["filter", "routes", "snapshots"], |up| {
        let file = build_feed(
            config,
            up.get("filter")?.corpus()?,
            up.get("routes")?.routes()?,
            up.get("snapshots")?.snapshots()?,
        )?;
        Ok(Artifact::Outputs(vec![file]))
    })?;

    let mut artifacts = graph.run()?;
    let mut outputs = Vec::new();
    for name in OUTPUT_TASKS {
        match artifacts.remove(*name) {
            Some(Artifact::Outputs(files)) => outputs.extend(files),
            _ => return Err(Error::Artifact("output list")),
        }
    }

    let classifier = SchemeClassifier;
    outputs
        .par_iter_mut()
        .filter(|file| file.is_html())
        .for_each(|file| file.contents = canonical::process(&file.contents, &file.path, &classifier));
    outputs.sort_by(|a, b| a.path.cmp(&b.path));
    info!(outputs = outputs.len(), "rendered site");
    Ok(outputs)
}

/// Builds the site described by `config`: loads the theme, renders the
/// content under the project root, and publishes the outputs and static
/// assets to the output directory. If anything fails, the previous output
/// directory is left as it was.
pub fn build_site(config: &Config, mode: BuildMode) -> Result<()> {
    let theme = Theme::load(&config.theme_directory, &config.templates)?;
    let source =
        FsSource::new(config.project_root.clone()).excluding(config.output_directory.clone());
    let outputs = render_site(config, &source, &theme, mode)?;
    publish(
        &outputs,
        &config.static_source_directory,
        &config.output_directory,
    )
}

// A hidden directory next to `dir`, e.g. `_site` -> `.skald-_site.staging`.
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.with_file_name(format!(".skald-{}.{}", name, suffix))
}

/// Writes `outputs` and copies the static assets into a staging directory,
/// then swaps it in for `output_directory`.
pub fn publish(outputs: &[OutputFile], static_directory: &Path, output_directory: &Path) -> Result<()> {
    let staging = sibling(output_directory, "staging");
    rmdir(&staging)?;
    create_dir(&staging)?;

    outputs
        .par_iter()
        .map(|file| write_output(&staging, file))
        .collect::<Result<()>>()?;
    if static_directory.is_dir() {
        let copied = copy_dir(static_directory, &staging)?;
        debug!(files = copied, "copied static assets");
    }

    let previous = sibling(output_directory, "previous");
    rmdir(&previous)?;
    if output_directory.exists() {
        rename(output_directory, &previous)?;
    }
    rename(&staging, output_directory)?;
    rmdir(&previous)?;
    info!(
        directory = %output_directory.display(),
        files = outputs.len(),
        "published site"
    );
    Ok(())
}

fn write_output(root: &Path, file: &OutputFile) -> Result<()> {
    let path = root.join(&file.path);
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    std::fs::write(&path, &file.contents).map_err(|err| Error::Write { path, err })
}

// Copies the contents of `src` into `dst`, refusing to overwrite anything
// already there. Returns the number of files copied.
fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else if target.exists() {
            return Err(Error::StaticCollision(target));
        } else {
            std::fs::copy(entry.path(), &target).map_err(|err| Error::Write {
                path: target.clone(),
                err,
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Write {
        path: dir.to_owned(),
        err,
    })
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|err| Error::Publish {
        path: from.to_owned(),
        err,
    })
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for errors enumerating or reading content.
    #[error(transparent)]
    Load(#[from] loader::Error),

    /// Returned when an identifier doesn't follow the naming convention.
    #[error(transparent)]
    RouteParse(#[from] RouteParseError),

    /// Returned when a tag can't be given a listing page.
    #[error(transparent)]
    Tag(#[from] tag::Error),

    /// Returned when two producers claim the same route or output path.
    #[error(transparent)]
    Route(#[from] route::Error),

    /// Returned when posts can't be ordered by date.
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    View(#[from] view::Error),

    /// Returned for errors loading or executing templates.
    #[error(transparent)]
    Render(#[from] render::Error),

    /// Returned for errors creating the feed.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("task produced something other than a {0}")]
    Artifact(&'static str),

    /// Returned for I/O problems while cleaning output directories.
    #[error("cleaning directory '{}': {err}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("writing '{}': {err}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("moving '{}' into place: {err}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a static asset would overwrite a rendered output.
    #[error("static asset '{}' collides with a rendered output", .0.display())]
    StaticCollision(PathBuf),

    #[error("walking static directory: {0}")]
    Walk(#[from] walkdir::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::BlogSection;
    use crate::loader::MemorySource;
    use crate::render::TemplateSet;
    use crate::view::ProjectRecord;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn config(projects: Option<Vec<ProjectRecord>>) -> Config {
        Config {
            project_root: PathBuf::from("."),
            title: "Blog".to_owned(),
            site_root: Url::parse("https://example.org/").unwrap(),
            author: None,
            blog: BlogSection::default(),
            pages: "pages/*".to_owned(),
            projects,
            home_page_size: 5,
            feed_size: 10,
            tag_field: "tags".to_owned(),
            static_source_directory: PathBuf::from("static"),
            theme_directory: PathBuf::from("theme"),
            templates: TemplateSet {
                default: PathBuf::from("default.html"),
                post: PathBuf::from("post.html"),
                page: PathBuf::from("page.html"),
                archive: PathBuf::from("archive.html"),
                tag: PathBuf::from("tag.html"),
                home: PathBuf::from("home.html"),
                projects: PathBuf::from("projects.html"),
            },
            output_directory: PathBuf::from("_site"),
        }
    }

    fn theme() -> Theme {
        Theme::default()
            .with("default", "<html>{{ .content }}</html>")
            .with(
                "post",
                "<h1>{{ .title }}</h1><a href=\"{{ .site.archive }}\">archive</a>",
            )
            .with("page", "<h1>{{ .title }}</h1>")
            .with("archive", "{{ range .posts }}{{ .title }};{{ end }}")
            .with("tag", "{{ .tag }}:{{ range .posts }}{{ .title }};{{ end }}")
            .with(
                "home",
                "{{ range .posts }}<a href=\"{{ .url }}\">{{ .title }}</a>{{ end }}",
            )
            .with("projects", "{{ range .projects }}{{ .name }};{{ end }}")
    }

    fn post(title: &str, date: &str, extra: &str) -> String {
        format!(
            "---\ntitle: {}\ndate: {}\ntags: x\n{}---\nHello from {}\n",
            title, date, extra, title
        )
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with("posts/2020-01-01-a.md", &post("First", "2020-01-01", ""))
            .with(
                "posts/2020-01-02-b.md",
                &post("Second", "2020-01-02", "draft: true\n"),
            )
            .with("posts/2020-01-03-c.md", &post("Third", "2020-01-03", ""))
    }

    fn find<'a>(outputs: &'a [OutputFile], path: &str) -> &'a str {
        outputs
            .iter()
            .find(|file| file.path == path)
            .map(|file| file.contents.as_str())
            .unwrap_or_else(|| panic!("no output at `{}`", path))
    }

    #[test]
    fn test_drafts_are_excluded_everywhere() -> Result<()> {
        let outputs = render_site(&config(None), &source(), &theme(), BuildMode::default())?;
        let paths: Vec<&str> = outputs.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "blog/a/index.html",
                "blog/atom.xml",
                "blog/c/index.html",
                "blog/index.html",
                "blog/tags/x/index.html",
                "index.html",
            ]
        );
        assert_eq!(find(&outputs, "blog/index.html"), "<html>Third;First;</html>");
        assert_eq!(
            find(&outputs, "blog/tags/x/index.html"),
            "<html>x:Third;First;</html>"
        );
        let feed = find(&outputs, "blog/atom.xml");
        assert!(feed.contains("https://example.org/blog/c/"));
        assert!(!feed.contains("Second"));
        Ok(())
    }

    #[test]
    fn test_drafts_included_on_request() -> Result<()> {
        let mode = BuildMode {
            include_drafts: true,
        };
        let outputs = render_site(&config(None), &source(), &theme(), mode)?;
        assert_eq!(
            find(&outputs, "blog/index.html"),
            "<html>Third;Second;First;</html>"
        );
        Ok(())
    }

    #[test]
    fn test_links_are_relative_and_canonical() -> Result<()> {
        let outputs = render_site(&config(None), &source(), &theme(), BuildMode::default())?;
        assert_eq!(
            find(&outputs, "blog/a/index.html"),
            "<html><h1>First</h1><a href=\"../../blog/\">archive</a></html>"
        );
        assert_eq!(
            find(&outputs, "index.html"),
            "<html><a href=\"./blog/c/\">Third</a><a href=\"./blog/a/\">First</a></html>"
        );
        Ok(())
    }

    #[test]
    fn test_pages_and_projects() -> Result<()> {
        let source = source().with("pages/about.md", "---\ntitle: About\n---\nMe\n");
        let projects = vec![ProjectRecord {
            name: "skald".to_owned(),
            description: "a blog engine".to_owned(),
            url: "https://example.org/skald".to_owned(),
            repo: None,
        }];
        let outputs = render_site(
            &config(Some(projects)),
            &source,
            &theme(),
            BuildMode::default(),
        )?;
        assert_eq!(find(&outputs, "about/index.html"), "<html><h1>About</h1></html>");
        assert_eq!(find(&outputs, "projects/index.html"), "<html>skald;</html>");
        Ok(())
    }

    #[test]
    fn test_colliding_output_paths_fail() {
        let source = source().with("pages/blog.md", "---\ntitle: Blog\n---\n");
        let result = render_site(&config(None), &source, &theme(), BuildMode::default());
        assert!(matches!(
            result,
            Err(Error::Route(route::Error::DuplicatePath { .. }))
        ));
    }

    #[test]
    fn test_malformed_post_name_fails() {
        let source = source().with("posts/hello.md", &post("Hello", "2020-01-04", ""));
        let result = render_site(&config(None), &source, &theme(), BuildMode::default());
        assert!(matches!(result, Err(Error::RouteParse(_))));
    }

    #[test]
    fn test_tag_spellings_share_a_listing() -> Result<()> {
        let source = MemorySource::new()
            .with(
                "posts/2020-01-01-a.md",
                "---\ntitle: First\ndate: 2020-01-01\ntags: macOS, C\n---\n",
            )
            .with(
                "posts/2020-01-02-b.md",
                "---\ntitle: Second\ndate: 2020-01-02\ntags: MacOS, C++\n---\n",
            );
        let outputs = render_site(&config(None), &source, &theme(), BuildMode::default())?;
        assert_eq!(
            find(&outputs, "blog/tags/macos/index.html"),
            "<html>macOS:Second;First;</html>"
        );
        assert_eq!(
            find(&outputs, "blog/tags/c/index.html"),
            "<html>C:Second;First;</html>"
        );
        Ok(())
    }

    #[test]
    fn test_tag_without_slug_fails() {
        let source = source().with(
            "posts/2020-01-04-d.md",
            "---\ntitle: Fourth\ndate: 2020-01-04\ntags: ???\n---\n",
        );
        let result = render_site(&config(None), &source, &theme(), BuildMode::default());
        assert!(matches!(
            result,
            Err(Error::Tag(tag::Error::EmptySlug { .. }))
        ));
    }

    #[test]
    fn test_publish_replaces_previous_output() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|err| Error::Write {
            path: PathBuf::from("tempdir"),
            err,
        })?;
        let output = dir.path().join("site");
        let static_dir = dir.path().join("static");
        create_dir(&static_dir.join("css"))?;
        std::fs::write(static_dir.join("css").join("main.css"), "body {}").map_err(|err| {
            Error::Write {
                path: static_dir.clone(),
                err,
            }
        })?;

        create_dir(&output)?;
        std::fs::write(output.join("stale.html"), "old").map_err(|err| Error::Write {
            path: output.clone(),
            err,
        })?;

        let outputs = vec![OutputFile {
            path: "blog/a/index.html".to_owned(),
            contents: "new".to_owned(),
        }];
        publish(&outputs, &static_dir, &output)?;
        assert!(!output.join("stale.html").exists());
        assert!(output.join("css").join("main.css").exists());
        assert_eq!(
            std::fs::read_to_string(output.join("blog/a/index.html")).ok(),
            Some("new".to_owned())
        );
        assert!(!sibling(&output, "staging").exists());
        assert!(!sibling(&output, "previous").exists());
        Ok(())
    }

    #[test]
    fn test_static_collision_fails() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|err| Error::Write {
            path: PathBuf::from("tempdir"),
            err,
        })?;
        let static_dir = dir.path().join("static");
        create_dir(&static_dir)?;
        std::fs::write(static_dir.join("index.html"), "static").map_err(|err| Error::Write {
            path: static_dir.clone(),
            err,
        })?;
        let outputs = vec![OutputFile {
            path: "index.html".to_owned(),
            contents: "rendered".to_owned(),
        }];
        let output = dir.path().join("site");
        assert!(matches!(
            publish(&outputs, &static_dir, &output),
            Err(Error::StaticCollision(_))
        ));
        assert!(!output.exists());
        Ok(())
    }
}
