//! Project configuration. A project is a directory holding a `skald.yaml`
//! file, a `theme/` directory with its own `theme.yaml`, the content sections
//! and optionally a static asset directory.

use crate::feed::DEFAULT_FEED_SIZE;
use crate::render::TemplateSet;
use crate::view::ProjectRecord;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

const PROJECT_FILE: &str = "skald.yaml";
const THEME_DIRECTORY: &str = "theme";
const THEME_FILE: &str = "theme.yaml";
const DEFAULT_OUTPUT_DIRECTORY: &str = "_site";

fn find_project_file(dir: &Path) -> Result<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(PROJECT_FILE))
        .find(|path| path.exists())
        .ok_or_else(|| {
            anyhow!(
                "Could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            )
        })
}

/// The site author, credited in the feed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The dated blog section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlogSection {
    /// The source section name, e.g. `posts`.
    pub section: String,

    /// The output section name, e.g. `blog`.
    pub output: String,

    /// Which identifiers belong to the section.
    pub selector: String,
}

impl Default for BlogSection {
    fn default() -> Self {
        BlogSection {
            section: "posts".to_owned(),
            output: "blog".to_owned(),
            selector: "posts/*".to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(5)
    }
}

#[derive(Deserialize)]
struct FeedSize(usize);
impl Default for FeedSize {
    fn default() -> Self {
        FeedSize(DEFAULT_FEED_SIZE)
    }
}

fn default_pages() -> String {
    "pages/*".to_owned()
}

fn default_tag_field() -> String {
    "tags".to_owned()
}

fn default_static_directory() -> PathBuf {
    PathBuf::from("static")
}

#[derive(Deserialize)]
struct Project {
    title: String,
    site_root: Url,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default)]
    blog: BlogSection,

    #[serde(default = "default_pages")]
    pages: String,

    /// A YAML file listing project records, relative to the project root.
    #[serde(default)]
    projects: Option<PathBuf>,

    #[serde(default)]
    home_page_size: PageSize,

    #[serde(default)]
    feed_size: FeedSize,

    #[serde(default = "default_tag_field")]
    tag_field: String,

    #[serde(default = "default_static_directory")]
    static_directory: PathBuf,
}

/// Everything a build needs to know about a project.
#[derive(Clone, Debug)]
pub struct Config {
    pub project_root: PathBuf,
    pub title: String,

    /// The absolute URL the site is served from. Always ends with `/`.
    pub site_root: Url,
    pub author: Option<Author>,
    pub blog: BlogSection,

    /// The selector for standalone pages.
    pub pages: String,

    /// `None` when the project has no project listing.
    pub projects: Option<Vec<ProjectRecord>>,
    pub home_page_size: usize,
    pub feed_size: usize,

    /// The metadata field holding an item's tags.
    pub tag_field: String,
    pub static_source_directory: PathBuf,
    pub theme_directory: PathBuf,
    pub templates: TemplateSet,
    pub output_directory: PathBuf,
}

impl Config {
    /// Finds `skald.yaml` in `dir` or the nearest parent directory that has
    /// one, and loads it. A relative `dir` is taken from the current
    /// directory. Outputs go to `output_directory`, or to `_site` under the
    /// project root if none is given.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Resolving project directory `{}`", dir.display()))?;
        let path = find_project_file(&dir)?;
        Config::from_project_file(&path, output_directory)
            .with_context(|| format!("Loading configuration from `{}`", path.display()))
    }

    /// Loads the project file at `path` along with its theme and project
    /// records.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let project: Project = read_yaml(path, "project")?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{}'",
                path.display()
            )
        })?;

        let theme_directory = project_root.join(THEME_DIRECTORY);
        let templates: TemplateSet = read_yaml(&theme_directory.join(THEME_FILE), "theme")?;

        let projects = match &project.projects {
            Some(relative) => Some(read_yaml::<Vec<ProjectRecord>>(
                &project_root.join(relative),
                "projects",
            )?),
            None => None,
        };

        Ok(Config {
            project_root: project_root.to_owned(),
            title: project.title,
            site_root: with_trailing_slash(project.site_root),
            author: project.author,
            blog: project.blog,
            pages: project.pages,
            projects,
            home_page_size: project.home_page_size.0,
            feed_size: project.feed_size.0,
            tag_field: project.tag_field,
            static_source_directory: project_root.join(project.static_directory),
            theme_directory,
            templates,
            output_directory: match output_directory {
                Some(dir) => std::path::absolute(dir).with_context(|| {
                    format!("Resolving output directory `{}`", dir.display())
                })?,
                None => project_root.join(DEFAULT_OUTPUT_DIRECTORY),
            },
        })
    }
}

// `Url::join` replaces the last segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn read_yaml<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| anyhow!("Opening {} file `{}`: {}", kind, path.display(), e))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("Parsing {} file `{}`", kind, path.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    const THEME: &str = "\
default: default.html
post: post.html
page: page.html
archive: archive.html
tag: tag.html
home: home.html
projects: projects.html
";

    fn project(contents: &str) -> Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), contents)?;
        fs::create_dir(dir.path().join(THEME_DIRECTORY))?;
        fs::write(dir.path().join(THEME_DIRECTORY).join(THEME_FILE), THEME)?;
        Ok(dir)
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = project("title: My Blog\nsite_root: https://example.org/~me\n")?;
        let config = Config::from_directory(dir.path(), None)?;
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.site_root.as_str(), "https://example.org/~me/");
        assert_eq!(config.blog, BlogSection::default());
        assert_eq!(config.pages, "pages/*");
        assert_eq!(config.home_page_size, 5);
        assert_eq!(config.feed_size, 10);
        assert_eq!(config.tag_field, "tags");
        assert_eq!(config.projects, None);
        assert_eq!(config.author, None);
        assert_eq!(config.output_directory, dir.path().join("_site"));
        assert_eq!(config.static_source_directory, dir.path().join("static"));
        assert_eq!(config.templates.post, PathBuf::from("post.html"));
        Ok(())
    }

    #[test]
    fn test_found_from_nested_directory() -> Result<()> {
        let dir = project(
            "\
title: Blog
site_root: https://example.org/
author:
  name: Someone
blog:
  section: articles
  output: writing
  selector: articles/*.md
feed_size: 3
projects: projects.yaml
",
        )?;
        fs::write(
            dir.path().join("projects.yaml"),
            "- name: skald\n  description: a blog engine\n  url: https://example.org/skald\n",
        )?;
        let nested = dir.path().join("articles").join("drafts");
        fs::create_dir_all(&nested)?;

        let output = dir.path().join("out");
        let config = Config::from_directory(&nested, Some(&output))?;
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.output_directory, output);
        assert_eq!(config.blog.output, "writing");
        assert_eq!(config.blog.selector, "articles/*.md");
        assert_eq!(config.feed_size, 3);
        assert_eq!(
            config.author,
            Some(Author {
                name: "Someone".to_owned(),
                email: None,
            })
        );
        let projects = config.projects.unwrap_or_default();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].repo, None);
        Ok(())
    }

    #[test]
    fn test_missing_theme() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "title: Blog\nsite_root: https://example.org/\n",
        )?;
        assert!(Config::from_directory(dir.path(), None).is_err());
        Ok(())
    }

    #[test]
    fn test_found_from_current_directory() -> Result<()> {
        let dir = project("title: Blog\nsite_root: https://example.org/\n")?;
        let nested = dir.path().join("posts");
        fs::create_dir(&nested)?;

        let previous = std::env::current_dir()?;
        std::env::set_current_dir(&nested)?;
        let result = Config::from_directory(Path::new("."), None);
        std::env::set_current_dir(previous)?;

        let config = result?;
        let root = dir.path().canonicalize()?;
        assert_eq!(config.project_root, root);
        assert_eq!(config.output_directory, root.join("_site"));
        Ok(())
    }
}
