//! The library code for the `skald` static blog generator. A build is a batch
//! transformation from a tree of source files to a tree of output files:
//!
//! 1. Loading content items from the source tree ([`crate::loader`], with
//!    frontmatter split off by [`crate::metadata`])
//! 2. Dropping drafts ([`crate::draft`])
//! 3. Indexing tags ([`crate::tag`]) and routing every output ([`crate::route`])
//! 4. Synthesizing views ([`crate::view`]) and rendering them through the
//!    theme's templates ([`crate::render`]), plus the Atom feed
//!    ([`crate::feed`])
//! 5. Rewriting links in the rendered HTML ([`crate::canonical`])
//!
//! The steps are wired together as a task graph ([`crate::graph`]) by
//! [`crate::build`], which also publishes the result to disk.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod canonical;
pub mod config;
pub mod context;
pub mod draft;
pub mod feed;
pub mod graph;
pub mod item;
pub mod loader;
pub mod metadata;
pub mod render;
pub mod route;
pub mod tag;
pub mod view;
