//! # Content Desk
//!
//! A local web front end for a static site's content folders. Browse the
//! folder tree, look at the images in each folder, edit the folder's Markdown
//! metadata documents, upload new images, and rebuild the site, all from a
//! browser pointed at the machine that holds the content.
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────────┐
//!   HTTP ──────▶│   server     │──────────────────────────┐
//!               └──────┬───────┘                          │
//!                      │ every path goes through          │
//!               ┌──────▼───────┐                          │
//!               │   sandbox    │                          │
//!               └──────┬───────┘                          │
//!      ┌───────────────┼────────────────┐                 │
//! ┌────▼────┐    ┌─────▼─────┐    ┌─────▼────┐     ┌──────▼─────┐
//! │ listing │    │ documents │    │  upload  │     │   deploy   │
//! └─────────┘    └─────┬─────┘    └──────────┘     └────────────┘
//!                ┌─────▼───────┐                   docker / local
//!                │ frontmatter │                   build command
//!                └─────────────┘
//! ```
//!
//! The content tree on disk is the only state. Nothing is cached between
//! requests; every page reflects the filesystem at request time.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sandbox`] | Confines every user-supplied path to the content root |
//! | [`listing`] | Sorted subfolder and image listings, recursive walk for `check` |
//! | [`frontmatter`] | Tolerant `title` / `description` extraction from Markdown documents |
//! | [`documents`] | `_index.md` / `index.md` read and write with a one-generation `.bak` |
//! | [`upload`] | Filename sanitization, extension allow-list, collision-safe naming |
//! | [`deploy`] | Site rebuild through ordered docker/local build strategies |
//! | [`render`] | Maud HTML pages |
//! | [`server`] | Axum router, handlers, error pages |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`output`] | CLI output for `check` and `build` |
//!
//! # Design Decisions
//!
//! ## Canonicalize, Then Compare
//!
//! Paths are checked after symlinks and `..` are resolved, never by string
//! inspection. A path that cannot be resolved does not exist, and is treated
//! exactly like one that escapes: both are a 404.
//!
//! ## Raw Text Is the Source of Truth
//!
//! The front-matter parser only understands `title` and `description`. It is
//! used for display and nothing else. The editor always loads and saves the
//! document's raw text, so keys the parser does not know survive every edit.
//!
//! ## Builds Never Fail the Request
//!
//! Whatever happens during a build (no docker, no container, a crashing build
//! command, a hung build) the Deploy request completes with a redirect that
//! carries the outcome and the tail of the build output.

pub mod config;
pub mod deploy;
pub mod documents;
pub mod frontmatter;
pub mod listing;
pub mod output;
pub mod render;
pub mod sandbox;
pub mod server;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
