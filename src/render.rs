//! HTML pages of the web front end.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time templating, so every
//! interpolated folder name, filename, and metadata value is escaped. The only
//! unescaped content is Markdown bodies, rendered with pulldown-cmark.
//!
//! ## Pages
//!
//! - **Index** (`/`): top-level folders plus the Deploy button
//! - **Folder** (`/folder/{path}`): subfolders, image grid, section and leaf
//!   metadata, upload form
//! - **Edit** (`/folder/{path}/edit`, `/folder/{path}/edit-index`): raw
//!   document text in a textarea
//! - **Error**: status line and a link home
//!
//! The stylesheet is embedded at compile time from `static/style.css`.

use crate::documents::DocumentKind;
use crate::frontmatter::MetadataDocument;
use crate::listing::{Folder, ImageFile};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};

const CSS: &str = include_str!("../static/style.css");

/// Result of the last Deploy, carried back through the redirect query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBanner {
    pub success: bool,
    pub message: String,
}

impl BuildBanner {
    /// Build a banner from the `build` and `msg` query parameters. `None` when
    /// no build result is present.
    pub fn from_query(build: Option<&str>, msg: Option<&str>) -> Option<Self> {
        let success = match build? {
            "ok" => true,
            "err" => false,
            _ => return None,
        };
        Some(Self {
            success,
            message: msg.unwrap_or_default().to_string(),
        })
    }
}

/// Everything the folder page shows.
#[derive(Debug, Clone, Default)]
pub struct FolderView {
    /// Root-relative path, `/`-separated.
    pub rel_path: String,
    pub subfolders: Vec<Folder>,
    pub images: Vec<ImageFile>,
    pub section: Option<MetadataDocument>,
    pub leaf: Option<MetadataDocument>,
}

impl FolderView {
    /// Last path segment, used when no document provides a title.
    pub fn name(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }

    /// Section title, then leaf title, then the folder name.
    pub fn display_title(&self) -> &str {
        [&self.section, &self.leaf]
            .into_iter()
            .flatten()
            .filter_map(|doc| doc.title.as_deref())
            .find(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.name())
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// Percent-encode a root-relative path for use in a URL path, keeping `/`.
pub fn encode_path(rel: &str) -> String {
    let mut out = String::with_capacity(rel.len());
    for byte in rel.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

pub fn folder_href(rel: &str) -> String {
    format!("/folder/{}", encode_path(rel))
}

pub fn content_href(rel: &str) -> String {
    format!("/content/{}", encode_path(rel))
}

pub fn edit_href(rel: &str, kind: DocumentKind) -> String {
    format!("{}/{}", folder_href(rel), kind.edit_segment())
}

fn upload_href(rel: &str) -> String {
    format!("{}/upload", folder_href(rel))
}

/// Render Markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

/// `1.5 MiB` style sizes for the image grid.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " · content-desk" }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Breadcrumb from the root down to `rel_path`, last segment unlinked.
fn breadcrumb(rel_path: &str) -> Markup {
    let segments: Vec<&str> = rel_path.split('/').filter(|s| !s.is_empty()).collect();
    html! {
        nav.breadcrumb {
            a href="/" { "Content" }
            @for (idx, segment) in segments.iter().enumerate() {
                " › "
                @if idx + 1 == segments.len() {
                    span.current { (segment) }
                } @else {
                    a href=(folder_href(&segments[..=idx].join("/"))) { (segment) }
                }
            }
        }
    }
}

fn site_header(rel_path: &str) -> Markup {
    html! {
        header.site-header {
            (breadcrumb(rel_path))
            (deploy_form())
        }
    }
}

fn deploy_form() -> Markup {
    html! {
        form.deploy method="post" action="/deploy" {
            button type="submit" { "Deploy" }
        }
    }
}

fn build_banner(banner: Option<&BuildBanner>) -> Markup {
    html! {
        @if let Some(b) = banner {
            @let class = if b.success { "banner ok" } else { "banner err" };
            section class=(class) {
                strong { @if b.success { "Build succeeded" } @else { "Build failed" } }
                @if !b.message.is_empty() {
                    pre { (b.message) }
                }
            }
        }
    }
}

fn folder_list(folders: &[Folder]) -> Markup {
    html! {
        @if folders.is_empty() {
            p.empty { "No subfolders." }
        } @else {
            ul.folder-list {
                @for folder in folders {
                    li { a href=(folder_href(&folder.rel_path)) { (folder.name) "/" } }
                }
            }
        }
    }
}

fn image_grid(images: &[ImageFile]) -> Markup {
    html! {
        @if images.is_empty() {
            p.empty { "No images." }
        } @else {
            div.image-grid {
                @for image in images {
                    figure.image-card {
                        a href=(content_href(&image.rel_path)) {
                            img src=(content_href(&image.rel_path)) alt=(image.name) loading="lazy";
                        }
                        figcaption {
                            span.image-name { (image.name) }
                            span.image-meta {
                                @if let Some((w, h)) = image.dimensions {
                                    (w) "×" (h) " · "
                                }
                                (format_size(image.size_bytes))
                            }
                        }
                    }
                }
            }
        }
    }
}

/// One metadata document panel, with an edit (or create) link.
fn metadata_panel(rel_path: &str, kind: DocumentKind, doc: Option<&MetadataDocument>) -> Markup {
    html! {
        section.metadata {
            header {
                h2 { (kind.label()) " " code { (kind.file_name()) } }
                a.edit-link href=(edit_href(rel_path, kind)) {
                    @if doc.is_some() { "Edit" } @else { "Create" }
                }
            }
            @match doc {
                Some(doc) => {
                    dl {
                        dt { "Title" }
                        dd { (doc.title.as_deref().unwrap_or("")) }
                        dt { "Description" }
                        dd { (doc.description.as_deref().unwrap_or("")) }
                    }
                    @if !doc.body.is_empty() {
                        article.body { (PreEscaped(markdown_to_html(&doc.body))) }
                    }
                }
                None => {
                    p.empty { "Not present." }
                }
            }
        }
    }
}

fn upload_form(rel_path: &str) -> Markup {
    html! {
        form.upload method="post" action=(upload_href(rel_path)) enctype="multipart/form-data" {
            input type="file" name="file" accept="image/*" required;
            button type="submit" { "Upload" }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the index page with the top-level folders
pub fn render_index(folders: &[Folder], banner: Option<&BuildBanner>) -> Markup {
    let content = html! {
        (site_header(""))
        main.index-page {
            (build_banner(banner))
            h1 { "Content" }
            (folder_list(folders))
        }
    };
    base_document("Content", None, content)
}

/// Renders a folder with its documents, subfolders, and images
pub fn render_folder(view: &FolderView, banner: Option<&BuildBanner>) -> Markup {
    let content = html! {
        (site_header(&view.rel_path))
        main.folder-page {
            (build_banner(banner))
            h1 { (view.display_title()) }
            div.metadata-panels {
                (metadata_panel(&view.rel_path, DocumentKind::Section, view.section.as_ref()))
                (metadata_panel(&view.rel_path, DocumentKind::Leaf, view.leaf.as_ref()))
            }
            h2 { "Folders" }
            (folder_list(&view.subfolders))
            h2 { "Images" }
            (image_grid(&view.images))
            (upload_form(&view.rel_path))
        }
    };
    base_document(view.display_title(), None, content)
}

/// Renders the raw-text editor for one of a folder's documents
pub fn render_edit(rel_path: &str, kind: DocumentKind, raw: &str) -> Markup {
    let title = format!("Edit {}", kind.file_name());
    let content = html! {
        (site_header(rel_path))
        main.edit-page {
            h1 { (kind.label()) " " code { (kind.file_name()) } }
            form.editor method="post" action=(edit_href(rel_path, kind)) {
                // A newline right after <textarea> is dropped by parsers
                textarea name="content" rows="30" spellcheck="false" { "\n" (raw) }
                div.actions {
                    button type="submit" { "Save" }
                    a href=(folder_href(rel_path)) { "Cancel" }
                }
            }
        }
    };
    base_document(&title, Some("editing"), content)
}

/// Renders an error page
pub fn render_error(status: u16, reason: &str, detail: &str) -> Markup {
    let title = format!("{} {}", status, reason);
    let content = html! {
        main.error-page {
            h1 { (title) }
            @if !detail.is_empty() {
                p { (detail) }
            }
            p { a href="/" { "Back to content" } }
        }
    };
    base_document(&title, Some("error"), content)
}

// ============================================================================
// Tests
// ============================================================================
