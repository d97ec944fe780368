//! Folder and image enumeration.
//!
//! Listings are one level deep and sorted by name. A folder's children are split
//! into subdirectories and image files; anything else (Markdown documents,
//! backups, sidecars) is not listed. Image membership is decided by extension
//! alone: the allow-set in [`IMAGE_EXTENSIONS`], compared case-insensitively.
//!
//! Children that resolve outside the content root (symlinks pointing
//! elsewhere) are left out of both listings, so nothing is read through them.
//!
//! [`walk`] is the recursive variant used by the `check` command.

use crate::documents::DocumentKind;
use crate::sandbox::{ContentRoot, SandboxError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Folder not found: {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Extensions accepted as images, lowercase, without the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"];

/// A subdirectory of a listed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Directory name.
    pub name: String,
    /// Path relative to the content root, `/`-separated.
    pub rel_path: String,
}

/// An image file inside a listed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// Path relative to the content root, `/`-separated.
    pub rel_path: String,
    pub size_bytes: u64,
    /// Pixel dimensions when the header could be read.
    pub dimensions: Option<(u32, u32)>,
}

/// Whether a filename carries an allowed image extension.
pub fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Immediate subdirectories of `folder`, sorted by name.
///
/// `rel_prefix` is the folder's own root-relative path (empty for the root).
pub fn list_subdirectories(
    root: &ContentRoot,
    folder: &Path,
    rel_prefix: &str,
) -> Result<Vec<Folder>, ListingError> {
    let mut folders: Vec<Folder> = contained_children(root, folder)?
        .into_iter()
        .filter(|(_, path)| path.is_dir())
        .map(|(name, _)| Folder {
            rel_path: join_rel(rel_prefix, &name),
            name,
        })
        .collect();
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

/// Immediate image files of `folder`, sorted by name.
pub fn list_images(
    root: &ContentRoot,
    folder: &Path,
    rel_prefix: &str,
) -> Result<Vec<ImageFile>, ListingError> {
    let mut images = Vec::new();
    for (name, path) in contained_children(root, folder)? {
        if !path.is_file() || !has_image_extension(&name) {
            continue;
        }
        let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let dimensions = image::image_dimensions(&path).ok();
        images.push(ImageFile {
            rel_path: join_rel(rel_prefix, &name),
            name,
            size_bytes,
            dimensions,
        });
    }
    images.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(images)
}

/// Children of `folder` whose canonical path stays inside the root.
fn contained_children(
    root: &ContentRoot,
    folder: &Path,
) -> Result<Vec<(String, PathBuf)>, ListingError> {
    let canonical = root.canonical()?;
    Ok(read_children(folder)?
        .into_iter()
        .filter(|(_, path)| fs::canonicalize(path).is_ok_and(|p| p.starts_with(&canonical)))
        .collect())
}

fn read_children(folder: &Path) -> Result<Vec<(String, PathBuf)>, ListingError> {
    if !folder.is_dir() {
        return Err(ListingError::NotFound(folder.to_path_buf()));
    }
    Ok(fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect())
}

fn join_rel(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

/// Inventory line for one folder in a recursive walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    /// Root-relative path; empty for the root itself.
    pub rel_path: String,
    pub depth: usize,
    pub image_count: usize,
    pub has_section: bool,
    pub has_leaf: bool,
}

/// Walk every folder under `root` (root included), in sorted order.
pub fn walk(root: &Path) -> Result<Vec<FolderSummary>, ListingError> {
    if !root.is_dir() {
        return Err(ListingError::NotFound(root.to_path_buf()));
    }
    let mut summaries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let rel_path = path
            .strip_prefix(root)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();
        let image_count = read_children(path)?
            .iter()
            .filter(|(name, p)| p.is_file() && has_image_extension(name))
            .count();
        summaries.push(FolderSummary {
            rel_path,
            depth: entry.depth(),
            image_count,
            has_section: path.join(DocumentKind::Section.file_name()).is_file(),
            has_leaf: path.join(DocumentKind::Leaf.file_name()).is_file(),
        });
    }
    Ok(summaries)
}
