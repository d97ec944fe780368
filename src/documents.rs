//! Per-folder metadata documents.
//!
//! Every folder may hold two Markdown documents, following Hugo's page-bundle
//! convention:
//!
//! | Kind | File | Meaning |
//! |------|------|---------|
//! | [`DocumentKind::Section`] | `_index.md` | the folder as a list/section page |
//! | [`DocumentKind::Leaf`] | `index.md` | the folder as a single page |
//!
//! Reads come in two flavours: the parsed view (see [`crate::frontmatter`]) for
//! display, and the raw text for editing. A missing document reads as the
//! [`STARTER_TEMPLATE`] in the raw flavour and as `None` in the parsed one.
//!
//! Writes keep exactly one previous generation: the current file is copied to
//! `<name>.bak` before being replaced. The backup is best-effort. If it cannot
//! be written the new content is still saved. The sequence is not locked, so
//! two simultaneous edits of the same document are last-writer-wins.

use crate::frontmatter::{self, MetadataDocument};
use crate::sandbox::{ContentRoot, SandboxError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("Document is outside the content root: {0}")]
    Escapes(PathBuf),
}

/// Raw text served when a document does not exist yet.
pub const STARTER_TEMPLATE: &str = "---\ntitle: \"\"\ndescription: \"\"\n---\n\n";

/// Which of a folder's two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Section,
    Leaf,
}

impl DocumentKind {
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Section => "_index.md",
            DocumentKind::Leaf => "index.md",
        }
    }

    pub fn backup_name(self) -> &'static str {
        match self {
            DocumentKind::Section => "_index.md.bak",
            DocumentKind::Leaf => "index.md.bak",
        }
    }

    /// Path segment of the edit route (`/folder/{path}/<segment>`).
    pub fn edit_segment(self) -> &'static str {
        match self {
            DocumentKind::Section => "edit",
            DocumentKind::Leaf => "edit-index",
        }
    }

    pub fn from_edit_segment(segment: &str) -> Option<Self> {
        match segment {
            "edit" => Some(DocumentKind::Section),
            "edit-index" => Some(DocumentKind::Leaf),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Section => "Section",
            DocumentKind::Leaf => "Page",
        }
    }

    pub fn path_in(self, folder: &Path) -> PathBuf {
        folder.join(self.file_name())
    }
}

/// Document path inside `folder`, refused when a symlink there points outside
/// the root.
fn checked_path(
    root: &ContentRoot,
    folder: &Path,
    kind: DocumentKind,
) -> Result<PathBuf, DocumentError> {
    let path = kind.path_in(folder);
    if root.contains(&path)? {
        Ok(path)
    } else {
        Err(DocumentError::Escapes(path))
    }
}

/// Parsed view of a folder's document, `None` when the file does not exist.
///
/// A document that resolves outside the root is treated as absent.
pub fn read_parsed(
    root: &ContentRoot,
    folder: &Path,
    kind: DocumentKind,
) -> Result<Option<MetadataDocument>, DocumentError> {
    let path = match checked_path(root, folder, kind) {
        Ok(path) => path,
        Err(DocumentError::Escapes(path)) => {
            warn!(path = %path.display(), "document outside the content root, ignoring");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(frontmatter::parse(&text))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Raw text of a folder's document, or the starter template when missing.
pub fn read_raw(
    root: &ContentRoot,
    folder: &Path,
    kind: DocumentKind,
) -> Result<String, DocumentError> {
    match fs::read_to_string(checked_path(root, folder, kind)?) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(STARTER_TEMPLATE.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Replace a folder's document with `text`, keeping the previous version as
/// `<name>.bak`.
///
/// `folder` must already be sandbox-resolved; `root` re-checks the document
/// and its backup so neither a symlinked document nor a symlinked `.bak` can
/// redirect a write outside the root.
pub fn write_raw(
    root: &ContentRoot,
    folder: &Path,
    kind: DocumentKind,
    text: &str,
) -> Result<(), DocumentError> {
    let target = checked_path(root, folder, kind)?;

    if target.exists() {
        let backup = folder.join(kind.backup_name());
        if !root.contains(&backup)? {
            warn!(backup = %backup.display(), "backup outside the content root, skipping it");
        } else if let Err(e) = fs::copy(&target, &backup) {
            warn!(backup = %backup.display(), error = %e, "backup failed, writing anyway");
        } else {
            info!(backup = %backup.display(), "kept previous version");
        }
    }

    fs::write(&target, text)?;
    info!(path = %target.display(), bytes = text.len(), "document saved");
    Ok(())
}
