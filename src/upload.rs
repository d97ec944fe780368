//! Image uploads into a content folder.
//!
//! An upload goes through three gates before touching disk:
//!
//! 1. **Presence**: a file part with a non-empty client filename.
//! 2. **Sanitization**: [`sanitize_filename`] reduces the client name to a safe
//!    basename (no separators, no exotic characters).
//! 3. **Extension**: the sanitized name must carry an allowed image extension
//!    (see [`crate::listing::IMAGE_EXTENSIONS`]). Content is not sniffed.
//!
//! ## Collisions
//!
//! Existing files are never overwritten. If `photo.jpg` is taken the upload
//! becomes `photo-1.jpg`, then `photo-2.jpg`, and so on. Each candidate is
//! claimed with a create-new open, so concurrent uploads of the same name end
//! up in distinct files. The number of suffixes tried is capped by
//! `upload.max_collision_attempts`.

use crate::listing::has_image_extension;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("No file part in the upload")]
    MissingFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Filename has no usable characters: {0:?}")]
    UnusableFilename(String),
    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),
    #[error("No free name for {name} after {attempts} attempts")]
    NoFreeName { name: String, attempts: u32 },
}

impl UploadError {
    /// Whether the error is the client's fault (a 400) rather than ours.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::MissingFile
                | UploadError::EmptyFilename
                | UploadError::UnusableFilename(_)
                | UploadError::DisallowedExtension(_)
        )
    }
}

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Reduce a client-supplied filename to a safe basename.
///
/// - Path separators and whitespace become `_`
/// - Characters outside `A-Za-z0-9._-` are dropped
/// - Leading and trailing `.` and `_` are stripped
///
/// Returns an empty string when nothing usable is left.
pub fn sanitize_filename(name: &str) -> String {
    let joined = name
        .split(|c: char| c == '/' || c == '\\' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    safe.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Split `name` into stem and extension (with the dot) at the last `.`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

/// Candidate names in the order they are tried: `photo.jpg`, `photo-1.jpg`, ...
pub fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{stem}-{attempt}{ext}")
}

/// Validate an upload and return the sanitized filename.
pub fn validate(file: Option<&IncomingFile>) -> Result<String, UploadError> {
    let file = file.ok_or(UploadError::MissingFile)?;
    if file.filename.trim().is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    let safe = sanitize_filename(&file.filename);
    if safe.is_empty() {
        return Err(UploadError::UnusableFilename(file.filename.clone()));
    }
    if !has_image_extension(&safe) {
        return Err(UploadError::DisallowedExtension(safe));
    }
    Ok(safe)
}

/// Claim the first free candidate name in `folder` and write `bytes` to it.
///
/// `folder` must already be a sandbox-resolved, existing directory.
pub fn store(
    folder: &Path,
    filename: &str,
    bytes: &[u8],
    max_attempts: u32,
) -> Result<PathBuf, UploadError> {
    for attempt in 0..=max_attempts {
        let path = folder.join(candidate_name(filename, attempt));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        info!(path = %path.display(), bytes = bytes.len(), "upload saved");
        return Ok(path);
    }
    Err(UploadError::NoFreeName {
        name: filename.to_string(),
        attempts: max_attempts,
    })
}

/// Full upload: validate, then store. Returns the saved path.
pub fn save_upload(
    folder: &Path,
    file: Option<&IncomingFile>,
    max_attempts: u32,
) -> Result<PathBuf, UploadError> {
    let filename = validate(file)?;
    let bytes = file.map(|f| f.bytes.as_slice()).unwrap_or_default();
    store(folder, &filename, bytes, max_attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn incoming(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            filename: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    // =========================================================================
    // sanitize_filename() tests
    // =========================================================================

    #[test]
    fn sanitize_passthrough() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("My_Photo-2.JPEG"), "My_Photo-2.JPEG");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("../x.jpg"), "x.jpg");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.png"), "C_Users_me_pic.png");
    }

    #[test]
    fn sanitize_whitespace_and_specials() {
        assert_eq!(sanitize_filename("my great photo!.jpg"), "my_great_photo.jpg");
        assert_eq!(sanitize_filename("café.png"), "caf.png");
    }

    #[test]
    fn sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.jpg"), "hidden.jpg");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename("日本.jpg"), "jpg");
    }

    // =========================================================================
    // candidate_name() tests
    // =========================================================================

    #[test]
    fn candidates_insert_suffix_before_extension() {
        assert_eq!(candidate_name("photo.jpg", 0), "photo.jpg");
        assert_eq!(candidate_name("photo.jpg", 1), "photo-1.jpg");
        assert_eq!(candidate_name("photo.tar.gif", 2), "photo.tar-2.gif");
        assert_eq!(candidate_name("noext", 3), "noext-3");
    }

    // =========================================================================
    // validate() tests
    // =========================================================================

    #[test]
    fn missing_file_rejected() {
        assert!(matches!(validate(None), Err(UploadError::MissingFile)));
    }

    #[test]
    fn empty_filename_rejected() {
        let f = incoming("", b"x");
        assert!(matches!(validate(Some(&f)), Err(UploadError::EmptyFilename)));
    }

    #[test]
    fn pdf_rejected_regardless_of_content() {
        let f = incoming("doc.pdf", b"\x89PNG\r\n\x1a\n");
        let err = validate(Some(&f)).unwrap_err();
        assert!(matches!(err, UploadError::DisallowedExtension(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn name_reduced_to_extension_only_rejected() {
        // "日本.jpg" sanitizes to "jpg", which has no extension
        let f = incoming("日本.jpg", b"x");
        assert!(matches!(
            validate(Some(&f)),
            Err(UploadError::DisallowedExtension(_))
        ));
    }

    #[test]
    fn uppercase_extension_accepted() {
        let f = incoming("SCAN.TIFF", b"x");
        assert_eq!(validate(Some(&f)).unwrap(), "SCAN.TIFF");
    }

    // =========================================================================
    // store() / save_upload() tests
    // =========================================================================

    #[test]
    fn saves_under_sanitized_name() {
        let tmp = content_tree();
        let folder = tmp.path().join("posts");
        let f = incoming("new shot.png", b"bytes");
        let saved = save_upload(&folder, Some(&f), 100).unwrap();
        assert_eq!(saved, folder.join("new_shot.png"));
        assert_eq!(fs::read(&saved).unwrap(), b"bytes");
    }

    #[test]
    fn collision_picks_next_free_suffix() {
        let tmp = content_tree();
        let folder = tmp.path().join("posts");
        fs::write(folder.join("photo.jpg"), b"one").unwrap();
        fs::write(folder.join("photo-1.jpg"), b"two").unwrap();

        let f = incoming("photo.jpg", b"three");
        let saved = save_upload(&folder, Some(&f), 100).unwrap();
        assert_eq!(saved.file_name().unwrap(), "photo-2.jpg");
        // Originals untouched
        assert_eq!(fs::read(folder.join("photo.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(folder.join("photo-1.jpg")).unwrap(), b"two");
    }

    #[test]
    fn repeated_uploads_never_overwrite() {
        let tmp = content_tree();
        let folder = tmp.path().join("posts");
        for i in 0..3u8 {
            save_upload(&folder, Some(&incoming("a.gif", &[i])), 100).unwrap();
        }
        assert_eq!(
            file_names(&folder),
            vec!["_index.md", "a-1.gif", "a-2.gif", "a.gif"]
        );
    }

    #[test]
    fn collision_cap_reported() {
        let tmp = content_tree();
        let folder = tmp.path().join("posts");
        fs::write(folder.join("p.png"), b"").unwrap();
        fs::write(folder.join("p-1.png"), b"").unwrap();
        fs::write(folder.join("p-2.png"), b"").unwrap();

        let err = save_upload(&folder, Some(&incoming("p.png", b"x")), 2).unwrap_err();
        assert!(matches!(err, UploadError::NoFreeName { attempts: 2, .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn rejected_upload_writes_nothing() {
        let tmp = content_tree();
        let folder = tmp.path().join("posts");
        let before = file_names(&folder);
        assert!(save_upload(&folder, Some(&incoming("doc.pdf", b"x")), 100).is_err());
        assert_eq!(file_names(&folder), before);
    }
}
