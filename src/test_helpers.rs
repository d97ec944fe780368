//! Shared test utilities for the content-desk test suite.
//!
//! Builds a small content tree in a temp directory so tests can mutate it
//! freely:
//!
//! ```text
//! <tmp>/
//! ├── about/
//! │   └── index.md
//! ├── gallery/
//! │   ├── _index.md
//! │   ├── italy/
//! │   │   ├── notes.txt
//! │   │   └── venice.jpg
//! │   └── japan/
//! │       ├── Kyoto.PNG
//! │       ├── b-temple.jpg          # exactly 10 bytes
//! │       ├── c-shrine.webp
//! │       ├── index.md
//! │       └── readme.md
//! └── posts/
//!     └── _index.md
//! ```
//!
//! Image files hold placeholder bytes unless written with [`write_png`].

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::sandbox::ContentRoot;

pub const GALLERY_SECTION: &str = "---\ntitle: \"Gallery\"\ndescription: 'All the trips'\n---\nPictures from **everywhere**.\n";
pub const JAPAN_LEAF: &str = "---\ntitle: Japan\ndraft: true\n---\nSpring 2024.\n";

/// Create the fixture tree described in the module docs.
pub fn content_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(root, "about/index.md", b"Just a plain page.\n");
    write(root, "gallery/_index.md", GALLERY_SECTION.as_bytes());
    write(root, "gallery/italy/venice.jpg", b"not really a jpeg");
    write(root, "gallery/italy/notes.txt", b"notes");
    write(root, "gallery/japan/Kyoto.PNG", b"png-ish");
    write(root, "gallery/japan/b-temple.jpg", b"0123456789");
    write(root, "gallery/japan/c-shrine.webp", b"webp-ish");
    write(root, "gallery/japan/index.md", JAPAN_LEAF.as_bytes());
    write(root, "gallery/japan/readme.md", b"# readme");
    write(root, "posts/_index.md", b"---\ntitle: Posts\n---\n");

    tmp
}

/// A [`ContentRoot`] over a fresh [`content_tree`]. Keep the `TempDir` alive.
pub fn content_root() -> (TempDir, ContentRoot) {
    let tmp = content_tree();
    let root = ContentRoot::new(tmp.path());
    (tmp, root)
}

/// Write `bytes` at `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Write a real (black) PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::new(width, height).save(path).unwrap();
}

/// Sorted file names directly inside `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
