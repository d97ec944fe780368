//! CLI output formatting for the `check` and `build` commands.
//!
//! # Information-First Display
//!
//! Folders are listed by positional index and name, with what they contain
//! (image count, metadata documents) as indented context lines. The output
//! reads as a content inventory of the tree the web front end serves.
//!
//! ## Check
//!
//! ```text
//! Content: exampleSite/content (2 images)
//!     Section: _index.md
//! 001 about
//!     Page: index.md
//! 002 gallery
//!     Section: _index.md
//!     001 italy (1 image)
//!     002 japan (3 images)
//!         Page: index.md
//!
//! 5 folders, 6 images, 2 sections, 2 pages
//! ```
//!
//! ## Build
//!
//! ```text
//! Build succeeded
//!     Total in 112 ms
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::deploy::BuildReport;
use crate::documents::DocumentKind;
use crate::listing::FolderSummary;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `(1 image)`, `(3 images)`, or nothing for an empty folder.
fn image_count(n: usize) -> String {
    match n {
        0 => String::new(),
        1 => " (1 image)".to_string(),
        n => format!(" ({} images)", n),
    }
}

/// Folder header: positional index + name + image count.
///
/// ```text
/// 002 japan (3 images)
/// ```
fn entity_header(index: usize, name: &str, images: usize) -> String {
    format!("{} {}{}", format_index(index), name, image_count(images))
}

fn document_lines(summary: &FolderSummary, depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.has_section {
        lines.push(format!(
            "{}{}: {}",
            indent(depth),
            DocumentKind::Section.label(),
            DocumentKind::Section.file_name()
        ));
    }
    if summary.has_leaf {
        lines.push(format!(
            "{}{}: {}",
            indent(depth),
            DocumentKind::Leaf.label(),
            DocumentKind::Leaf.file_name()
        ));
    }
    lines
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Check
// ============================================================================

/// Inventory of a walked content tree. `summaries` comes from
/// [`crate::listing::walk`], root first, in pre-order.
pub fn format_check_output(root: &Path, summaries: &[FolderSummary]) -> Vec<String> {
    let mut lines = Vec::new();
    // Sibling position per depth; depth 0 is the root
    let mut positions: Vec<usize> = Vec::new();

    for summary in summaries {
        if summary.depth == 0 {
            lines.push(format!(
                "Content: {}{}",
                root.display(),
                image_count(summary.image_count)
            ));
            lines.extend(document_lines(summary, 1));
            continue;
        }

        positions.truncate(summary.depth + 1);
        positions.resize(summary.depth + 1, 0);
        positions[summary.depth] += 1;

        let name = summary
            .rel_path
            .rsplit('/')
            .next()
            .unwrap_or(&summary.rel_path);
        lines.push(format!(
            "{}{}",
            indent(summary.depth - 1),
            entity_header(positions[summary.depth], name, summary.image_count)
        ));
        lines.extend(document_lines(summary, summary.depth));
    }

    let folders = summaries.iter().filter(|s| s.depth > 0).count();
    let images: usize = summaries.iter().map(|s| s.image_count).sum();
    let sections = summaries.iter().filter(|s| s.has_section).count();
    let pages = summaries.iter().filter(|s| s.has_leaf).count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}, {}",
        plural(folders, "folder"),
        plural(images, "image"),
        plural(sections, "section"),
        plural(pages, "page")
    ));
    lines
}

pub fn print_check_output(root: &Path, summaries: &[FolderSummary]) {
    for line in format_check_output(root, summaries) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Outcome line plus the indented output tail.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![if report.success {
        "Build succeeded".to_string()
    } else {
        "Build failed".to_string()
    }];
    lines.extend(
        report
            .output_tail
            .lines()
            .map(|line| format!("{}{}", indent(1), line)),
    );
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rel: &str, depth: usize, images: usize, section: bool, leaf: bool) -> FolderSummary {
        FolderSummary {
            rel_path: rel.to_string(),
            depth,
            image_count: images,
            has_section: section,
            has_leaf: leaf,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn entity_header_with_and_without_images() {
        assert_eq!(entity_header(2, "japan", 3), "002 japan (3 images)");
        assert_eq!(entity_header(1, "italy", 1), "001 italy (1 image)");
        assert_eq!(entity_header(1, "about", 0), "001 about");
    }

    // =========================================================================
    // format_check_output tests
    // =========================================================================

    #[test]
    fn check_output_nests_by_depth() {
        let summaries = vec![
            summary("", 0, 0, false, false),
            summary("about", 1, 0, false, true),
            summary("gallery", 1, 0, true, false),
            summary("gallery/italy", 2, 1, false, false),
            summary("gallery/japan", 2, 3, false, true),
            summary("posts", 1, 0, true, false),
        ];
        let lines = format_check_output(Path::new("content"), &summaries);
        assert_eq!(
            lines,
            vec![
                "Content: content",
                "001 about",
                "    Page: index.md",
                "002 gallery",
                "    Section: _index.md",
                "    001 italy (1 image)",
                "    002 japan (3 images)",
                "        Page: index.md",
                "003 posts",
                "    Section: _index.md",
                "",
                "5 folders, 4 images, 2 sections, 2 pages",
            ]
        );
    }

    #[test]
    fn check_output_restarts_numbering_per_parent() {
        let summaries = vec![
            summary("", 0, 0, false, false),
            summary("a", 1, 0, false, false),
            summary("a/x", 2, 0, false, false),
            summary("a/y", 2, 0, false, false),
            summary("b", 1, 0, false, false),
            summary("b/z", 2, 0, false, false),
        ];
        let lines = format_check_output(Path::new("c"), &summaries);
        assert_eq!(lines[4], "002 b");
        assert_eq!(lines[5], "    001 z");
    }

    #[test]
    fn check_output_root_documents_and_images() {
        let summaries = vec![summary("", 0, 2, true, false)];
        let lines = format_check_output(Path::new("site/content"), &summaries);
        assert_eq!(lines[0], "Content: site/content (2 images)");
        assert_eq!(lines[1], "    Section: _index.md");
        assert_eq!(lines[3], "0 folders, 2 images, 1 section, 0 pages");
    }

    #[test]
    fn check_output_from_walked_tree() {
        let tmp = crate::test_helpers::content_tree();
        let summaries = crate::listing::walk(tmp.path()).unwrap();
        let lines = format_check_output(tmp.path(), &summaries);
        assert!(lines.contains(&"    002 japan (3 images)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "5 folders, 4 images, 2 sections, 2 pages"
        );
    }

    // =========================================================================
    // format_build_report tests
    // =========================================================================

    #[test]
    fn build_report_success_indents_tail() {
        let report = BuildReport {
            success: true,
            output_tail: "Pages | 12\nTotal in 112 ms".to_string(),
        };
        assert_eq!(
            format_build_report(&report),
            vec!["Build succeeded", "    Pages | 12", "    Total in 112 ms"]
        );
    }

    #[test]
    fn build_report_failure_without_tail() {
        let report = BuildReport {
            success: false,
            output_tail: String::new(),
        };
        assert_eq!(format_build_report(&report), vec!["Build failed"]);
    }
}
