//! CLI output formatting.
//!
//! Printed after a build in verbose mode. Routes lead, files follow:
//!
//! ```text
//! Navigation
//! 001 projects → /projects
//! 002 contacts → /contacts
//!
//! Pages
//! 001 / → index.html
//! 002 /projects → projects/index.html
//!
//! Feeds
//!     projects.xml
//!     all.xml
//!
//! Generated 2 pages, 2 feeds
//! ```
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::assemble::BuildReport;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `path` relative to `root` when possible, for display.
fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Format the build summary. `out` is the output root paths are shown
/// relative to.
pub fn format_build_output(report: &BuildReport, out: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.navigation.is_empty() {
        lines.push("Navigation".to_string());
        for (i, entry) in report.navigation.iter().enumerate() {
            lines.push(format!(
                "{} {} \u{2192} {}",
                format_index(i + 1),
                entry.text,
                entry.link
            ));
        }
        lines.push(String::new());
    }

    lines.push("Pages".to_string());
    for (i, (route, file)) in report.pages.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            route,
            display_relative(file, out)
        ));
    }

    if !report.feeds.is_empty() {
        lines.push(String::new());
        lines.push("Feeds".to_string());
        for feed in &report.feeds {
            lines.push(format!("    {}", display_relative(feed, out)));
        }
    }

    if let Some(css) = &report.stylesheet {
        lines.push(String::new());
        lines.push(format!("Stylesheet \u{2192} {}", display_relative(css, out)));
    }

    lines.push(String::new());
    lines.push(format!(
        "Generated {} pages, {} feeds",
        report.pages.len(),
        report.feeds.len()
    ));
    lines
}

/// Print the build summary to stdout.
pub fn print_build_output(report: &BuildReport, out: &Path) {
    for line in format_build_output(report, out) {
        println!("{}", line);
    }
}

/// Format the list of files created by scaffolding.
pub fn format_scaffold_output(created: &[std::path::PathBuf], source: &Path) -> Vec<String> {
    if created.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Created".to_string()];
    for path in created {
        lines.push(format!("    {}", display_relative(path, source)));
    }
    lines.push(String::new());
    lines
}

/// Print scaffolding output to stdout.
pub fn print_scaffold_output(created: &[std::path::PathBuf], source: &Path) {
    for line in format_scaffold_output(created, source) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::NavEntry;
    use std::path::PathBuf;

    fn report() -> BuildReport {
        BuildReport {
            pages: vec![
                ("/".to_string(), PathBuf::from("/site/web/index.html")),
                (
                    "/projects".to_string(),
                    PathBuf::from("/site/web/projects/index.html"),
                ),
            ],
            feeds: vec![
                PathBuf::from("/site/web/projects.xml"),
                PathBuf::from("/site/web/all.xml"),
            ],
            navigation: vec![NavEntry {
                text: "projects".into(),
                link: "/projects".into(),
            }],
            stylesheet: None,
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn build_output_lists_routes_and_files() {
        let lines = format_build_output(&report(), Path::new("/site/web"));
        assert_eq!(
            lines,
            vec![
                "Navigation",
                "001 projects \u{2192} /projects",
                "",
                "Pages",
                "001 / \u{2192} index.html",
                "002 /projects \u{2192} projects/index.html",
                "",
                "Feeds",
                "    projects.xml",
                "    all.xml",
                "",
                "Generated 2 pages, 2 feeds",
            ]
        );
    }

    #[test]
    fn build_output_without_nav_or_feeds() {
        let mut r = report();
        r.navigation.clear();
        r.feeds.clear();
        r.stylesheet = Some(PathBuf::from("/site/web/style.css"));
        let lines = format_build_output(&r, Path::new("/site/web"));
        assert_eq!(lines[0], "Pages");
        assert!(lines.contains(&"Stylesheet \u{2192} style.css".to_string()));
        assert_eq!(lines.last().unwrap(), "Generated 2 pages, 0 feeds");
    }

    #[test]
    fn paths_outside_root_are_shown_whole() {
        assert_eq!(
            display_relative(Path::new("/elsewhere/x.xml"), Path::new("/site/web")),
            "/elsewhere/x.xml"
        );
    }

    #[test]
    fn scaffold_output() {
        let created = vec![PathBuf::from("/s/index"), PathBuf::from("/s/style.css")];
        assert_eq!(
            format_scaffold_output(&created, Path::new("/s")),
            vec!["Created", "    index", "    style.css", ""]
        );
        assert!(format_scaffold_output(&[], Path::new("/s")).is_empty());
    }
}
