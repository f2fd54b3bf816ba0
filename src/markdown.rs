//! Markdown sources.
//!
//! Rendering itself is `pulldown-cmark`; this module handles what happens
//! around it: `[[Wiki Links]]` become site-relative anchors before rendering,
//! local image references are collected so the materializer can copy them
//! into the shared media directory, and titles/briefs get a plain-text form
//! for metadata and feeds.

use pulldown_cmark::{Options, Parser, html as md_html};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static WIKILINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());
static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)").unwrap());
static LEADING_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s*").unwrap());
static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap());

/// A markdown file rendered to HTML, with the local images it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownDoc {
    pub html: String,
    /// Image paths exactly as written in the source, in order of appearance.
    pub images: Vec<String>,
}

impl MarkdownDoc {
    /// Point every collected image URL at `/<media_dir>/<basename>`.
    pub fn rewrite_image_urls(&mut self, media_dir: &str) {
        for image in &self.images {
            let name = Path::new(image)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.clone());
            self.html = self.html.replace(image, &format!("/{media_dir}/{name}"));
        }
    }
}

/// Render markdown to HTML.
pub fn render(source: &str) -> String {
    let parser = Parser::new_ext(source.trim(), Options::ENABLE_STRIKETHROUGH);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

/// Replace `[[Name]]` with `<a href="/name">Name</a>`.
pub fn transform_wikilinks(source: &str) -> String {
    WIKILINK
        .replace_all(source, |caps: &regex::Captures| {
            let name = &caps[1];
            format!(r#"<a href="/{}">{}</a>"#, name.to_lowercase(), name)
        })
        .into_owned()
}

/// Local image paths referenced by `![alt](path)`.
///
/// Remote (`http://`, `https://`) images are left alone.
pub fn extract_image_paths(source: &str) -> Vec<String> {
    IMAGE_REF
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .filter(|path| !path.starts_with("http://") && !path.starts_with("https://"))
        .collect()
}

/// Parse markdown text into a rendered document.
pub fn parse_doc(source: &str) -> MarkdownDoc {
    let images = extract_image_paths(source);
    let html = render(&transform_wikilinks(source));
    MarkdownDoc { html, images }
}

/// Read and render a markdown file.
pub fn read_doc(path: &Path) -> std::io::Result<MarkdownDoc> {
    let source = fs::read_to_string(path)?;
    Ok(parse_doc(&source))
}

/// Plain-text form of a one-line markdown snippet.
///
/// Drops a leading heading marker and reduces `[text](url)` to `text`.
pub fn sanitize(source: &str) -> String {
    let without_heading = LEADING_HEADING.replace(source, "");
    INLINE_LINK.replace_all(&without_heading, "$1").into_owned()
}

/// Article name of a markdown location: the file name without `.md`.
pub fn article_name(location: &str) -> String {
    let location = location.trim();
    let base = Path::new(location)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string());
    base.strip_suffix(".md").map(str::to_string).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn render_heading() {
        assert_eq!(render("# Hi\n"), "<h1>Hi</h1>\n");
    }

    #[test]
    fn wikilinks_become_lowercase_anchors() {
        let out = transform_wikilinks("see [[Plain Text]] and [[Lieu]]");
        assert_eq!(
            out,
            r#"see <a href="/plain text">Plain Text</a> and <a href="/lieu">Lieu</a>"#
        );
    }

    #[test]
    fn image_extraction_skips_remote_images() {
        let md = "![one](img/a.png)\ntext ![two](https://x.org/b.png) ![three](c.jpg)";
        assert_eq!(extract_image_paths(md), vec!["img/a.png", "c.jpg"]);
    }

    #[test]
    fn parse_doc_rewrites_images_to_media() {
        let mut doc = parse_doc("![cat](pics/cat.png)\n");
        assert_eq!(doc.images, vec!["pics/cat.png"]);
        doc.rewrite_image_urls("media");
        assert!(doc.html.contains(r#"src="/media/cat.png""#));
        assert!(!doc.html.contains("pics/cat.png"));
    }

    #[test]
    fn read_doc_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(read_doc(&tmp.path().join("absent.md")).is_err());
    }

    #[test]
    fn sanitize_strips_heading_and_links() {
        assert_eq!(sanitize("## Hello"), "Hello");
        assert_eq!(
            sanitize("made with [plain](https://x.org) and [rust](/rust)"),
            "made with plain and rust"
        );
        assert_eq!(sanitize("no markup"), "no markup");
    }

    #[test]
    fn article_name_strips_dirs_and_suffix() {
        assert_eq!(article_name("wiki/articles/trustnet.md"), "trustnet");
        assert_eq!(article_name(" notes.md "), "notes");
        assert_eq!(article_name("repos/plain/README"), "README");
    }
}
