//! Page chrome.
//!
//! Every written page is `header template + nav + <main><article>body
//! </article></main> + footer template`. The header template is plain HTML
//! owned by the user; the generator only touches three spots in it:
//!
//! | Spot | Replaced with |
//! |---|---|
//! | `<title>Site</title>` | page title, description, open-graph and fragment metadata |
//! | `<!-- theme -->` | `<style>` block with the page's color overrides |
//! | `<!-- background -->` | `<style>` block with the page's background image |
//!
//! Missing template files are created from the embedded defaults on first
//! load so users have something to edit.

use crate::fragment::PageFragment;
use crate::materialize;
use maud::{Markup, PreEscaped, html};
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

const DEFAULT_HEADER: &str = include_str!("../static/default-header.html");
const DEFAULT_FOOTER: &str = include_str!("../static/default-footer.html");

pub const THEME_SENTINEL: &str = "<!-- theme -->";
pub const BACKGROUND_SENTINEL: &str = "<!-- background -->";

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.*?)</title>").unwrap());

/// One entry of the site-wide navigation bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub text: String,
    pub link: String,
}

/// Per-page color overrides. Unset colors fall back to the stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    pub foreground: Option<String>,
    pub background: Option<String>,
    pub link: Option<String>,
}

impl Theme {
    pub fn is_empty(&self) -> bool {
        self.foreground.is_none() && self.background.is_none() && self.link.is_none()
    }
}

/// The user's header and footer HTML.
#[derive(Debug, Clone)]
pub struct Templates {
    pub header: String,
    pub footer: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
        }
    }
}

impl Templates {
    /// Load `header` and `footer` from the source directory, creating them
    /// from the defaults when absent.
    pub fn load(source: &Path, header: &str, footer: &str) -> io::Result<Self> {
        let header_path = source.join(header);
        let footer_path = source.join(footer);
        if materialize::write_if_missing(&header_path, DEFAULT_HEADER)? {
            log::info!("created {}", header_path.display());
        }
        if materialize::write_if_missing(&footer_path, DEFAULT_FOOTER)? {
            log::info!("created {}", footer_path.display());
        }
        Ok(Self {
            header: fs::read_to_string(header_path)?,
            footer: fs::read_to_string(footer_path)?,
        })
    }
}

// ============================================================================
// Style blocks
// ============================================================================

/// `<style>` overriding the stylesheet's color variables, if any color is set.
pub fn theme_style(theme: &Theme) -> Option<String> {
    if theme.is_empty() {
        return None;
    }
    let mut root = String::new();
    if let Some(fg) = &theme.foreground {
        root.push_str(&format!("  --foreground: {fg} !important;\n"));
    }
    if let Some(bg) = &theme.background {
        root.push_str(&format!("  --background: {bg} !important;\n"));
    }
    if let Some(link) = &theme.link {
        root.push_str(&format!("  --highlight: {link} !important;\n"));
    }
    let mut style = format!("<style>\n:root {{\n{root}}}\n");
    if let Some(link) = &theme.link {
        style.push_str(&format!("a {{ color: {link} !important; }}\n"));
    }
    style.push_str("</style>");
    Some(style)
}

/// `<style>` setting the page background image.
pub fn background_style(image: Option<&str>) -> Option<String> {
    image.map(|url| {
        format!(
            "<style>\nhtml {{\n  background-image: url(\"{url}\");\n  background-size: cover;\n}}\n</style>"
        )
    })
}

// ============================================================================
// Navigation
// ============================================================================

/// Link target one level above `route`. The root has none.
///
/// ```text
/// /          -> ""
/// /about     -> /
/// /a/b       -> /a
/// ```
pub fn history_link(route: &str) -> String {
    let trimmed = route.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Human name for a back-link target: the route without its slashes,
/// `home` for the root.
fn back_label(back: &str) -> &str {
    match back.trim_matches('/') {
        "" => "home",
        path => path,
    }
}

pub fn render_nav(back: &str, entries: &[NavEntry]) -> Markup {
    html! {
        nav {
            ul.main-navigation {
                @if !back.is_empty() {
                    li { a href=(back) { "Back to " (back_label(back)) } }
                }
                @for entry in entries.iter().filter(|e| !e.text.is_empty()) {
                    li { a href=(entry.link) { (entry.text) } }
                }
            }
        }
    }
}

// ============================================================================
// Header filling
// ============================================================================

/// Head tags for one page: title, description, then `extra_meta` (preview
/// tags) and the fragment's own metadata.
fn head_block(site_title: &str, fragment: &PageFragment, extra_meta: &str) -> String {
    let mut block = match fragment.title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) => html! { title { (title) " — " (PreEscaped(site_title)) } }.into_string(),
        None => html! { title { (PreEscaped(site_title)) } }.into_string(),
    };
    if let Some(brief) = fragment.brief.as_deref().filter(|b| !b.is_empty()) {
        block.push('\n');
        block.push_str(&html! { meta name="description" content=(brief); }.into_string());
    }
    if !extra_meta.is_empty() {
        block.push('\n');
        block.push_str(extra_meta);
    }
    for meta in &fragment.metadata {
        block.push('\n');
        block.push_str(meta);
    }
    block
}

/// Fill the header template for `fragment`.
pub fn fill_header(template: &str, fragment: &PageFragment, extra_meta: &str) -> String {
    let header = template
        .replace(
            THEME_SENTINEL,
            &theme_style(&fragment.theme).unwrap_or_default(),
        )
        .replace(
            BACKGROUND_SENTINEL,
            &background_style(fragment.background.as_deref()).unwrap_or_default(),
        );

    if let Some(caps) = TITLE_TAG.captures(&header) {
        let whole = caps[0].to_string();
        let block = head_block(&caps[1], fragment, extra_meta);
        return header.replacen(&whole, &block, 1);
    }
    // Templates without a <title> still get the metadata.
    let block = head_block("", fragment, extra_meta);
    if header.contains("</head>") {
        header.replacen("</head>", &format!("{block}\n</head>"), 1)
    } else {
        header
    }
}

/// Assemble a full page document.
pub fn wrap_page(
    templates: &Templates,
    navigation: &[NavEntry],
    fragment: &PageFragment,
    back: &str,
    extra_meta: &str,
    body: &str,
) -> String {
    let header = fill_header(&templates.header, fragment, extra_meta);
    let nav = render_nav(back, navigation).into_string();
    format!(
        "{header}\n{nav}\n<main><article>{body}</article></main>\n{}",
        templates.footer
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fragment(title: &str) -> PageFragment {
        PageFragment {
            title: Some(title.to_string()),
            ..PageFragment::default()
        }
    }

    #[test]
    fn history_link_drops_last_segment() {
        assert_eq!(history_link("/"), "");
        assert_eq!(history_link(""), "");
        assert_eq!(history_link("/about"), "/");
        assert_eq!(history_link("/a/b"), "/a");
        assert_eq!(history_link("/a/b/c/"), "/a/b");
    }

    #[test]
    fn nav_has_back_link_and_entries() {
        let entries = vec![
            NavEntry {
                text: "projects".into(),
                link: "/projects".into(),
            },
            NavEntry {
                text: String::new(),
                link: "/hidden".into(),
            },
        ];
        let nav = render_nav("/", &entries).into_string();
        assert!(nav.contains(r#"<ul class="main-navigation">"#));
        assert!(nav.contains(r#"<a href="/">Back to home</a>"#));
        assert!(nav.contains(r#"<a href="/projects">projects</a>"#));
        assert!(!nav.contains("/hidden"));
    }

    #[test]
    fn nav_back_label_names_the_whole_route() {
        let nav = render_nav("/projects/rust", &[]).into_string();
        assert!(nav.contains(r#"<a href="/projects/rust">Back to projects/rust</a>"#));
    }

    #[test]
    fn root_page_has_no_back_link() {
        let nav = render_nav("", &[]).into_string();
        assert!(!nav.contains("Back to"));
    }

    #[test]
    fn title_is_prefixed_to_site_title() {
        let header = fill_header(DEFAULT_HEADER, &fragment("About"), "");
        assert!(header.contains("<title>About — a plain website</title>"));
    }

    #[test]
    fn untitled_page_keeps_site_title() {
        let header = fill_header(DEFAULT_HEADER, &PageFragment::default(), "");
        assert!(header.contains("<title>a plain website</title>"));
    }

    #[test]
    fn brief_and_metadata_are_added() {
        let mut pf = fragment("Repo");
        pf.brief = Some("a <small> tool".into());
        pf.metadata = vec![r#"<meta name="vcs" content="git">"#.into()];
        let header = fill_header(DEFAULT_HEADER, &pf, r#"<meta property="og:title" content="Repo">"#);
        assert!(header.contains(r#"<meta name="description" content="a &lt;small&gt; tool">"#));
        assert!(header.contains(r#"<meta property="og:title" content="Repo">"#));
        assert!(header.contains(r#"<meta name="vcs" content="git">"#));
    }

    #[test]
    fn sentinels_are_replaced_or_removed() {
        let plain = fill_header(DEFAULT_HEADER, &PageFragment::default(), "");
        assert!(!plain.contains(THEME_SENTINEL));
        assert!(!plain.contains(BACKGROUND_SENTINEL));
        assert!(!plain.contains("<style>"));

        let mut pf = PageFragment::default();
        pf.theme.foreground = Some("#111".into());
        pf.theme.link = Some("tomato".into());
        pf.background = Some("/media/bg.jpg".into());
        let themed = fill_header(DEFAULT_HEADER, &pf, "");
        assert!(themed.contains("--foreground: #111 !important;"));
        assert!(themed.contains("--highlight: tomato !important;"));
        assert!(themed.contains("a { color: tomato !important; }"));
        assert!(!themed.contains("--background:"));
        assert!(themed.contains(r#"background-image: url("/media/bg.jpg")"#));
    }

    #[test]
    fn header_without_title_tag_gets_metadata_before_head_close() {
        let template = "<html><head></head><body>";
        let header = fill_header(template, &fragment("Solo"), "");
        assert!(header.contains("<title>Solo — </title>\n</head>"));
    }

    #[test]
    fn wrap_page_orders_chrome() {
        let templates = Templates::default();
        let page = wrap_page(&templates, &[], &fragment("About"), "/", "", "<h1>Hi</h1>");
        let header_at = page.find("<title>").unwrap();
        let nav_at = page.find("<nav>").unwrap();
        let body_at = page.find("<main><article><h1>Hi</h1></article></main>").unwrap();
        let footer_at = page.find("<footer>").unwrap();
        assert!(header_at < nav_at && nav_at < body_at && body_at < footer_at);
    }

    #[test]
    fn load_creates_missing_templates() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("footer.html"), "<p>mine</p>").unwrap();

        let templates = Templates::load(tmp.path(), "header.html", "footer.html").unwrap();
        assert_eq!(templates.header, DEFAULT_HEADER);
        assert_eq!(templates.footer, "<p>mine</p>");
        assert!(tmp.path().join("header.html").is_file());
    }
}
